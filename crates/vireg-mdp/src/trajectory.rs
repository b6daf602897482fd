use crate::{Action, ModelError, PairTable, State, TripleTable};

#[derive(Debug, Clone)]
/// One episode of experience plus the per-pair sufficient statistics the estimator needs.
///
/// Counters and the step log are only ever appended to, and both change in the same
/// call, so for every `(s, a)` the transition counts over `s'` sum to the visit count.
pub struct Trajectory {
    states: Vec<State>,
    actions: Vec<Action>,
    rewards: Vec<f64>,
    visits: PairTable<u64>,
    reward_sums: PairTable<f64>,
    transitions: TripleTable<u64>,
}

impl Trajectory {
    /// Create an empty trajectory sized for a model with the given dimensions.
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Trajectory {
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            visits: PairTable::new(num_states, num_actions),
            reward_sums: PairTable::new(num_states, num_actions),
            transitions: TripleTable::new(num_states, num_actions),
        }
    }

    /// Set the start state of the episode.
    pub fn initialize(&mut self, state: State) -> Result<(), ModelError> {
        if let Some(first) = self.states.first() {
            return Err(ModelError::TrajectoryAlreadyInitialized {
                state: first.index(),
            });
        }
        self.check_state(state)?;
        self.states.push(state);
        Ok(())
    }

    /// Record taking `action` from the current state, observing `reward`, and landing in `next`.
    pub fn step(&mut self, action: Action, reward: f64, next: State) -> Result<(), ModelError> {
        let current = self.current_state().ok_or(ModelError::TrajectoryNotInitialized)?;
        if action.index() >= self.num_actions() {
            return Err(ModelError::UnknownAction {
                action: action.index(),
                num_actions: self.num_actions(),
            });
        }
        self.check_state(next)?;

        *self.visits.get_mut(current, action) += 1;
        *self.reward_sums.get_mut(current, action) += reward;
        self.transitions.row_mut(current, action)[next.index()] += 1;

        self.states.push(next);
        self.actions.push(action);
        self.rewards.push(reward);
        Ok(())
    }

    /// The most recently visited state, or `None` before `initialize`.
    pub fn current_state(&self) -> Option<State> {
        self.states.last().copied()
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn num_states(&self) -> usize {
        self.visits.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.visits.num_actions()
    }

    /// Visited states, including the start state (`len() + 1` entries once initialized).
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn visit_counts(&self) -> &PairTable<u64> {
        &self.visits
    }

    pub fn reward_sums(&self) -> &PairTable<f64> {
        &self.reward_sums
    }

    pub fn transition_counts(&self) -> &TripleTable<u64> {
        &self.transitions
    }

    fn check_state(&self, state: State) -> Result<(), ModelError> {
        if state.index() >= self.num_states() {
            return Err(ModelError::UnknownState {
                state: state.index(),
                num_states: self.num_states(),
            });
        }
        Ok(())
    }
}
