use vireg_mdp::{Action, PROB_TOLERANCE, PairTable, State};

use crate::solve::error::SolverError;

/// State values, indexed by state id. Starts at 0 for every state.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFunction {
    values: Vec<f64>,
}

impl ValueFunction {
    pub fn zeros(num_states: usize) -> Self {
        ValueFunction {
            values: vec![0.0; num_states],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        ValueFunction { values }
    }

    /// Value of one state. Panics on an out-of-range id.
    pub fn get(&self, state: State) -> f64 {
        self.values[state.index()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (State, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(idx, v)| (State::from(idx), *v))
    }

    pub(crate) fn as_mut_vec(&mut self) -> &mut Vec<f64> {
        &mut self.values
    }
}

/// Action values over every `(state, action)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct QFunction {
    table: PairTable<f64>,
}

impl QFunction {
    pub fn zeros(num_states: usize, num_actions: usize) -> Self {
        QFunction {
            table: PairTable::new(num_states, num_actions),
        }
    }

    pub fn from_table(table: PairTable<f64>) -> Self {
        QFunction { table }
    }

    pub fn get(&self, state: State, action: Action) -> f64 {
        self.table.get(state, action)
    }

    /// Q-values of every action in `state`, indexed by action.
    pub fn row(&self, state: State) -> &[f64] {
        self.table.row(state)
    }

    /// Largest Q-value in `state`.
    pub fn max(&self, state: State) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn num_states(&self) -> usize {
        self.table.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.table.num_actions()
    }

    pub fn table(&self) -> &PairTable<f64> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut PairTable<f64> {
        &mut self.table
    }

    pub(crate) fn check_shape(&self, num_states: usize, num_actions: usize) -> Result<(), SolverError> {
        check_pair_shape(&self.table, num_states, num_actions)
    }
}

/// Deterministic policy: one action per state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    actions: Vec<Action>,
}

impl Policy {
    pub fn from_actions(actions: Vec<Action>) -> Self {
        Policy { actions }
    }

    /// The same action in every state.
    pub fn constant(num_states: usize, action: Action) -> Self {
        Policy {
            actions: vec![action; num_states],
        }
    }

    pub fn action(&self, state: State) -> Action {
        self.actions[state.index()]
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Check the policy against a model's dimensions.
    pub fn check(&self, num_states: usize, num_actions: usize) -> Result<(), SolverError> {
        if self.actions.len() != num_states {
            return Err(SolverError::StateCountMismatch {
                expected: num_states,
                got: self.actions.len(),
            });
        }
        if let Some((state, action)) = self
            .actions
            .iter()
            .enumerate()
            .find(|(_, a)| a.index() >= num_actions)
        {
            return Err(SolverError::InvalidPolicyAction {
                state: State::from(state),
                action: *action,
                num_actions,
            });
        }
        Ok(())
    }
}

/// Stochastic policy: a distribution over actions for each state.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticPolicy {
    probabilities: PairTable<f64>,
}

impl StochasticPolicy {
    pub fn from_table(probabilities: PairTable<f64>) -> Self {
        StochasticPolicy { probabilities }
    }

    pub fn probability(&self, state: State, action: Action) -> f64 {
        self.probabilities.get(state, action)
    }

    /// Action distribution for `state`, indexed by action.
    pub fn distribution(&self, state: State) -> &[f64] {
        self.probabilities.row(state)
    }

    pub fn num_states(&self) -> usize {
        self.probabilities.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.probabilities.num_actions()
    }

    pub fn table(&self) -> &PairTable<f64> {
        &self.probabilities
    }

    /// Check the table matches the model and every row is a distribution.
    pub fn check(&self, num_states: usize, num_actions: usize) -> Result<(), SolverError> {
        check_pair_shape(&self.probabilities, num_states, num_actions)?;
        for s in 0..num_states {
            let state = State::from(s);
            let row = self.probabilities.row(state);
            if let Some((a, &value)) = row
                .iter()
                .enumerate()
                .find(|(_, p)| !p.is_finite() || **p < 0.0)
            {
                return Err(SolverError::InvalidActionProbability {
                    state,
                    action: Action::from(a),
                    value,
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > PROB_TOLERANCE {
                return Err(SolverError::ActionProbabilitySum { state, sum });
            }
        }
        Ok(())
    }
}

fn check_pair_shape(
    table: &PairTable<f64>,
    num_states: usize,
    num_actions: usize,
) -> Result<(), SolverError> {
    if table.num_states() != num_states || table.num_actions() != num_actions {
        return Err(SolverError::ShapeMismatch {
            expected_states: num_states,
            expected_actions: num_actions,
            states: table.num_states(),
            actions: table.num_actions(),
        });
    }
    Ok(())
}
