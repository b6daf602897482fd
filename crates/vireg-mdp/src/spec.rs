use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Action, Mdp, ModelError, State, TripleTable, table::state_action_pairs};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Serializable MDP schema used for YAML IO.
pub struct MdpSpec {
    /// Schema version for future compatibility checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Standard deviation of Gaussian reward noise (defaults to 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_noise: Option<f64>,
    /// State ids; a state's position is its dense index.
    pub states: Vec<String>,
    /// Action ids; every action is available in every state.
    pub actions: Vec<String>,
    /// One entry per `(state, action)` pair.
    pub transitions: Vec<TransitionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Outcome distribution of one `(state, action)` pair.
pub struct TransitionSpec {
    pub state: String,
    pub action: String,
    pub outcomes: Vec<OutcomeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One probabilistic transition. Next states not listed get probability 0.
pub struct OutcomeSpec {
    pub next: String,
    pub prob: f64,
    pub reward: f64,
}

impl MdpSpec {
    /// Return the dense state for a state id.
    pub fn state_key(&self, id: &str) -> Option<State> {
        self.states.iter().position(|s| s == id).map(State::from)
    }

    /// Return the dense action for an action id.
    pub fn action_key(&self, id: &str) -> Option<Action> {
        self.actions.iter().position(|a| a == id).map(Action::from)
    }

    /// Validate ids and pair coverage. Probability constraints are checked by
    /// [`Mdp::new`] during [`MdpSpec::compile`].
    pub fn validate(&self) -> Result<(), ModelError> {
        self.index().map(|_| ())
    }

    /// Compile this spec into a validated model.
    pub fn compile(&self) -> Result<Mdp, ModelError> {
        let index = self.index()?;
        let num_states = self.states.len();
        let num_actions = self.actions.len();
        let mut transition = TripleTable::new(num_states, num_actions);
        let mut reward = TripleTable::new(num_states, num_actions);

        for entry in &self.transitions {
            let (state, action) = index.pair(entry)?;
            let mut seen = HashSet::with_capacity(entry.outcomes.len());
            for outcome in &entry.outcomes {
                let next = index.state(&outcome.next)?;
                if !seen.insert(next) {
                    return Err(ModelError::DuplicateOutcome {
                        state: entry.state.clone(),
                        action: entry.action.clone(),
                        next: outcome.next.clone(),
                    });
                }
                transition.set(state, action, next, outcome.prob);
                reward.set(state, action, next, outcome.reward);
            }
        }

        Mdp::new(transition, reward)?.with_reward_noise(self.reward_noise.unwrap_or(0.0))
    }

    /// Describe an existing model, naming states `s{i}` and actions `a{i}`.
    /// Only outcomes with non-zero probability are listed.
    pub fn from_mdp(mdp: &Mdp) -> Self {
        let states: Vec<String> = mdp.states().map(|s| s.to_string()).collect();
        let actions: Vec<String> = mdp.actions().map(|a| a.to_string()).collect();

        let transitions = state_action_pairs(mdp.num_states(), mdp.num_actions())
            .map(|(state, action)| TransitionSpec {
                state: states[state.index()].clone(),
                action: actions[action.index()].clone(),
                outcomes: mdp
                    .transition_row(state, action)
                    .iter()
                    .zip(mdp.reward_row(state, action))
                    .enumerate()
                    .filter(|(_, (p, _))| **p > 0.0)
                    .map(|(next, (p, r))| OutcomeSpec {
                        next: states[next].clone(),
                        prob: *p,
                        reward: *r,
                    })
                    .collect(),
            })
            .collect();

        let noise = mdp.reward_noise();
        MdpSpec {
            version: Some(1),
            reward_noise: (noise > 0.0).then_some(noise),
            states,
            actions,
            transitions,
        }
    }

    fn index(&self) -> Result<SpecIndex<'_>, ModelError> {
        if self.states.is_empty() || self.actions.is_empty() {
            return Err(ModelError::EmptySpace {
                states: self.states.len(),
                actions: self.actions.len(),
            });
        }

        // Ids must be unique within their own namespace.
        let mut states = HashMap::with_capacity(self.states.len());
        for (idx, id) in self.states.iter().enumerate() {
            if states.insert(id.as_str(), State::from(idx)).is_some() {
                return Err(ModelError::DuplicateStateId { id: id.clone() });
            }
        }
        let mut actions = HashMap::with_capacity(self.actions.len());
        for (idx, id) in self.actions.iter().enumerate() {
            if actions.insert(id.as_str(), Action::from(idx)).is_some() {
                return Err(ModelError::DuplicateActionId { id: id.clone() });
            }
        }

        let index = SpecIndex { states, actions };

        let mut declared = HashSet::with_capacity(self.transitions.len());
        for entry in &self.transitions {
            let pair = index.pair(entry)?;
            if !declared.insert(pair) {
                return Err(ModelError::DuplicateTransition {
                    state: entry.state.clone(),
                    action: entry.action.clone(),
                });
            }
            for outcome in &entry.outcomes {
                index.state(&outcome.next)?;
            }
        }

        // Every pair needs a row, otherwise the model would have an empty distribution.
        if let Some((state, action)) = state_action_pairs(self.states.len(), self.actions.len())
            .find(|pair| !declared.contains(pair))
        {
            return Err(ModelError::MissingTransition {
                state: self.states[state.index()].clone(),
                action: self.actions[action.index()].clone(),
            });
        }

        Ok(index)
    }
}

struct SpecIndex<'a> {
    states: HashMap<&'a str, State>,
    actions: HashMap<&'a str, Action>,
}

impl SpecIndex<'_> {
    fn state(&self, id: &str) -> Result<State, ModelError> {
        self.states
            .get(id)
            .copied()
            .ok_or_else(|| ModelError::UnknownStateId { id: id.to_string() })
    }

    fn action(&self, id: &str) -> Result<Action, ModelError> {
        self.actions
            .get(id)
            .copied()
            .ok_or_else(|| ModelError::UnknownActionId { id: id.to_string() })
    }

    fn pair(&self, entry: &TransitionSpec) -> Result<(State, Action), ModelError> {
        Ok((self.state(&entry.state)?, self.action(&entry.action)?))
    }
}
