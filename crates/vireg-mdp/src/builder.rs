use crate::{Action, Mdp, ModelError, State, TripleTable};

#[derive(Debug, Clone)]
/// Struct to build MDPs over dense ids.
///
/// Every row starts empty; rows left unset fail the simplex check in [`MdpBuilder::build`].
pub struct MdpBuilder {
    transition: TripleTable<f64>,
    reward: TripleTable<f64>,
    reward_noise: f64,
}

impl MdpBuilder {
    /// Create a builder for `num_states` states and `num_actions` actions.
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        MdpBuilder {
            transition: TripleTable::new(num_states, num_actions),
            reward: TripleTable::new(num_states, num_actions),
            reward_noise: 0.0,
        }
    }

    /// Set the probability and reward of landing in `next` after `action` in `state`.
    pub fn outcome(
        &mut self,
        state: usize,
        action: usize,
        next: usize,
        prob: f64,
        reward: f64,
    ) -> Result<&mut Self, ModelError> {
        let (state, action, next) = self.check(state, action, next)?;
        self.transition.set(state, action, next, prob);
        self.reward.set(state, action, next, reward);
        Ok(self)
    }

    /// Make `action` in `state` always land in `next` with `reward`.
    pub fn deterministic(
        &mut self,
        state: usize,
        action: usize,
        next: usize,
        reward: f64,
    ) -> Result<&mut Self, ModelError> {
        let (s, a, _) = self.check(state, action, next)?;
        self.transition.row_mut(s, a).fill(0.0);
        self.outcome(state, action, next, 1.0, reward)
    }

    /// Standard deviation of Gaussian reward noise.
    pub fn reward_noise(&mut self, noise: f64) -> &mut Self {
        self.reward_noise = noise;
        self
    }

    /// Validate and build the model.
    pub fn build(&self) -> Result<Mdp, ModelError> {
        Mdp::new(self.transition.clone(), self.reward.clone())?.with_reward_noise(self.reward_noise)
    }

    fn check(&self, state: usize, action: usize, next: usize) -> Result<(State, Action, State), ModelError> {
        let num_states = self.transition.num_states();
        let num_actions = self.transition.num_actions();
        if let Some(bad) = [state, next].into_iter().find(|s| *s >= num_states) {
            return Err(ModelError::UnknownState {
                state: bad,
                num_states,
            });
        }
        if action >= num_actions {
            return Err(ModelError::UnknownAction {
                action,
                num_actions,
            });
        }
        Ok((State::from(state), Action::from(action), State::from(next)))
    }
}
