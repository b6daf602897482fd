use std::borrow::Borrow;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{Action, Mdp, ModelError, State, Trajectory};

/// How next states are drawn while collecting data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationMode {
    /// Draw from the stored transition distribution.
    #[default]
    Exact,
    /// Draw uniformly from the states the stored distribution can reach.
    UniformSupport,
}

#[derive(Debug, Clone)]
/// Seeded data collector over a model: uniformly random starts and actions.
///
/// `M` is either a borrowed `&Mdp` or an owned `Mdp`.
pub struct TrajectorySampler<M> {
    mdp: M,
    rng: ChaCha8Rng,
    mode: ExplorationMode,
}

impl<M: Borrow<Mdp>> TrajectorySampler<M> {
    /// Create a sampler with a deterministic RNG seed.
    pub fn new(mdp: M, seed: u64) -> Self {
        TrajectorySampler {
            mdp,
            rng: ChaCha8Rng::seed_from_u64(seed),
            mode: ExplorationMode::Exact,
        }
    }

    /// Switch how next states are drawn.
    pub fn with_mode(mut self, mode: ExplorationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mdp(&self) -> &Mdp {
        self.mdp.borrow()
    }

    /// Sample one `(next_state, reward)` transition.
    pub fn step(&mut self, state: State, action: Action) -> Result<(State, f64), ModelError> {
        let mdp: &Mdp = self.mdp.borrow();
        mdp.check_pair(state, action)?;
        let next = match self.mode {
            ExplorationMode::Exact => mdp.sample_transition(state, action, &mut self.rng),
            ExplorationMode::UniformSupport => {
                mdp.sample_uniform_support_transition(state, action, &mut self.rng)
            }
        };
        let reward = mdp.reward(state, next, action, &mut self.rng);
        Ok((next, reward))
    }

    /// Roll out `length` uniformly random actions from a uniformly random start state.
    pub fn rollout(&mut self, length: usize) -> Result<Trajectory, ModelError> {
        let mut trajectory = Trajectory::new(self.mdp().num_states(), self.mdp().num_actions());
        let mut current = self.mdp.borrow().random_state(&mut self.rng);
        trajectory.initialize(current)?;

        while trajectory.len() < length {
            let action = self.mdp.borrow().random_action(&mut self.rng);
            let (next, reward) = self.step(current, action)?;
            trajectory.step(action, reward, next)?;
            current = next;
        }

        Ok(trajectory)
    }

    /// Collect `count` independent rollouts of `length` steps each.
    pub fn rollouts(&mut self, length: usize, count: usize) -> Result<Vec<Trajectory>, ModelError> {
        (0..count).map(|_| self.rollout(length)).collect()
    }

    /// A single-step trajectory that takes `action` in `state`.
    pub fn probe(&mut self, state: State, action: Action) -> Result<Trajectory, ModelError> {
        let (next, reward) = self.step(state, action)?;
        let mut trajectory = Trajectory::new(self.mdp().num_states(), self.mdp().num_actions());
        trajectory.initialize(state)?;
        trajectory.step(action, reward, next)?;
        Ok(trajectory)
    }

    /// `per_pair` single-step probes of every `(state, action)` pair, so every pair is
    /// observed exactly `per_pair` times.
    pub fn exhaustive_probes(&mut self, per_pair: usize) -> Result<Vec<Trajectory>, ModelError> {
        let mut data = Vec::with_capacity(self.mdp().num_states() * self.mdp().num_actions() * per_pair);
        for state in self.mdp().states() {
            for action in self.mdp().actions() {
                for _ in 0..per_pair {
                    data.push(self.probe(state, action)?);
                }
            }
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MdpBuilder;

    fn two_by_two() -> Mdp {
        let mut builder = MdpBuilder::new(2, 2);
        builder
            .deterministic(0, 0, 0, 0.0)
            .and_then(|b| b.deterministic(0, 1, 1, 1.0))
            .and_then(|b| b.deterministic(1, 0, 0, 0.0))
            .and_then(|b| b.deterministic(1, 1, 1, 1.0))
            .expect("valid outcomes");
        builder.build().expect("valid model")
    }

    #[test]
    fn out_of_range_action_is_an_error() {
        let mdp = two_by_two();
        let mut sampler = TrajectorySampler::new(&mdp, 3);

        let err = sampler.probe(State::from(0), Action::from(7)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownAction {
                action: 7,
                num_actions: 2
            }
        ));
        let err = sampler.step(State::from(1), Action::from(2)).unwrap_err();
        assert!(matches!(err, ModelError::UnknownAction { action: 2, .. }));
    }

    #[test]
    fn out_of_range_state_is_an_error() {
        let mdp = two_by_two();
        let mut sampler = TrajectorySampler::new(&mdp, 3);

        let err = sampler.probe(State::from(2), Action::from(0)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnknownState {
                state: 2,
                num_states: 2
            }
        ));
    }

    #[test]
    fn single_step_trajectory_records_the_pair() {
        let mdp = two_by_two();
        let mut sampler = TrajectorySampler::new(mdp, 3);

        let trajectory = sampler.probe(State::from(0), Action::from(1)).expect("valid pair");
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.states(), &[State::from(0), State::from(1)]);
    }
}
