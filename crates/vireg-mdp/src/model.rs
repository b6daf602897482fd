use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};

use crate::{Action, ModelError, State, TripleTable, table::state_action_pairs};

/// Floating point tolerance used when validating transition row sums.
pub const PROB_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
/// Validated finite MDP over dense state and action ids.
///
/// Every action is available in every state. Transition rows are checked against the
/// probability simplex at construction, so no partially valid model is ever observable.
/// The model is immutable; [`Mdp::with_transition`] builds a new validated instance.
pub struct Mdp {
    transition: TripleTable<f64>,
    reward: TripleTable<f64>,
    cdf: TripleTable<f64>,
    reward_noise: Option<Normal<f64>>,
}

impl Mdp {
    /// Validate both tables and build the model with noise-free rewards.
    pub fn new(transition: TripleTable<f64>, reward: TripleTable<f64>) -> Result<Self, ModelError> {
        let (states, actions) = (transition.num_states(), transition.num_actions());
        if states == 0 || actions == 0 {
            return Err(ModelError::EmptySpace { states, actions });
        }
        if !transition.same_shape(&reward) {
            return Err(ModelError::ShapeMismatch {
                expected_states: states,
                expected_actions: actions,
                states: reward.num_states(),
                actions: reward.num_actions(),
            });
        }

        validate_transition(&transition)?;
        validate_reward(&reward)?;

        let cdf = cumulative_rows(&transition);
        Ok(Mdp {
            transition,
            reward,
            cdf,
            reward_noise: None,
        })
    }

    /// Return a copy whose `reward` lookups add zero-mean Gaussian noise with std `noise`.
    pub fn with_reward_noise(mut self, noise: f64) -> Result<Self, ModelError> {
        if !noise.is_finite() || noise < 0.0 {
            return Err(ModelError::InvalidRewardNoise { value: noise });
        }
        self.reward_noise = if noise == 0.0 {
            None
        } else {
            Some(Normal::new(0.0, noise).map_err(|_| ModelError::InvalidRewardNoise { value: noise })?)
        };
        Ok(self)
    }

    /// Build a new model with `transition` replacing the current dynamics.
    /// Rewards and reward noise carry over; the new table is validated from scratch.
    pub fn with_transition(&self, transition: TripleTable<f64>) -> Result<Self, ModelError> {
        let mdp = Mdp::new(transition, self.reward.clone())?;
        Ok(Mdp {
            reward_noise: self.reward_noise,
            ..mdp
        })
    }

    pub fn num_states(&self) -> usize {
        self.transition.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.transition.num_actions()
    }

    /// Iterate all states in id order.
    pub fn states(&self) -> impl Iterator<Item = State> + use<> {
        (0..self.num_states()).map(State::from)
    }

    /// Iterate all actions in id order.
    pub fn actions(&self) -> impl Iterator<Item = Action> + use<> {
        (0..self.num_actions()).map(Action::from)
    }

    /// Standard deviation of the reward noise (0 when rewards are deterministic).
    pub fn reward_noise(&self) -> f64 {
        self.reward_noise.map_or(0.0, |normal| normal.std_dev())
    }

    pub fn transition_table(&self) -> &TripleTable<f64> {
        &self.transition
    }

    pub fn reward_table(&self) -> &TripleTable<f64> {
        &self.reward
    }

    /// Check that `state` and `action` index into this model.
    pub fn check_pair(&self, state: State, action: Action) -> Result<(), ModelError> {
        if state.index() >= self.num_states() {
            return Err(ModelError::UnknownState {
                state: state.index(),
                num_states: self.num_states(),
            });
        }
        if action.index() >= self.num_actions() {
            return Err(ModelError::UnknownAction {
                action: action.index(),
                num_actions: self.num_actions(),
            });
        }
        Ok(())
    }

    /// Probability of landing in `to` after taking `action` in `from`.
    /// Panics on out-of-range ids; see [`Mdp::check_pair`].
    pub fn transition_probability(&self, from: State, to: State, action: Action) -> f64 {
        self.transition.get(from, action, to)
    }

    /// Next-state distribution for `(state, action)`, indexed by next state.
    pub fn transition_row(&self, state: State, action: Action) -> &[f64] {
        self.transition.row(state, action)
    }

    /// Nominal reward stored for `(from, action, to)`.
    pub fn expected_reward(&self, from: State, to: State, action: Action) -> f64 {
        self.reward.get(from, action, to)
    }

    pub fn reward_row(&self, state: State, action: Action) -> &[f64] {
        self.reward.row(state, action)
    }

    /// Reward for `(from, action, to)`, perturbed by fresh Gaussian noise on every call
    /// when noise is configured.
    pub fn reward<R: Rng + ?Sized>(&self, from: State, to: State, action: Action, rng: &mut R) -> f64 {
        let nominal = self.expected_reward(from, to, action);
        match &self.reward_noise {
            Some(normal) => nominal + normal.sample(rng),
            None => nominal,
        }
    }

    /// Draw a state uniformly at random.
    pub fn random_state<R: Rng + ?Sized>(&self, rng: &mut R) -> State {
        State::from(rng.gen_range(0..self.num_states()))
    }

    /// Draw an action uniformly at random.
    pub fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action::from(rng.gen_range(0..self.num_actions()))
    }

    /// Sample a next state from the stored distribution of `(state, action)`.
    pub fn sample_transition<R: Rng + ?Sized>(&self, state: State, action: Action, rng: &mut R) -> State {
        let sample: f64 = rng.r#gen();
        let cdf = self.cdf.row(state, action);
        let chosen = cdf.partition_point(|p| *p <= sample);
        if chosen < cdf.len() {
            return State::from(chosen);
        }

        // Rows may sum to slightly less than 1; fall back to the last reachable state.
        let row = self.transition.row(state, action);
        let last = row.iter().rposition(|p| *p > 0.0).unwrap_or(row.len() - 1);
        State::from(last)
    }

    /// Sample a next state uniformly from the support of `(state, action)`, ignoring the
    /// shape of the stored distribution.
    pub fn sample_uniform_support_transition<R: Rng + ?Sized>(
        &self,
        state: State,
        action: Action,
        rng: &mut R,
    ) -> State {
        let support: Vec<usize> = self
            .transition
            .row(state, action)
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(next, _)| next)
            .collect();

        // A validated row sums to 1, so its support is never empty.
        support.choose(rng).map_or(state, |next| State::from(*next))
    }
}

/// Check every row of `transition` against the probability simplex.
pub fn validate_transition(transition: &TripleTable<f64>) -> Result<(), ModelError> {
    for (state, action) in state_action_pairs(transition.num_states(), transition.num_actions()) {
        let mut sum = 0.0_f64;
        for (next, p) in transition.row(state, action).iter().enumerate() {
            if !p.is_finite() || *p < 0.0 {
                return Err(ModelError::InvalidProbability {
                    state: state.index(),
                    action: action.index(),
                    next,
                    value: *p,
                });
            }
            sum += p;
        }

        if (sum - 1.0).abs() > PROB_TOLERANCE {
            return Err(ModelError::ProbabilitySum {
                state: state.index(),
                action: action.index(),
                sum,
                tolerance: PROB_TOLERANCE,
            });
        }
    }
    Ok(())
}

fn validate_reward(reward: &TripleTable<f64>) -> Result<(), ModelError> {
    for (state, action) in state_action_pairs(reward.num_states(), reward.num_actions()) {
        if let Some((next, value)) = reward
            .row(state, action)
            .iter()
            .enumerate()
            .find(|(_, r)| !r.is_finite())
        {
            return Err(ModelError::InvalidReward {
                state: state.index(),
                action: action.index(),
                next,
                value: *value,
            });
        }
    }
    Ok(())
}

fn cumulative_rows(transition: &TripleTable<f64>) -> TripleTable<f64> {
    let mut cdf = TripleTable::new(transition.num_states(), transition.num_actions());
    for (state, action) in state_action_pairs(transition.num_states(), transition.num_actions()) {
        let mut cumulative = 0.0_f64;
        for (out, p) in cdf
            .row_mut(state, action)
            .iter_mut()
            .zip(transition.row(state, action))
        {
            cumulative += p;
            *out = cumulative;
        }
    }
    cdf
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn two_state(row: [f64; 2]) -> Result<Mdp, ModelError> {
        let mut transition = TripleTable::new(2, 1);
        transition.set_row(State::from(0), Action::from(0), &row);
        transition.set_row(State::from(1), Action::from(0), &[0.0, 1.0]);
        Mdp::new(transition, TripleTable::new(2, 1))
    }

    #[test]
    fn rows_within_tolerance_are_accepted() {
        assert!(two_state([0.49995, 0.5]).is_ok());
    }

    #[test]
    fn row_sum_violation_names_the_pair() {
        let err = two_state([0.3, 0.3]).expect_err("row sums to 0.6");
        assert!(matches!(
            err,
            ModelError::ProbabilitySum { state: 0, action: 0, sum, .. } if (sum - 0.6).abs() < 1e-12
        ));
    }

    #[test]
    fn negative_probability_is_rejected() {
        let err = two_state([-0.5, 1.5]).expect_err("negative entry");
        assert!(matches!(err, ModelError::InvalidProbability { next: 0, .. }));
    }

    #[test]
    fn sampling_never_returns_zero_probability_states() {
        let mdp = two_state([0.0, 1.0]).expect("valid model");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(
                mdp.sample_transition(State::from(0), Action::from(0), &mut rng),
                State::from(1)
            );
            assert_eq!(
                mdp.sample_uniform_support_transition(State::from(0), Action::from(0), &mut rng),
                State::from(1)
            );
        }
    }

    #[test]
    fn zero_noise_reward_is_a_lookup() {
        let mdp = two_state([0.5, 0.5])
            .and_then(|mdp| mdp.with_reward_noise(0.0))
            .expect("valid model");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let r = mdp.reward(State::from(0), State::from(1), Action::from(0), &mut rng);
        assert_eq!(r, 0.0);
        assert_eq!(mdp.reward_noise(), 0.0);
    }

    #[test]
    fn reward_noise_is_fresh_and_centered_on_the_nominal_reward() {
        let mut transition = TripleTable::new(2, 1);
        transition.set_row(State::from(0), Action::from(0), &[0.5, 0.5]);
        transition.set_row(State::from(1), Action::from(0), &[0.0, 1.0]);
        let mdp = Mdp::new(transition, TripleTable::filled(2, 1, 2.0))
            .and_then(|mdp| mdp.with_reward_noise(0.5))
            .expect("valid model");
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        let draws: Vec<f64> = (0..20_000)
            .map(|_| mdp.reward(State::from(0), State::from(1), Action::from(0), &mut rng))
            .collect();
        assert!(draws.windows(2).all(|w| w[0] != w[1]));

        let n = draws.len() as f64;
        let mean = draws.iter().sum::<f64>() / n;
        let var = draws.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!((mean - 2.0).abs() < 0.02, "mean was {mean}");
        assert!((var.sqrt() - 0.5).abs() < 0.02, "std was {}", var.sqrt());
        assert_eq!(mdp.expected_reward(State::from(0), State::from(1), Action::from(0)), 2.0);
    }

    #[test]
    fn check_pair_reports_the_offending_id() {
        let mdp = two_state([0.5, 0.5]).expect("valid model");
        assert!(mdp.check_pair(State::from(1), Action::from(0)).is_ok());
        assert!(matches!(
            mdp.check_pair(State::from(0), Action::from(1)),
            Err(ModelError::UnknownAction { action: 1, num_actions: 1 })
        ));
        assert!(matches!(
            mdp.check_pair(State::from(2), Action::from(0)),
            Err(ModelError::UnknownState { state: 2, num_states: 2 })
        ));
    }
}
