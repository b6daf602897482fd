use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Action, Mdp, ModelError, PairTable, State, Trajectory, TripleTable,
    table::state_action_pairs,
};

/// Reward assigned to every next-state entry of a pair that never appears in the data.
pub const DEFAULT_UNSEEN_REWARD: f64 = 0.5;

/// Estimator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Weight in `[0, 1]` placed on the action-marginal prior; 0 disables regularization.
    pub blend: f64,
    pub unseen_reward: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            blend: 0.0,
            unseen_reward: DEFAULT_UNSEEN_REWARD,
        }
    }
}

impl EstimatorConfig {
    /// Default settings with the given regularization blend.
    pub fn with_blend(blend: f64) -> Self {
        EstimatorConfig {
            blend,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.blend) {
            return Err(ModelError::InvalidBlend { value: self.blend });
        }
        if !self.unseen_reward.is_finite() {
            return Err(ModelError::InvalidUnseenReward {
                value: self.unseen_reward,
            });
        }
        Ok(())
    }
}

/// Element-wise sums of trajectory statistics over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledCounts {
    visits: PairTable<u64>,
    reward_sums: PairTable<f64>,
    transitions: TripleTable<u64>,
}

impl PooledCounts {
    /// Sum the statistics of every trajectory into tables of the given dimensions.
    ///
    /// Trajectories recorded over a smaller id range are embedded as-is; larger ones are
    /// rejected.
    pub fn pool(
        num_states: usize,
        num_actions: usize,
        data: &[Trajectory],
    ) -> Result<Self, ModelError> {
        let mut pooled = PooledCounts {
            visits: PairTable::new(num_states, num_actions),
            reward_sums: PairTable::new(num_states, num_actions),
            transitions: TripleTable::new(num_states, num_actions),
        };

        for trajectory in data {
            if trajectory.num_states() > num_states || trajectory.num_actions() > num_actions {
                return Err(ModelError::ShapeMismatch {
                    expected_states: num_states,
                    expected_actions: num_actions,
                    states: trajectory.num_states(),
                    actions: trajectory.num_actions(),
                });
            }

            for (s, a) in state_action_pairs(trajectory.num_states(), trajectory.num_actions()) {
                let visits = trajectory.visit_counts().get(s, a);
                if visits == 0 {
                    continue;
                }
                *pooled.visits.get_mut(s, a) += visits;
                *pooled.reward_sums.get_mut(s, a) += trajectory.reward_sums().get(s, a);

                let row = pooled.transitions.row_mut(s, a);
                for (total, count) in row.iter_mut().zip(trajectory.transition_counts().row(s, a)) {
                    *total += count;
                }
            }
        }

        Ok(pooled)
    }

    pub fn visits(&self) -> &PairTable<u64> {
        &self.visits
    }

    pub fn reward_sums(&self) -> &PairTable<f64> {
        &self.reward_sums
    }

    pub fn transitions(&self) -> &TripleTable<u64> {
        &self.transitions
    }

    /// Number of `(s, a)` pairs visited at least once.
    pub fn visited_pairs(&self) -> usize {
        state_action_pairs(self.visits.num_states(), self.visits.num_actions())
            .filter(|(s, a)| self.visits.get(*s, *a) > 0)
            .count()
    }
}

#[derive(Debug, Clone, Default)]
/// Maximum-likelihood MDP estimator with optional action-marginal regularization.
pub struct MdpEstimator {
    config: EstimatorConfig,
}

impl MdpEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(MdpEstimator { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate a model over `num_states x num_actions` from `data`.
    pub fn estimate(
        &self,
        num_states: usize,
        num_actions: usize,
        data: &[Trajectory],
    ) -> Result<Mdp, ModelError> {
        let counts = PooledCounts::pool(num_states, num_actions, data)?;
        self.estimate_from_counts(&counts)
    }

    /// Estimate a model from already pooled statistics.
    pub fn estimate_from_counts(&self, counts: &PooledCounts) -> Result<Mdp, ModelError> {
        let (raw, reward) = self.maximum_likelihood(counts);
        let transition = if self.config.blend > 0.0 {
            regularize(&raw, self.config.blend)
        } else {
            raw
        };

        debug!(
            visited_pairs = counts.visited_pairs(),
            total_pairs = counts.visits.num_states() * counts.visits.num_actions(),
            blend = self.config.blend,
            "estimated model from trajectory counts"
        );

        Mdp::new(transition, reward)
    }

    /// Empirical transition and reward tables, with the uniform/default fallback for
    /// unseen pairs. The reward for a pair is its mean observed reward, broadcast to every
    /// next-state entry.
    pub fn maximum_likelihood(&self, counts: &PooledCounts) -> (TripleTable<f64>, TripleTable<f64>) {
        let num_states = counts.visits.num_states();
        let num_actions = counts.visits.num_actions();
        let mut transition = TripleTable::new(num_states, num_actions);
        let mut reward = TripleTable::new(num_states, num_actions);

        for (s, a) in state_action_pairs(num_states, num_actions) {
            let visits = counts.visits.get(s, a);
            if visits > 0 {
                let total = visits as f64;
                let mean_reward = counts.reward_sums.get(s, a) / total;
                for (p, count) in transition
                    .row_mut(s, a)
                    .iter_mut()
                    .zip(counts.transitions.row(s, a))
                {
                    *p = *count as f64 / total;
                }
                reward.row_mut(s, a).fill(mean_reward);
            } else {
                transition.row_mut(s, a).fill(1.0 / num_states as f64);
                reward.row_mut(s, a).fill(self.config.unseen_reward);
            }
        }

        (transition, reward)
    }
}

/// Per-state mean of the transition rows across actions, renormalized. The result holds
/// the same row for every action of a state.
pub fn action_marginal(transition: &TripleTable<f64>) -> TripleTable<f64> {
    let num_states = transition.num_states();
    let num_actions = transition.num_actions();
    let mut marginal = TripleTable::new(num_states, num_actions);
    let mut mean = vec![0.0_f64; num_states];

    for s in (0..num_states).map(State::from) {
        mean.fill(0.0);
        for a in (0..num_actions).map(Action::from) {
            for (m, p) in mean.iter_mut().zip(transition.row(s, a)) {
                *m += p / num_actions as f64;
            }
        }
        normalize(&mut mean);
        for a in (0..num_actions).map(Action::from) {
            marginal.set_row(s, a, &mean);
        }
    }

    marginal
}

/// Blend every row toward its state's action-marginal: `(1 - blend) * raw + blend * marginal`,
/// renormalized.
pub fn regularize(raw: &TripleTable<f64>, blend: f64) -> TripleTable<f64> {
    let marginal = action_marginal(raw);
    let mut blended = TripleTable::new(raw.num_states(), raw.num_actions());

    for (s, a) in state_action_pairs(raw.num_states(), raw.num_actions()) {
        let row = blended.row_mut(s, a);
        for ((out, p), m) in row.iter_mut().zip(raw.row(s, a)).zip(marginal.row(s, a)) {
            *out = (1.0 - blend) * p + blend * m;
        }
        normalize(row);
    }

    blended
}

fn normalize(row: &mut [f64]) {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 {
        row.iter_mut().for_each(|p| *p /= sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_step(from: usize, action: usize, reward: f64, next: usize) -> Trajectory {
        let mut trajectory = Trajectory::new(3, 2);
        trajectory.initialize(State::from(from)).expect("valid start");
        trajectory
            .step(Action::from(action), reward, State::from(next))
            .expect("valid step");
        trajectory
    }

    #[test]
    fn unseen_pairs_fall_back_to_uniform_and_default_reward() {
        let estimator = MdpEstimator::default();
        let mdp = estimator.estimate(3, 2, &[]).expect("valid estimate");

        for p in mdp.transition_row(State::from(1), Action::from(1)) {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(mdp.reward_row(State::from(1), Action::from(1)), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn mean_reward_is_broadcast_to_every_next_state() {
        let data = vec![single_step(0, 0, 1.0, 1), single_step(0, 0, 3.0, 2)];
        let mdp = MdpEstimator::default().estimate(3, 2, &data).expect("valid estimate");

        assert_eq!(mdp.transition_row(State::from(0), Action::from(0)), &[0.0, 0.5, 0.5]);
        assert_eq!(mdp.reward_row(State::from(0), Action::from(0)), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn blend_outside_unit_interval_is_rejected() {
        let err = MdpEstimator::new(EstimatorConfig::with_blend(1.5)).expect_err("invalid blend");
        assert!(matches!(err, ModelError::InvalidBlend { .. }));
    }

    #[test]
    fn oversized_trajectories_are_rejected() {
        let trajectory = Trajectory::new(5, 2);
        let err = PooledCounts::pool(3, 2, &[trajectory]).expect_err("too many states");
        assert!(matches!(err, ModelError::ShapeMismatch { states: 5, .. }));
    }

    #[test]
    fn half_blend_sits_between_raw_and_marginal() {
        let data = vec![single_step(0, 0, 0.0, 0), single_step(0, 1, 0.0, 1)];
        let estimator = MdpEstimator::new(EstimatorConfig::with_blend(0.5)).expect("valid config");
        let mdp = estimator.estimate(3, 2, &data).expect("valid estimate");

        let row = mdp.transition_row(State::from(0), Action::from(0));
        assert!((row[0] - 0.75).abs() < 1e-12);
        assert!((row[1] - 0.25).abs() < 1e-12);
        assert_eq!(row[2], 0.0);
    }
}
