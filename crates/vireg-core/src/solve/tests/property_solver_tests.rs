use proptest::prelude::*;
use vireg_mdp::{Mdp, MdpBuilder};

use super::rng;
use crate::{DEFAULT_TOLERANCE, PolicyEvaluation, SolverConfig, ValueIteration};

const STATES: usize = 3;
const ACTIONS: usize = 2;
const ENTRIES: usize = STATES * ACTIONS * STATES;

fn random_mdp(weights: &[f64], rewards: &[f64]) -> Mdp {
    let mut builder = MdpBuilder::new(STATES, ACTIONS);
    for (pair, (row, reward_row)) in weights
        .chunks(STATES)
        .zip(rewards.chunks(STATES))
        .enumerate()
    {
        let (state, action) = (pair / ACTIONS, pair % ACTIONS);
        let total: f64 = row.iter().sum();
        for (next, (w, r)) in row.iter().zip(reward_row).enumerate() {
            builder.outcome(state, action, next, w / total, *r).unwrap();
        }
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn value_iteration_is_bounded_and_greedy_policy_attains_it(
        weights in proptest::collection::vec(0.1f64..1.0, ENTRIES),
        rewards in proptest::collection::vec(-1.0f64..1.0, ENTRIES),
        gamma in 0.0f64..=0.99,
        beta in 0.0f64..5.0,
    ) {
        let mdp = random_mdp(&weights, &rewards);
        let mut rng = rng(99);
        let bound = 1.0 / (1.0 - gamma) + 1e-6;
        // Both runs stop within gamma * tol / (1 - gamma) of their fixed points.
        let slack = 5.0 * DEFAULT_TOLERANCE / (1.0 - gamma);

        let mut hard = ValueIteration::new(&mdp, SolverConfig::hard_max(gamma)).unwrap();
        prop_assert!(hard.run(&mut rng).converged);
        for (_, v) in hard.values().iter() {
            prop_assert!(v.abs() <= bound);
        }

        let soft_config = SolverConfig {
            max_sweeps: 2_000,
            ..SolverConfig::boltzmann(gamma, beta)
        };
        let mut soft = ValueIteration::new(&mdp, soft_config).unwrap();
        soft.run(&mut rng);
        for state in mdp.states() {
            prop_assert!(soft.values().get(state).abs() <= bound);
            let mass: f64 = soft.stochastic_policy().distribution(state).iter().sum();
            prop_assert!((mass - 1.0).abs() < 1e-9);
        }

        let policy = hard.compute_policy(&mut rng).clone();
        let mut evaluation = PolicyEvaluation::new(&mdp, SolverConfig::hard_max(gamma)).unwrap();
        evaluation.evaluate(&policy, &mut rng).unwrap();
        for state in mdp.states() {
            prop_assert!((evaluation.values().get(state) - hard.values().get(state)).abs() <= slack);
        }
    }
}
