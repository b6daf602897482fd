use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vireg_mdp::{Action, Mdp, State};

use crate::solve::{
    config::SolverConfig,
    error::SolverError,
    sweep::{RunReport, SweepMetrics, lookahead, run_sweeps},
    values::{Policy, StochasticPolicy, ValueFunction},
};

/// How the epsilon-greedy mixture enters the backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpsilonMixing {
    /// Each sweep, each state draws a uniformly random action with probability epsilon.
    #[default]
    Sampled,
    /// Back up the expectation over the mixture instead of a draw.
    Expected,
}

#[derive(Debug, Clone)]
/// Fixed-policy evaluation with the same sweep and stopping rule as value iteration.
pub struct PolicyEvaluation<'a> {
    mdp: &'a Mdp,
    config: SolverConfig,
    epsilon: f64,
    mixing: EpsilonMixing,
    values: ValueFunction,
    scratch: Vec<f64>,
}

impl<'a> PolicyEvaluation<'a> {
    /// Create an evaluator with V initialized to 0. The config's operator is ignored.
    pub fn new(mdp: &'a Mdp, config: SolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(PolicyEvaluation {
            mdp,
            config,
            epsilon: 0.0,
            mixing: EpsilonMixing::Sampled,
            values: ValueFunction::zeros(mdp.num_states()),
            scratch: vec![0.0; mdp.num_states()],
        })
    }

    /// Mix the evaluated policy with a uniformly random action with probability `epsilon`.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, SolverError> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(SolverError::InvalidEpsilon { value: epsilon });
        }
        self.epsilon = epsilon;
        Ok(self)
    }

    pub fn with_mixing(mut self, mixing: EpsilonMixing) -> Self {
        self.mixing = mixing;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn values(&self) -> &ValueFunction {
        &self.values
    }

    pub fn into_values(self) -> ValueFunction {
        self.values
    }

    /// Evaluate a deterministic policy (epsilon-mixed if configured).
    pub fn evaluate<R: Rng + ?Sized>(
        &mut self,
        policy: &Policy,
        rng: &mut R,
    ) -> Result<RunReport, SolverError> {
        self.evaluate_with_hook(policy, rng, |_| {})
    }

    /// Evaluate a deterministic policy, invoking `on_sweep` after every sweep.
    pub fn evaluate_with_hook<R, FHook>(
        &mut self,
        policy: &Policy,
        rng: &mut R,
        on_sweep: FHook,
    ) -> Result<RunReport, SolverError>
    where
        R: Rng + ?Sized,
        FHook: FnMut(&SweepMetrics),
    {
        policy.check(self.mdp.num_states(), self.mdp.num_actions())?;

        let (mdp, epsilon, mixing) = (self.mdp, self.epsilon, self.mixing);
        let gamma = self.config.gamma;
        let uniform = epsilon / mdp.num_actions() as f64;

        let report = self.run(rng, on_sweep, |state, values, rng| {
            let greedy = policy.action(state);
            match mixing {
                EpsilonMixing::Sampled => {
                    let action = if epsilon > 0.0 && rng.r#gen::<f64>() < epsilon {
                        mdp.random_action(rng)
                    } else {
                        greedy
                    };
                    lookahead(mdp, state, action, gamma, values, rng)
                }
                EpsilonMixing::Expected => mdp
                    .actions()
                    .map(|action| {
                        let weight = if action == greedy {
                            1.0 - epsilon + uniform
                        } else {
                            uniform
                        };
                        if weight == 0.0 {
                            0.0
                        } else {
                            weight * lookahead(mdp, state, action, gamma, values, rng)
                        }
                    })
                    .sum(),
            }
        });

        Ok(report)
    }

    /// Evaluate a stochastic policy by backing up its expected action value.
    pub fn evaluate_stochastic<R: Rng + ?Sized>(
        &mut self,
        policy: &StochasticPolicy,
        rng: &mut R,
    ) -> Result<RunReport, SolverError> {
        policy.check(self.mdp.num_states(), self.mdp.num_actions())?;

        let mdp = self.mdp;
        let gamma = self.config.gamma;
        let report = self.run(rng, |_| {}, |state, values, rng| {
            policy
                .distribution(state)
                .iter()
                .enumerate()
                .filter(|(_, p)| **p > 0.0)
                .map(|(a, p)| p * lookahead(mdp, state, Action::from(a), gamma, values, rng))
                .sum()
        });

        Ok(report)
    }

    fn run<R, FHook, FBackup>(&mut self, rng: &mut R, on_sweep: FHook, mut backup: FBackup) -> RunReport
    where
        R: Rng + ?Sized,
        FHook: FnMut(&SweepMetrics),
        FBackup: FnMut(State, &[f64], &mut R) -> f64,
    {
        let config = self.config;
        let mdp = self.mdp;
        let values = &mut self.values;
        let scratch = &mut self.scratch;

        let report = run_sweeps(
            &config,
            || {
                let mut max_delta = 0.0_f64;
                for state in mdp.states() {
                    let v = backup(state, values.as_slice(), rng);
                    max_delta = max_delta.max((v - values.get(state)).abs());
                    scratch[state.index()] = v;
                }
                std::mem::swap(values.as_mut_vec(), scratch);
                max_delta
            },
            on_sweep,
        );

        debug!(
            states = mdp.num_states(),
            gamma = config.gamma,
            epsilon = self.epsilon,
            sweeps = report.sweeps,
            converged = report.converged,
            final_delta = report.final_delta,
            "policy evaluation finished"
        );
        report
    }
}
