use rand::Rng;
use serde::Serialize;
use vireg_mdp::Mdp;

use crate::solve::{
    config::{Operator, SolverConfig},
    error::SolverError,
    sweep::RunReport,
    value_iteration::ValueIteration,
    values::{Policy, QFunction, StochasticPolicy, ValueFunction},
};

/// Everything a finished value-iteration run produces.
#[derive(Debug, Clone)]
pub struct Solution {
    pub config: SolverConfig,
    pub report: RunReport,
    pub values: ValueFunction,
    pub q: QFunction,
    pub policy: Policy,
    pub stochastic_policy: StochasticPolicy,
}

/// Run value iteration to completion and extract both policies.
pub fn solve<R: Rng + ?Sized>(
    mdp: &Mdp,
    config: SolverConfig,
    rng: &mut R,
) -> Result<Solution, SolverError> {
    let mut solver = ValueIteration::new(mdp, config)?;
    let report = solver.run(rng);
    let policy = solver.compute_policy(rng).clone();
    let stochastic_policy = solver.stochastic_policy();

    Ok(Solution {
        config,
        report,
        values: solver.values().clone(),
        q: solver.into_q(),
        policy,
        stochastic_policy,
    })
}

impl Solution {
    pub fn snapshot(&self) -> SolutionSnapshot {
        let beta = match self.config.operator {
            Operator::HardMax => None,
            Operator::Boltzmann { beta } => Some(beta),
        };

        SolutionSnapshot {
            schema_version: 1,
            gamma: self.config.gamma,
            beta,
            sweeps: self.report.sweeps,
            converged: self.report.converged,
            final_delta: self.report.final_delta,
            states: self
                .values
                .iter()
                .map(|(state, value)| StateSnapshot {
                    state: state.index(),
                    value,
                    action: self.policy.action(state).index(),
                    q: self.q.row(state).to_vec(),
                    action_probabilities: self.stochastic_policy.distribution(state).to_vec(),
                })
                .collect(),
        }
    }

    /// Pretty JSON dump of [`Solution::snapshot`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionSnapshot {
    pub schema_version: u32,
    pub gamma: f64,
    pub beta: Option<f64>,
    pub sweeps: usize,
    pub converged: bool,
    pub final_delta: f64,
    pub states: Vec<StateSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state: usize,
    pub value: f64,
    pub action: usize,
    pub q: Vec<f64>,
    pub action_probabilities: Vec<f64>,
}
