use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;
use vireg_mdp::{Action, Mdp, PairTable, State};

use crate::solve::{
    config::{Operator, SolverConfig},
    error::SolverError,
    softmax::{boltzmann_value, boltzmann_weights},
    sweep::{RunReport, SweepMetrics, lookahead, run_sweeps},
    values::{Policy, QFunction, StochasticPolicy, ValueFunction},
};

#[derive(Debug, Clone)]
/// Synchronous value iteration over a borrowed model.
///
/// The run owns its V, Q, and policy. Each sweep reads only the previous sweep's
/// estimates (Jacobi order), so the result does not depend on state ordering.
pub struct ValueIteration<'a> {
    mdp: &'a Mdp,
    config: SolverConfig,
    values: ValueFunction,
    q: QFunction,
    policy: Option<Policy>,
    scratch: Vec<f64>,
}

impl<'a> ValueIteration<'a> {
    /// Create a solver with V and Q initialized to 0.
    pub fn new(mdp: &'a Mdp, config: SolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        Ok(ValueIteration {
            mdp,
            config,
            values: ValueFunction::zeros(mdp.num_states()),
            q: QFunction::zeros(mdp.num_states(), mdp.num_actions()),
            policy: None,
            scratch: vec![0.0; mdp.num_states()],
        })
    }

    /// Create a solver that resumes from an existing Q-function, e.g. after the
    /// dynamics were adapted between sweeps.
    pub fn warm_start(mdp: &'a Mdp, config: SolverConfig, q: QFunction) -> Result<Self, SolverError> {
        let mut solver = Self::new(mdp, config)?;
        q.check_shape(mdp.num_states(), mdp.num_actions())?;
        solver.q = q;
        let beta = solver.config.operator.beta();
        for state in mdp.states() {
            solver.values.as_mut_vec()[state.index()] = boltzmann_value(solver.q.row(state), beta);
        }
        Ok(solver)
    }

    pub fn mdp(&self) -> &'a Mdp {
        self.mdp
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn values(&self) -> &ValueFunction {
        &self.values
    }

    pub fn q(&self) -> &QFunction {
        &self.q
    }

    /// The most recently extracted policy, if any.
    pub fn policy(&self) -> Option<&Policy> {
        self.policy.as_ref()
    }

    pub fn into_q(self) -> QFunction {
        self.q
    }

    /// Sweep until convergence or the sweep cap.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RunReport {
        self.run_with_hook(rng, |_| {})
    }

    /// Sweep until convergence or the sweep cap, invoking `on_sweep` after every sweep.
    pub fn run_with_hook<R, FHook>(&mut self, rng: &mut R, on_sweep: FHook) -> RunReport
    where
        R: Rng + ?Sized,
        FHook: FnMut(&SweepMetrics),
    {
        let config = self.config;
        let report = run_sweeps(&config, || self.sweep(rng), on_sweep);

        debug!(
            states = self.mdp.num_states(),
            actions = self.mdp.num_actions(),
            gamma = config.gamma,
            operator = ?config.operator,
            sweeps = report.sweeps,
            converged = report.converged,
            final_delta = report.final_delta,
            "value iteration finished"
        );
        report
    }

    /// Perform one synchronous sweep and return the largest change.
    ///
    /// Hard max tracks the change in V; Boltzmann tracks the change in Q.
    pub fn sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        match self.config.operator {
            Operator::HardMax => self.hard_max_sweep(rng),
            Operator::Boltzmann { beta } => self.boltzmann_sweep(beta, rng),
        }
    }

    fn hard_max_sweep<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let gamma = self.config.gamma;
        let mut max_delta = 0.0_f64;

        for state in self.mdp.states() {
            let mut best = f64::NEG_INFINITY;
            for action in self.mdp.actions() {
                let q = lookahead(self.mdp, state, action, gamma, self.values.as_slice(), rng);
                self.q.table_mut().set(state, action, q);
                best = best.max(q);
            }
            max_delta = max_delta.max((best - self.values.get(state)).abs());
            self.scratch[state.index()] = best;
        }

        std::mem::swap(self.values.as_mut_vec(), &mut self.scratch);
        max_delta
    }

    fn boltzmann_sweep<R: Rng + ?Sized>(&mut self, beta: f64, rng: &mut R) -> f64 {
        let gamma = self.config.gamma;

        // Soft values of the previous Q feed every backup in this sweep.
        for state in self.mdp.states() {
            self.scratch[state.index()] = boltzmann_value(self.q.row(state), beta);
        }

        let mut max_delta = 0.0_f64;
        for state in self.mdp.states() {
            for action in self.mdp.actions() {
                let q = lookahead(self.mdp, state, action, gamma, &self.scratch, rng);
                max_delta = max_delta.max((q - self.q.get(state, action)).abs());
                self.q.table_mut().set(state, action, q);
            }
        }

        for state in self.mdp.states() {
            self.values.as_mut_vec()[state.index()] = boltzmann_value(self.q.row(state), beta);
        }
        max_delta
    }

    /// Extract a greedy policy from Q.
    ///
    /// Actions tie only on exact equality; ties are broken uniformly at random with `rng`,
    /// so repeated calls may pick different actions for tied states.
    pub fn compute_policy<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &Policy {
        let mut actions = Vec::with_capacity(self.mdp.num_states());
        let mut ties = Vec::with_capacity(self.mdp.num_actions());

        for state in self.mdp.states() {
            let max = self.q.max(state);
            ties.clear();
            ties.extend(
                self.q
                    .row(state)
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| **q == max)
                    .map(|(a, _)| Action::from(a)),
            );
            // A finite row always has at least one maximizer.
            actions.push(ties.choose(rng).copied().unwrap_or(Action::from(0)));
        }

        self.policy.insert(Policy::from_actions(actions))
    }

    /// Per-state Boltzmann distribution over actions at the operator's inverse
    /// temperature. Under the hard max this is uniform over the maximizing actions.
    pub fn stochastic_policy(&self) -> StochasticPolicy {
        stochastic_policy(&self.q, self.config.operator.beta())
    }
}

/// Per-state Boltzmann distribution over the actions of `q`.
pub fn stochastic_policy(q: &QFunction, beta: f64) -> StochasticPolicy {
    let mut table = PairTable::new(q.num_states(), q.num_actions());
    for state in (0..q.num_states()).map(State::from) {
        boltzmann_weights(q.row(state), beta, table.row_mut(state));
    }
    StochasticPolicy::from_table(table)
}
