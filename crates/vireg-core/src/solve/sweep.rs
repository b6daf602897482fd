use rand::Rng;
use serde::Serialize;
use tracing::trace;
use vireg_mdp::{Action, Mdp, State};

use crate::solve::config::SolverConfig;

/// Per-sweep metrics emitted to run hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepMetrics {
    /// 1-based sweep number.
    pub sweep: usize,
    /// Largest absolute change of the tracked quantity in this sweep.
    pub max_delta: f64,
}

/// Outcome of a complete fixed-point run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunReport {
    pub sweeps: usize,
    /// Whether the run stopped on tolerance rather than the sweep cap.
    pub converged: bool,
    pub final_delta: f64,
}

/// Repeat `sweep` until its delta drops below the tolerance or the cap is hit.
pub(crate) fn run_sweeps<FSweep, FHook>(
    config: &SolverConfig,
    mut sweep: FSweep,
    mut on_sweep: FHook,
) -> RunReport
where
    FSweep: FnMut() -> f64,
    FHook: FnMut(&SweepMetrics),
{
    let mut report = RunReport {
        sweeps: 0,
        converged: false,
        final_delta: f64::INFINITY,
    };

    while report.sweeps < config.max_sweeps {
        let max_delta = sweep();
        report.sweeps += 1;
        report.final_delta = max_delta;

        let metrics = SweepMetrics {
            sweep: report.sweeps,
            max_delta,
        };
        trace!(sweep = metrics.sweep, max_delta, "completed sweep");
        on_sweep(&metrics);

        if max_delta < config.tolerance {
            report.converged = true;
            break;
        }
    }

    report
}

/// One-step lookahead `sum_s' T(s, a, s') * (R(s, a, s') + gamma * V(s'))`.
///
/// Zero-probability next states are skipped; rewards come from [`Mdp::reward`], so
/// configured reward noise perturbs every term.
pub(crate) fn lookahead<R: Rng + ?Sized>(
    mdp: &Mdp,
    state: State,
    action: Action,
    gamma: f64,
    next_values: &[f64],
    rng: &mut R,
) -> f64 {
    mdp.transition_row(state, action)
        .iter()
        .zip(next_values)
        .enumerate()
        .filter(|(_, (p, _))| **p > 0.0)
        .map(|(next, (p, v))| {
            let reward = mdp.reward(state, State::from(next), action, rng);
            p * (reward + gamma * v)
        })
        .sum()
}
