use std::fmt;

use vireg_mdp::{Action, ModelError, State};

use crate::solve::config::SolverConfigError;

/// Error type for solver construction, policy evaluation, and model adaptation.
#[derive(Debug)]
pub enum SolverError {
    /// The solver configuration failed validation.
    Config(SolverConfigError),
    /// A derived model failed validation.
    Model(ModelError),
    /// A policy or value function covers a different number of states than the model.
    StateCountMismatch { expected: usize, got: usize },
    /// A Q-function or stochastic policy has different dimensions than the model.
    ShapeMismatch {
        expected_states: usize,
        expected_actions: usize,
        states: usize,
        actions: usize,
    },
    /// A deterministic policy selects an action the model does not have.
    InvalidPolicyAction {
        state: State,
        action: Action,
        num_actions: usize,
    },
    /// A stochastic policy assigns a negative or non-finite probability.
    InvalidActionProbability {
        state: State,
        action: Action,
        value: f64,
    },
    /// A stochastic policy's action distribution does not sum to 1.
    ActionProbabilitySum { state: State, sum: f64 },
    /// Exploration probability outside `[0, 1]`.
    InvalidEpsilon { value: f64 },
    /// Inverse temperature that is negative or NaN.
    InvalidBeta { value: f64 },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Config(err) => write!(f, "{err}"),
            SolverError::Model(err) => write!(f, "model error: {err}"),
            SolverError::StateCountMismatch { expected, got } => write!(
                f,
                "expected an entry for each of {expected} states, got {got}"
            ),
            SolverError::ShapeMismatch {
                expected_states,
                expected_actions,
                states,
                actions,
            } => write!(
                f,
                "expected a {expected_states} x {expected_actions} table, got {states} x {actions}"
            ),
            SolverError::InvalidPolicyAction {
                state,
                action,
                num_actions,
            } => write!(
                f,
                "policy selects action {} in state {} but the model has {} actions",
                action.index(),
                state.index(),
                num_actions
            ),
            SolverError::InvalidActionProbability {
                state,
                action,
                value,
            } => write!(
                f,
                "policy gives action {} in state {} invalid probability {value}",
                action.index(),
                state.index()
            ),
            SolverError::ActionProbabilitySum { state, sum } => write!(
                f,
                "policy action probabilities in state {} sum to {sum}",
                state.index()
            ),
            SolverError::InvalidEpsilon { value } => {
                write!(f, "epsilon must lie in [0, 1], got {value}")
            }
            SolverError::InvalidBeta { value } => write!(f, "beta must be >= 0, got {value}"),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Config(err) => Some(err),
            SolverError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SolverConfigError> for SolverError {
    fn from(value: SolverConfigError) -> Self {
        SolverError::Config(value)
    }
}

impl From<ModelError> for SolverError {
    fn from(value: ModelError) -> Self {
        SolverError::Model(value)
    }
}
