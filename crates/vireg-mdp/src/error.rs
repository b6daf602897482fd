use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Error type for MDP construction, YAML IO, trajectory bookkeeping, and estimation.
pub enum ModelError {
    #[error("model file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("model file {} is not a valid model description: {source}", .path.display())]
    YamlFile {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("an MDP needs at least one state and one action, got {states} states and {actions} actions")]
    EmptySpace { states: usize, actions: usize },

    #[error(
        "table shape mismatch: expected {expected_states} states x {expected_actions} actions, got {states} x {actions}"
    )]
    ShapeMismatch {
        expected_states: usize,
        expected_actions: usize,
        states: usize,
        actions: usize,
    },

    #[error(
        "transition from state {state} under action {action} to state {next} is not a valid probability: {value}"
    )]
    InvalidProbability {
        state: usize,
        action: usize,
        next: usize,
        value: f64,
    },

    #[error(
        "transition probabilities from state {state} under action {action} must sum to 1 within {tolerance}, got {sum}"
    )]
    ProbabilitySum {
        state: usize,
        action: usize,
        sum: f64,
        tolerance: f64,
    },

    #[error("reward from state {state} under action {action} to state {next} is not finite: {value}")]
    InvalidReward {
        state: usize,
        action: usize,
        next: usize,
        value: f64,
    },

    #[error("reward noise must be finite and >= 0, got {value}")]
    InvalidRewardNoise { value: f64 },

    #[error("regularization blend must lie in [0, 1], got {value}")]
    InvalidBlend { value: f64 },

    #[error("default reward for unseen pairs must be finite, got {value}")]
    InvalidUnseenReward { value: f64 },

    #[error("state {state} is outside a model with {num_states} states")]
    UnknownState { state: usize, num_states: usize },

    #[error("action {action} is outside a model with {num_actions} actions")]
    UnknownAction { action: usize, num_actions: usize },

    #[error("trajectory has not been initialized with a start state")]
    TrajectoryNotInitialized,

    #[error("trajectory was already initialized with state {state}")]
    TrajectoryAlreadyInitialized { state: usize },

    #[error("duplicate state id '{id}'")]
    DuplicateStateId { id: String },

    #[error("duplicate action id '{id}'")]
    DuplicateActionId { id: String },

    #[error("transition entry references unknown state '{id}'")]
    UnknownStateId { id: String },

    #[error("transition entry references unknown action '{id}'")]
    UnknownActionId { id: String },

    #[error("state '{state}' action '{action}' is declared more than once")]
    DuplicateTransition { state: String, action: String },

    #[error("state '{state}' action '{action}' lists next state '{next}' more than once")]
    DuplicateOutcome {
        state: String,
        action: String,
        next: String,
    },

    #[error("state '{state}' action '{action}' has no transition entry")]
    MissingTransition { state: String, action: String },
}
