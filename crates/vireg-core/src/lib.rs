mod solve;

pub use solve::config::{
    DEFAULT_MAX_SWEEPS, DEFAULT_TOLERANCE, Operator, SolverConfig, SolverConfigError,
};
pub use solve::dynamics::adapt_dynamics;
pub use solve::error::SolverError;
pub use solve::evaluation::{EpsilonMixing, PolicyEvaluation};
pub use solve::metrics::{empirical_loss, mean_value, training_loss};
pub use solve::softmax::{boltzmann_value, boltzmann_weights, log_partition, row_max};
pub use solve::solution::{Solution, SolutionSnapshot, StateSnapshot, solve};
pub use solve::value_iteration::{ValueIteration, stochastic_policy};
pub use solve::values::{Policy, QFunction, StochasticPolicy, ValueFunction};
pub use solve::{RunReport, SweepMetrics};
