mod builder;
mod error;
mod estimator;
mod ids;
mod io;
mod model;
mod sampler;
mod spec;
mod table;
mod trajectory;

pub use builder::MdpBuilder;
pub use error::ModelError;
pub use estimator::{
    DEFAULT_UNSEEN_REWARD, EstimatorConfig, MdpEstimator, PooledCounts, action_marginal,
    regularize,
};
pub use ids::{Action, State};
pub use io::{compile_yaml, export_yaml, load_yaml, save_yaml};
pub use model::{Mdp, PROB_TOLERANCE, validate_transition};
pub use sampler::{ExplorationMode, TrajectorySampler};
pub use spec::{MdpSpec, OutcomeSpec, TransitionSpec};
pub use table::{PairTable, TripleTable, state_action_pairs};
pub use trajectory::Trajectory;
