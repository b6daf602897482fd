pub mod config;
pub mod dynamics;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod softmax;
pub mod solution;
mod sweep;
pub mod value_iteration;
pub mod values;

pub use sweep::{RunReport, SweepMetrics};

#[cfg(test)]
mod tests;
