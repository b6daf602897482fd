//! Scalar summaries of value functions used to compare estimated and true models.

use crate::solve::{error::SolverError, values::ValueFunction};

/// Mean of V over all states, 0 for an empty value function.
pub fn mean_value(values: &ValueFunction) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.as_slice().iter().sum::<f64>() / values.len() as f64
}

/// Mean over states of `reference(s) - candidate(s)`.
///
/// Positive when the candidate policy earns less than the reference.
pub fn empirical_loss(reference: &ValueFunction, candidate: &ValueFunction) -> Result<f64, SolverError> {
    if reference.len() != candidate.len() {
        return Err(SolverError::StateCountMismatch {
            expected: reference.len(),
            got: candidate.len(),
        });
    }
    if reference.is_empty() {
        return Ok(0.0);
    }

    let gap: f64 = reference
        .as_slice()
        .iter()
        .zip(candidate.as_slice())
        .map(|(r, c)| r - c)
        .sum();
    Ok(gap / reference.len() as f64)
}

/// Negated mean value, so lower is better.
pub fn training_loss(values: &ValueFunction) -> f64 {
    -mean_value(values)
}
