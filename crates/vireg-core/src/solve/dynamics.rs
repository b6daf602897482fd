use vireg_mdp::{Mdp, TripleTable};

use crate::solve::{error::SolverError, softmax::boltzmann_weights, values::QFunction};

/// Build a new model whose dynamics are pulled toward the Boltzmann policy of `q`.
///
/// With `pi(a|s)` the Boltzmann action probability at inverse temperature `beta` and
/// `M(s, .) = sum_a' pi(a'|s) T(s, a', .)` the policy-marginal next-state distribution,
/// each row becomes
///
/// `T'(s, a, .) ∝ pi(a|s) T(s, a, .) + (1 - pi(a|s)) M(s, .)`
///
/// renormalized. Actions the policy already favours keep their own dynamics; unlikely
/// actions are shrunk toward what the policy does in that state. Rewards and reward
/// noise carry over, and the source model is left untouched.
///
/// The Bellman backups never call this; interleave it between sweeps and resume with
/// [`crate::ValueIteration::warm_start`].
pub fn adapt_dynamics(mdp: &Mdp, q: &QFunction, beta: f64) -> Result<Mdp, SolverError> {
    if beta.is_nan() || beta < 0.0 {
        return Err(SolverError::InvalidBeta { value: beta });
    }
    q.check_shape(mdp.num_states(), mdp.num_actions())?;

    let num_states = mdp.num_states();
    let num_actions = mdp.num_actions();
    let mut weights = vec![0.0_f64; num_actions];
    let mut marginal = vec![0.0_f64; num_states];
    let mut adapted = TripleTable::new(num_states, num_actions);

    for state in mdp.states() {
        boltzmann_weights(q.row(state), beta, &mut weights);

        marginal.fill(0.0);
        for (action, w) in mdp.actions().zip(&weights) {
            for (m, p) in marginal.iter_mut().zip(mdp.transition_row(state, action)) {
                *m += w * p;
            }
        }

        for (action, w) in mdp.actions().zip(&weights) {
            let row = adapted.row_mut(state, action);
            for ((out, p), m) in row
                .iter_mut()
                .zip(mdp.transition_row(state, action))
                .zip(&marginal)
            {
                *out = w * p + (1.0 - w) * m;
            }
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                row.iter_mut().for_each(|p| *p /= sum);
            }
        }
    }

    Ok(mdp.with_transition(adapted)?)
}
