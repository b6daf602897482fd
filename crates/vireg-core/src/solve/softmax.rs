//! Log-space Boltzmann weighting over a row of Q-values.
//!
//! All terms are shifted by the row maximum before exponentiating, so large `beta` or
//! large Q-values never overflow. `beta = 0` weights every action equally and
//! `beta = inf` spreads the mass evenly over the maximizing actions.

/// Largest entry of `q`, or `-inf` for an empty row.
pub fn row_max(q: &[f64]) -> f64 {
    q.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// `log sum_a exp(beta * (q_a - max))` for a finite `beta`.
pub fn log_partition(q: &[f64], beta: f64, max: f64) -> f64 {
    q.iter()
        .map(|v| (beta * (v - max)).exp())
        .sum::<f64>()
        .ln()
}

/// Write the Boltzmann action probabilities of `q` into `out`.
pub fn boltzmann_weights(q: &[f64], beta: f64, out: &mut [f64]) {
    debug_assert_eq!(q.len(), out.len());
    let max = row_max(q);

    if beta.is_infinite() {
        let ties = q.iter().filter(|v| **v == max).count() as f64;
        for (w, v) in out.iter_mut().zip(q) {
            *w = if *v == max { 1.0 / ties } else { 0.0 };
        }
        return;
    }

    let log_z = log_partition(q, beta, max);
    for (w, v) in out.iter_mut().zip(q) {
        *w = (beta * (v - max) - log_z).exp();
    }
}

/// Boltzmann-weighted mean of `q`: `max + sum_a w_a * (q_a - max)`.
pub fn boltzmann_value(q: &[f64], beta: f64) -> f64 {
    let max = row_max(q);
    if q.is_empty() {
        return 0.0;
    }
    if beta.is_infinite() {
        return max;
    }

    let log_z = log_partition(q, beta, max);
    let offset: f64 = q
        .iter()
        .map(|v| {
            let shifted = v - max;
            (beta * shifted - log_z).exp() * shifted
        })
        .sum();
    max + offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_beta_is_uniform() {
        let q = [3.0, -7.0, 120.0];
        let mut w = [0.0; 3];
        boltzmann_weights(&q, 0.0, &mut w);
        for p in w {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert!((boltzmann_value(&q, 0.0) - 116.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn huge_values_do_not_overflow() {
        let q = [1.0e6, 1.0e6 - 1.0];
        let mut w = [0.0; 2];
        boltzmann_weights(&q, 1000.0, &mut w);
        assert!(w.iter().all(|p| p.is_finite()));
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!((boltzmann_value(&q, 1000.0) - 1.0e6).abs() < 1e-6);
    }

    #[test]
    fn infinite_beta_splits_ties_evenly() {
        let q = [2.0, 5.0, 5.0];
        let mut w = [0.0; 3];
        boltzmann_weights(&q, f64::INFINITY, &mut w);
        assert_eq!(w, [0.0, 0.5, 0.5]);
        assert_eq!(boltzmann_value(&q, f64::INFINITY), 5.0);
    }

    #[test]
    fn mass_on_unique_maximizer_increases_with_beta() {
        let q = [0.2, 1.0, 0.7];
        let mut w = [0.0; 3];
        let mut previous = 0.0;
        for beta in [0.0, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0] {
            boltzmann_weights(&q, beta, &mut w);
            assert!(w[1] > previous, "beta {beta} gave {}", w[1]);
            previous = w[1];
        }
        assert!(previous > 0.999);
    }
}
