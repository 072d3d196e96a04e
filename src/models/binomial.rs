//! Binomial Lattice
//!
//! Cox-Ross-Rubinstein recombining tree for American calls. Each node takes
//! the larger of the discounted risk-neutral continuation value and the
//! intrinsic value, which is what prices the early-exercise right.
//!
//! Work is O(N²) in the step count; N = 500 converges to within cents of
//! the closed form for typical equity parameters.

use serde::{Deserialize, Serialize};

use crate::core::{FairValueError, FairValueResult};

/// Default number of time steps
pub const DEFAULT_LATTICE_STEPS: usize = 500;

/// American call lattice with a fixed step count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinomialTree {
    pub steps: usize,
}

impl Default for BinomialTree {
    fn default() -> Self {
        Self {
            steps: DEFAULT_LATTICE_STEPS,
        }
    }
}

impl BinomialTree {
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }

    /// American call price
    pub fn american_call(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        vol: f64,
        div: f64,
    ) -> FairValueResult<f64> {
        american_call(spot, strike, time, rate, vol, div, self.steps)
    }
}

/// American call price on a `steps`-step CRR tree
///
/// Returns [`FairValueError::ArbitrageViolation`] when the risk-neutral
/// up-probability falls outside `[0, 1]` for this discretization.
pub fn american_call(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    div: f64,
    steps: usize,
) -> FairValueResult<f64> {
    if time <= 0.0 {
        return Ok((spot - strike).max(0.0));
    }
    if steps == 0 {
        return Err(FairValueError::invalid_input("Lattice needs at least one step"));
    }
    if !(spot.is_finite() && spot > 0.0 && strike.is_finite() && strike > 0.0) {
        return Err(FairValueError::invalid_input("Non-positive spot or strike"));
    }
    if !(vol.is_finite() && vol >= 0.0) {
        return Err(FairValueError::invalid_input("Negative volatility"));
    }

    let dt = time / steps as f64;
    let u = (vol * dt.sqrt()).exp();
    let d = 1.0 / u;
    let p = (((rate - div) * dt).exp() - d) / (u - d);

    if !(0.0..=1.0).contains(&p) {
        tracing::warn!(
            probability = p,
            vol,
            dt,
            rate,
            div,
            "Risk-neutral probability outside [0, 1]; check inputs or increase steps"
        );
        return Err(FairValueError::ArbitrageViolation { probability: p });
    }

    let discount = (-rate * dt).exp();
    let p_up = discount * p;
    let p_down = discount * (1.0 - p);

    // Node j at step i holds S u^(i-j) d^j; since d = 1/u that is S u^(i-2j)
    let mut values: Vec<f64> = (0..=steps)
        .map(|j| (spot * u.powi(steps as i32 - 2 * j as i32) - strike).max(0.0))
        .collect();

    for i in (0..steps).rev() {
        for j in 0..=i {
            let continuation = p_up * values[j] + p_down * values[j + 1];
            let exercise = (spot * u.powi(i as i32 - 2 * j as i32) - strike).max(0.0);
            values[j] = continuation.max(exercise);
        }
    }

    Ok(values[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::call_price;

    #[test]
    fn test_expired_is_intrinsic() {
        assert_eq!(american_call(120.0, 100.0, 0.0, 0.05, 0.2, 0.0, 10).unwrap(), 20.0);
        assert_eq!(american_call(80.0, 100.0, -1.0, 0.05, 0.2, 0.0, 10).unwrap(), 0.0);
    }

    #[test]
    fn test_converges_to_closed_form_without_dividends() {
        let european = call_price(100.0, 100.0, 1.0, 0.05, 0.20, 0.0);
        let lattice = american_call(100.0, 100.0, 1.0, 0.05, 0.20, 0.0, 1000).unwrap();

        assert!((lattice - european).abs() / european < 0.01);
    }

    #[test]
    fn test_error_shrinks_with_steps() {
        let european = call_price(100.0, 100.0, 1.0, 0.05, 0.20, 0.0);
        let coarse = american_call(100.0, 100.0, 1.0, 0.05, 0.20, 0.0, 10).unwrap();
        let fine = american_call(100.0, 100.0, 1.0, 0.05, 0.20, 0.0, 1000).unwrap();

        assert!((fine - european).abs() < (coarse - european).abs());
    }

    #[test]
    fn test_early_exercise_premium() {
        let european = call_price(100.0, 90.0, 0.5, 0.02, 0.30, 0.10);
        let american = american_call(100.0, 90.0, 0.5, 0.02, 0.30, 0.10, 500).unwrap();

        assert!(american >= european);
        // Deep enough dividend makes the premium material
        assert!(american - european > 0.5);
    }

    #[test]
    fn test_never_below_intrinsic() {
        let price = american_call(150.0, 100.0, 0.5, 0.01, 0.15, 0.20, 200).unwrap();
        assert!(price >= 50.0);
    }

    #[test]
    fn test_arbitrage_violation() {
        // Near-zero vol with positive carry pushes p above 1
        let result = american_call(100.0, 100.0, 1.0, 0.10, 0.001, 0.0, 10);
        assert!(matches!(
            result,
            Err(FairValueError::ArbitrageViolation { probability }) if probability > 1.0
        ));
    }

    #[test]
    fn test_zero_steps_rejected() {
        let result = american_call(100.0, 100.0, 1.0, 0.05, 0.2, 0.0, 0);
        assert!(matches!(result, Err(FairValueError::InvalidInput(_))));
    }

    #[test]
    fn test_tree_wrapper_uses_configured_steps() {
        let tree = BinomialTree::new(50);
        let direct = american_call(100.0, 95.0, 0.75, 0.04, 0.25, 0.01, 50).unwrap();
        assert_eq!(tree.american_call(100.0, 95.0, 0.75, 0.04, 0.25, 0.01).unwrap(), direct);
        assert_eq!(BinomialTree::default().steps, DEFAULT_LATTICE_STEPS);
    }
}
