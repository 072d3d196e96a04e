//! Black-Scholes-Merton Model
//!
//! Provides:
//! - European call pricing with a continuous dividend yield
//! - Implied volatility solver (bisection on price tolerance)
//!
//! The closed form is the inversion target for implied volatility; the
//! binomial lattice does the actual American valuation.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::core::{FairValueError, FairValueResult};

/// Volatility below which the closed form degenerates to discounted intrinsic
pub const MIN_VOLATILITY: f64 = 1e-6;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    ((spot / strike).ln() + (rate - div + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    d1(spot, strike, time, rate, vol, div) - vol * time.sqrt()
}

/// European call price
///
/// Expired contracts (`time <= 0`) return `max(0, S - K)`. A volatility
/// below [`MIN_VOLATILITY`] returns the discounted forward intrinsic value
/// `max(0, S e^{-qT} - K e^{-rT})`.
pub fn call_price(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    if time <= 0.0 {
        return (spot - strike).max(0.0);
    }

    let spot_df = spot * (-div * time).exp();
    let strike_df = strike * (-rate * time).exp();

    if vol < MIN_VOLATILITY {
        return (spot_df - strike_df).max(0.0);
    }

    let d1 = d1(spot, strike, time, rate, vol, div);
    let d2 = d1 - vol * time.sqrt();

    spot_df * norm_cdf(d1) - strike_df * norm_cdf(d2)
}

/// Bisection settings for [`implied_volatility`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolverConfig {
    /// Lower volatility bound (0.1%)
    pub low: f64,
    /// Upper volatility bound (500%)
    pub high: f64,
    /// Convergence threshold on |model price - market price|
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            low: 0.001,
            high: 5.0,
            tolerance: 1e-6,
            max_iterations: 200,
        }
    }
}

/// Implied volatility of a European call by bisection
///
/// Stops only when the model price is within `tolerance` of the market
/// price. Market prices outside `[price(low), price(high)]` are rejected
/// with [`FairValueError::OutOfBracket`]; running out of iterations yields
/// [`FairValueError::NoConvergence`] rather than the last midpoint.
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    div: f64,
    config: &IvSolverConfig,
) -> FairValueResult<f64> {
    // Sanity checks
    if !(market_price.is_finite() && market_price > 0.0) {
        return Err(FairValueError::invalid_input("Non-positive option price"));
    }
    if !(time.is_finite() && time > 0.0) {
        return Err(FairValueError::invalid_input("Non-positive time to expiry"));
    }
    if !(spot.is_finite() && spot > 0.0 && strike.is_finite() && strike > 0.0) {
        return Err(FairValueError::invalid_input("Non-positive spot or strike"));
    }
    if !(config.low > 0.0 && config.low < config.high) {
        return Err(FairValueError::config(format!(
            "Invalid volatility bracket [{}, {}]",
            config.low, config.high
        )));
    }

    let low_price = call_price(spot, strike, time, rate, config.low, div);
    let high_price = call_price(spot, strike, time, rate, config.high, div);

    if market_price < low_price || market_price > high_price {
        return Err(FairValueError::OutOfBracket {
            market_price,
            low_price,
            high_price,
        });
    }

    let mut low = config.low;
    let mut high = config.high;
    let mut mid = 0.5 * (low + high);

    for _ in 0..config.max_iterations {
        mid = 0.5 * (low + high);
        let diff = call_price(spot, strike, time, rate, mid, div) - market_price;

        if diff.abs() < config.tolerance {
            return Ok(mid);
        }

        if diff < 0.0 {
            low = mid;
        } else {
            high = mid;
        }
    }

    Err(FairValueError::NoConvergence {
        iterations: config.max_iterations,
        last_estimate: mid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-10);
        assert!((norm_cdf(1.96) - 0.975).abs() < 0.001);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 0.001);
    }

    #[test]
    fn test_call_price() {
        // ATM call, 20% vol, 1 year, 5% rate: ~10.45
        let price = call_price(100.0, 100.0, 1.0, 0.05, 0.20, 0.0);
        assert!((price - 10.4506).abs() < 1e-3);
    }

    #[test]
    fn test_call_price_with_dividend() {
        let price = call_price(150.0, 150.0, 1.0, 0.05, 0.20, 0.02);
        assert!((price - 13.8405).abs() < 1e-3);
    }

    #[test]
    fn test_expired_is_intrinsic() {
        for vol in [0.0, 0.2, 3.0] {
            assert_eq!(call_price(110.0, 100.0, 0.0, 0.05, vol, 0.01), 10.0);
            assert_eq!(call_price(90.0, 100.0, -0.1, 0.05, vol, 0.01), 0.0);
        }
    }

    #[test]
    fn test_zero_vol_is_discounted_forward_intrinsic() {
        let price = call_price(100.0, 90.0, 1.0, 0.05, 0.0, 0.02);
        let expected = 100.0 * (-0.02_f64).exp() - 90.0 * (-0.05_f64).exp();
        assert!((price - expected).abs() < 1e-12);

        assert_eq!(call_price(80.0, 100.0, 1.0, 0.05, 1e-9, 0.0), 0.0);
    }

    #[test]
    fn test_implied_vol_round_trip() {
        let market_price = call_price(150.0, 150.0, 1.0, 0.05, 0.20, 0.02);
        let iv = implied_volatility(
            market_price,
            150.0,
            150.0,
            1.0,
            0.05,
            0.02,
            &IvSolverConfig::default(),
        )
        .unwrap();

        assert!((iv - 0.20).abs() < 1e-4);
    }

    #[test]
    fn test_implied_vol_otm() {
        let market_price = call_price(100.0, 120.0, 0.25, 0.05, 0.45, 0.01);
        let iv = implied_volatility(
            market_price,
            100.0,
            120.0,
            0.25,
            0.05,
            0.01,
            &IvSolverConfig::default(),
        )
        .unwrap();

        assert!((iv - 0.45).abs() < 1e-3);
    }

    #[test]
    fn test_implied_vol_invalid_inputs() {
        let config = IvSolverConfig::default();
        for (price, spot, strike, time) in [
            (0.0, 100.0, 100.0, 1.0),
            (5.0, 0.0, 100.0, 1.0),
            (5.0, 100.0, -1.0, 1.0),
            (5.0, 100.0, 100.0, 0.0),
            (f64::NAN, 100.0, 100.0, 1.0),
        ] {
            let result = implied_volatility(price, spot, strike, time, 0.05, 0.0, &config);
            assert!(matches!(result, Err(FairValueError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_implied_vol_out_of_bracket() {
        let config = IvSolverConfig::default();
        let floor = call_price(100.0, 100.0, 1.0, 0.05, config.low, 0.0);
        let ceiling = call_price(100.0, 100.0, 1.0, 0.05, config.high, 0.0);

        let below = implied_volatility(floor - 0.5, 100.0, 100.0, 1.0, 0.05, 0.0, &config);
        assert!(matches!(below, Err(FairValueError::OutOfBracket { .. })));

        let above = implied_volatility(ceiling + 0.5, 100.0, 100.0, 1.0, 0.05, 0.0, &config);
        assert!(matches!(above, Err(FairValueError::OutOfBracket { .. })));
    }

    #[test]
    fn test_implied_vol_reports_non_convergence() {
        let config = IvSolverConfig {
            max_iterations: 3,
            tolerance: 1e-12,
            ..IvSolverConfig::default()
        };
        let market_price = call_price(100.0, 100.0, 1.0, 0.05, 0.3137, 0.0);
        let result = implied_volatility(market_price, 100.0, 100.0, 1.0, 0.05, 0.0, &config);

        match result {
            Err(FairValueError::NoConvergence { iterations, .. }) => assert_eq!(iterations, 3),
            other => panic!("expected NoConvergence, got {:?}", other),
        }
    }
}
