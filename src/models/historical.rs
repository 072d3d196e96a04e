//! Historical (realized) volatility from a close-price series

use statrs::statistics::Statistics;

/// Trading days used to annualize daily return volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized standard deviation of daily log returns
///
/// Non-positive or non-finite closes are dropped first. Returns `None` when
/// fewer than three usable closes remain (two returns are needed for a
/// sample standard deviation).
pub fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    let clean: Vec<f64> = closes
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();

    if clean.len() < 3 {
        return None;
    }

    let returns: Vec<f64> = clean.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let daily = returns.std_dev();

    daily
        .is_finite()
        .then(|| daily * TRADING_DAYS_PER_YEAR.sqrt())
}
