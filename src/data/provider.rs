//! Market data collaborator interfaces
//!
//! Providers report what they found and nothing more. Deciding which default
//! replaces a missing value is the valuation layer's job.

use serde::{Deserialize, Serialize};

use crate::core::{FairValueResult, OptionContract, OptionQuote, UnderlyingQuote};

/// Outcome of a data lookup that is allowed to come back empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// Spot, dividend and option quotes
pub trait MarketDataProvider {
    /// Spot price and dividend yield for a ticker
    fn underlying(&self, ticker: &str) -> FairValueResult<Lookup<UnderlyingQuote>>;

    /// Bid/ask/last for one listed contract
    fn option_quote(&self, contract: &OptionContract) -> FairValueResult<Lookup<OptionQuote>>;
}

/// Annualized risk-free rate as a decimal
pub trait RiskFreeRateProvider {
    fn risk_free_rate(&self) -> FairValueResult<Lookup<f64>>;
}

/// Annualized realized volatility as a decimal
pub trait HistoricalVolatilityProvider {
    fn historical_volatility(&self, ticker: &str) -> FairValueResult<Lookup<f64>>;
}

/// Rate provider that always returns the same rate
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub f64);

impl RiskFreeRateProvider for FixedRate {
    fn risk_free_rate(&self) -> FairValueResult<Lookup<f64>> {
        Ok(Lookup::Found(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_conversions() {
        assert_eq!(Lookup::from(Some(3)).found(), Some(3));
        assert_eq!(Lookup::<i32>::from(None), Lookup::NotFound);
        assert_eq!(Lookup::Found(2).map(|v| v * 10), Lookup::Found(20));
        assert!(!Lookup::<f64>::NotFound.is_found());
    }

    #[test]
    fn test_fixed_rate() {
        assert_eq!(FixedRate(0.0441).risk_free_rate().unwrap(), Lookup::Found(0.0441));
    }
}
