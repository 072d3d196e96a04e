//! Market quotes
//!
//! Quotes for underlyings and single option contracts, plus the per-run
//! `MarketSnapshot` the pricers consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::option::OptionContract;

/// Option market quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// The option contract
    pub contract: OptionContract,
    /// Bid price
    pub bid: Option<f64>,
    /// Ask price
    pub ask: Option<f64>,
    /// Last traded price
    pub last: Option<f64>,
    /// Trading volume
    pub volume: Option<u64>,
    /// Open interest
    pub open_interest: Option<u64>,
    /// Quote timestamp
    pub timestamp: DateTime<Utc>,
}

impl OptionQuote {
    /// Create a new quote
    pub fn new(contract: OptionContract) -> Self {
        Self {
            contract,
            bid: None,
            ask: None,
            last: None,
            volume: None,
            open_interest: None,
            timestamp: Utc::now(),
        }
    }

    /// Quote with the three prices set
    pub fn with_prices(
        contract: OptionContract,
        bid: Option<f64>,
        ask: Option<f64>,
        last: Option<f64>,
    ) -> Self {
        Self {
            bid,
            ask,
            last,
            ..Self::new(contract)
        }
    }

    /// Market price for valuation: bid/ask mid when both sides are positive,
    /// else a positive last trade, else undefined
    pub fn mid_price(&self) -> Option<f64> {
        match (positive(self.bid), positive(self.ask)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => positive(self.last),
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Spot quote for an underlying, as returned by a market data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    pub symbol: String,
    pub spot: f64,
    /// Annualized continuous dividend yield as a decimal
    pub dividend_yield: f64,
    pub timestamp: DateTime<Utc>,
}

/// Everything the pricers need about one underlying for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub underlying: String,
    pub spot: f64,
    pub dividend_yield: f64,
    pub risk_free_rate: f64,
    pub as_of: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn from_quote(quote: &UnderlyingQuote, risk_free_rate: f64) -> Self {
        Self {
            underlying: quote.symbol.clone(),
            spot: quote.spot,
            dividend_yield: quote.dividend_yield,
            risk_free_rate,
            as_of: quote.timestamp,
        }
    }

    /// Spot must be a positive finite number for any pricing to happen
    pub fn is_priceable(&self) -> bool {
        self.spot.is_finite() && self.spot > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use chrono::NaiveDate;

    fn contract() -> OptionContract {
        OptionContract::american(
            "LDOS",
            180.0,
            NaiveDate::from_ymd_opt(2025, 12, 19).unwrap(),
            OptionType::Call,
        )
    }

    #[test]
    fn test_mid_from_bid_ask() {
        let quote = OptionQuote::with_prices(contract(), Some(4.0), Some(4.6), Some(3.0));
        assert!((quote.mid_price().unwrap() - 4.3).abs() < 1e-12);
    }

    #[test]
    fn test_mid_falls_back_to_last() {
        let zero_bid = OptionQuote::with_prices(contract(), Some(0.0), Some(4.6), Some(3.1));
        assert_eq!(zero_bid.mid_price(), Some(3.1));

        let no_ask = OptionQuote::with_prices(contract(), Some(4.0), None, Some(3.2));
        assert_eq!(no_ask.mid_price(), Some(3.2));
    }

    #[test]
    fn test_mid_undefined() {
        let empty = OptionQuote::new(contract());
        assert_eq!(empty.mid_price(), None);

        let zeros = OptionQuote::with_prices(contract(), Some(0.0), Some(0.0), Some(0.0));
        assert_eq!(zeros.mid_price(), None);

        let nan_last = OptionQuote::with_prices(contract(), None, None, Some(f64::NAN));
        assert_eq!(nan_last.mid_price(), None);
    }
}
