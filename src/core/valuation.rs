//! Valuation records
//!
//! Plain data produced by one valuation run and handed to renderers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::option::{OptionContract, Position};

/// Progress of a single option through the valuation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValuationStage {
    /// A positive market price was found
    PricedLive,
    /// Implied volatility was solved (or deliberately skipped for the mode)
    IvSolved,
    /// The lattice produced a theoretical price
    TheoreticallyValued,
    /// Market and theoretical prices were compared
    Compared,
}

/// Terminal state of an option valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValuationOutcome {
    Compared,
    /// Stopped early; `reached` is the last stage that completed
    Incomplete {
        reached: Option<ValuationStage>,
        reason: String,
    },
    /// Contract type the model cannot price (puts)
    Unsupported { reason: String },
}

impl ValuationOutcome {
    pub fn is_compared(&self) -> bool {
        matches!(self, ValuationOutcome::Compared)
    }
}

/// Where the volatility fed into the lattice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityOrigin {
    Implied,
    Historical,
    Manual,
    Fallback,
}

/// How the market premium sits against the model price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceVerdict {
    /// Market above model by more than the band
    Overvalued,
    /// Market below model by more than the band
    Undervalued,
    /// Within the band either side
    Fair,
}

impl PriceVerdict {
    /// Classify a mispricing percentage against a symmetric band in percent
    pub fn classify(mispricing_pct: f64, band_pct: f64) -> Self {
        if mispricing_pct > band_pct {
            PriceVerdict::Overvalued
        } else if mispricing_pct < -band_pct {
            PriceVerdict::Undervalued
        } else {
            PriceVerdict::Fair
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceVerdict::Overvalued => "overvalued",
            PriceVerdict::Undervalued => "undervalued",
            PriceVerdict::Fair => "close to theoretical",
        }
    }
}

/// Implied volatility relative to realized volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityComparison {
    /// IV above HV x (1 + band)
    AboveRealized,
    /// IV below HV x (1 - band)
    BelowRealized,
    InLine,
}

impl VolatilityComparison {
    /// `band` is relative, 0.10 meaning 10% of the historical volatility
    pub fn classify(implied: f64, historical: f64, band: f64) -> Self {
        if implied > historical * (1.0 + band) {
            VolatilityComparison::AboveRealized
        } else if implied < historical * (1.0 - band) {
            VolatilityComparison::BelowRealized
        } else {
            VolatilityComparison::InLine
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityComparison::AboveRealized => "above realized volatility",
            VolatilityComparison::BelowRealized => "below realized volatility",
            VolatilityComparison::InLine => "in line with realized volatility",
        }
    }
}

/// Per-option valuation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionValuation {
    pub contract: OptionContract,
    /// Observed premium per share
    pub market_price: Option<f64>,
    /// Lattice premium per share
    pub theoretical_price: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub historical_volatility: Option<f64>,
    /// Volatility actually fed into the lattice
    pub volatility_used: Option<f64>,
    pub volatility_origin: Option<VolatilityOrigin>,
    /// Years to expiry
    pub time_to_expiry: f64,
    pub days_to_expiry: i64,
    /// market - theoretical
    pub mispricing: Option<f64>,
    /// mispricing / theoretical * 100
    pub mispricing_pct: Option<f64>,
    /// Set when `mispricing_pct` is known
    pub verdict: Option<PriceVerdict>,
    /// Set when both implied and historical volatility are known
    pub iv_vs_hv: Option<VolatilityComparison>,
    pub outcome: ValuationOutcome,
}

/// One portfolio line: market value and P&L, plus option detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionValuation {
    pub position: Position,
    pub spot: Option<f64>,
    /// Price per unit (spot for equity, premium per share for options)
    pub unit_price: Option<f64>,
    pub market_value: Option<f64>,
    pub pnl: Option<f64>,
    pub days_to_expiry: Option<i64>,
    pub option: Option<OptionValuation>,
    /// Why the line could not be valued, if it could not
    pub note: Option<String>,
}

impl PositionValuation {
    /// Line with nothing but a diagnostic
    pub fn skipped(position: Position, note: impl Into<String>) -> Self {
        Self {
            position,
            spot: None,
            unit_price: None,
            market_value: None,
            pnl: None,
            days_to_expiry: None,
            option: None,
            note: Some(note.into()),
        }
    }
}

/// Portfolio-level totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_pnl: f64,
    pub options_value: f64,
    pub equity_value: f64,
    /// Options share of total value in percent
    pub options_exposure_pct: f64,
    /// Stock and ETF share of total value in percent
    pub equity_exposure_pct: f64,
    pub average_days_to_expiry: Option<f64>,
    pub positions_valued: usize,
    pub positions_skipped: usize,
}

/// Output of a valuation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub as_of: NaiveDate,
    pub risk_free_rate: f64,
    pub positions: Vec<PositionValuation>,
    pub summary: PortfolioSummary,
}

impl PortfolioReport {
    /// Option valuations in position order
    pub fn option_valuations(&self) -> impl Iterator<Item = &OptionValuation> {
        self.positions.iter().filter_map(|p| p.option.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_verdict_band_edges() {
        assert_eq!(PriceVerdict::classify(5.0, 5.0), PriceVerdict::Fair);
        assert_eq!(PriceVerdict::classify(-5.0, 5.0), PriceVerdict::Fair);
        assert_eq!(PriceVerdict::classify(5.01, 5.0), PriceVerdict::Overvalued);
        assert_eq!(PriceVerdict::classify(-5.01, 5.0), PriceVerdict::Undervalued);
        assert_eq!(PriceVerdict::classify(0.0, 0.0), PriceVerdict::Fair);
        assert_eq!(PriceVerdict::classify(0.1, 0.0), PriceVerdict::Overvalued);
    }

    #[test]
    fn test_volatility_comparison_band_edges() {
        let hv = 0.30;
        let band = 0.10;

        assert_eq!(
            VolatilityComparison::classify(hv * (1.0 + band), hv, band),
            VolatilityComparison::InLine
        );
        assert_eq!(
            VolatilityComparison::classify(hv * (1.0 - band), hv, band),
            VolatilityComparison::InLine
        );
        assert_eq!(
            VolatilityComparison::classify(0.34, hv, band),
            VolatilityComparison::AboveRealized
        );
        assert_eq!(
            VolatilityComparison::classify(0.26, hv, band),
            VolatilityComparison::BelowRealized
        );
        assert_eq!(
            VolatilityComparison::classify(hv, hv, band),
            VolatilityComparison::InLine
        );
    }
}
