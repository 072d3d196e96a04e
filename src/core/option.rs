//! Option contracts and portfolio positions
//!
//! A `Position` pairs an underlying symbol with an `Instrument`. Strike and
//! expiry only exist on the option variants, so a stock can never carry one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{FairValueError, FairValueResult};

/// Shares controlled by one listed equity option contract
pub const DEFAULT_CONTRACT_MULTIPLIER: f64 = 100.0;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

/// Option contract specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Underlying symbol (e.g., "LDOS")
    pub underlying: String,
    /// Strike price
    pub strike: f64,
    /// Expiration date
    pub expiry: NaiveDate,
    /// Option type (Call/Put)
    pub option_type: OptionType,
    /// Contract multiplier (e.g., 100 for equity options)
    pub multiplier: f64,
}

impl OptionContract {
    /// Listed US equity option (American exercise) with a 100 share multiplier
    pub fn american(
        underlying: impl Into<String>,
        strike: f64,
        expiry: NaiveDate,
        option_type: OptionType,
    ) -> Self {
        Self {
            underlying: underlying.into(),
            strike,
            expiry,
            option_type,
            multiplier: DEFAULT_CONTRACT_MULTIPLIER,
        }
    }

    /// Calendar days from `from` to expiry (negative once expired)
    pub fn days_to_expiry(&self, from: NaiveDate) -> i64 {
        (self.expiry - from).num_days()
    }

    /// Time to expiry in years using an ACT/`days_per_year` day count
    pub fn time_to_expiry(&self, from: NaiveDate, days_per_year: f64) -> f64 {
        self.days_to_expiry(from) as f64 / days_per_year
    }

    /// Short human label, e.g. `LDOS 180 2025-12-19 call`
    pub fn label(&self) -> String {
        format!(
            "{} {} {} {}",
            self.underlying,
            self.strike,
            self.expiry,
            self.option_type.as_str()
        )
    }
}

/// What a position holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instrument {
    Stock,
    Etf,
    Call { strike: f64, expiry: NaiveDate },
    Put { strike: f64, expiry: NaiveDate },
}

impl Instrument {
    pub fn is_option(&self) -> bool {
        matches!(self, Instrument::Call { .. } | Instrument::Put { .. })
    }

    pub fn option_type(&self) -> Option<OptionType> {
        match self {
            Instrument::Call { .. } => Some(OptionType::Call),
            Instrument::Put { .. } => Some(OptionType::Put),
            Instrument::Stock | Instrument::Etf => None,
        }
    }

    pub fn strike(&self) -> Option<f64> {
        match self {
            Instrument::Call { strike, .. } | Instrument::Put { strike, .. } => Some(*strike),
            Instrument::Stock | Instrument::Etf => None,
        }
    }

    pub fn expiry(&self) -> Option<NaiveDate> {
        match self {
            Instrument::Call { expiry, .. } | Instrument::Put { expiry, .. } => Some(*expiry),
            Instrument::Stock | Instrument::Etf => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Instrument::Stock => "stock",
            Instrument::Etf => "etf",
            Instrument::Call { .. } => "call",
            Instrument::Put { .. } => "put",
        }
    }
}

/// A single portfolio holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Underlying ticker
    pub ticker: String,
    #[serde(flatten)]
    pub instrument: Instrument,
    /// Units held; negative for short positions. Options count contracts.
    pub quantity: i64,
    /// Purchase price per unit (per share for options), if known
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

impl Position {
    pub fn stock(ticker: impl Into<String>, quantity: i64, cost_basis: Option<f64>) -> Self {
        Self {
            ticker: ticker.into(),
            instrument: Instrument::Stock,
            quantity,
            cost_basis,
        }
    }

    pub fn etf(ticker: impl Into<String>, quantity: i64, cost_basis: Option<f64>) -> Self {
        Self {
            ticker: ticker.into(),
            instrument: Instrument::Etf,
            quantity,
            cost_basis,
        }
    }

    pub fn call(
        ticker: impl Into<String>,
        strike: f64,
        expiry: NaiveDate,
        quantity: i64,
        cost_basis: Option<f64>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            instrument: Instrument::Call { strike, expiry },
            quantity,
            cost_basis,
        }
    }

    pub fn put(
        ticker: impl Into<String>,
        strike: f64,
        expiry: NaiveDate,
        quantity: i64,
        cost_basis: Option<f64>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            instrument: Instrument::Put { strike, expiry },
            quantity,
            cost_basis,
        }
    }

    /// Option contract for option positions, `None` for stock and ETF
    pub fn contract(&self, multiplier: f64) -> Option<OptionContract> {
        match self.instrument {
            Instrument::Call { strike, expiry } | Instrument::Put { strike, expiry } => {
                let option_type = self.instrument.option_type()?;
                let mut contract = OptionContract::american(&self.ticker, strike, expiry, option_type);
                contract.multiplier = multiplier;
                Some(contract)
            }
            Instrument::Stock | Instrument::Etf => None,
        }
    }

    /// Reject positions the valuation cannot make sense of
    pub fn validate(&self) -> FairValueResult<()> {
        if self.ticker.trim().is_empty() {
            return Err(FairValueError::invalid_input("Empty ticker"));
        }
        if let Some(strike) = self.instrument.strike() {
            if !strike.is_finite() || strike <= 0.0 {
                return Err(FairValueError::invalid_input(format!(
                    "Non-positive strike {} for {}",
                    strike, self.ticker
                )));
            }
        }
        if let Some(cost) = self.cost_basis {
            if !cost.is_finite() || cost < 0.0 {
                return Err(FairValueError::invalid_input(format!(
                    "Invalid cost basis {} for {}",
                    cost, self.ticker
                )));
            }
        }
        Ok(())
    }
}
