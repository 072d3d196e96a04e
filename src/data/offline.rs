//! Offline market data
//!
//! An in-memory provider backed by a JSON market file. Used for replaying a
//! captured market, for runs without network access, and in tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::provider::{
    HistoricalVolatilityProvider, Lookup, MarketDataProvider, RiskFreeRateProvider,
};
use crate::core::{
    FairValueResult, OptionContract, OptionQuote, OptionType, UnderlyingQuote,
};

/// Strike match tolerance when looking up a contract
const STRIKE_TOLERANCE: f64 = 0.01;

/// On-disk layout of a market file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketFile {
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub underlyings: Vec<UnderlyingEntry>,
    #[serde(default)]
    pub options: Vec<OptionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingEntry {
    pub symbol: String,
    pub spot: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub historical_volatility: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionEntry {
    pub underlying: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub last: Option<f64>,
}

/// In-memory market data provider
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    timestamp: DateTime<Utc>,
    risk_free_rate: Option<f64>,
    underlyings: HashMap<String, UnderlyingEntry>,
    options: Vec<OptionEntry>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    pub fn from_market_file(file: MarketFile) -> Self {
        let mut data = Self::new();
        if let Some(ts) = file.as_of {
            data.timestamp = ts;
        }
        data.risk_free_rate = file.risk_free_rate;
        for entry in file.underlyings {
            data.underlyings.insert(entry.symbol.clone(), entry);
        }
        data.options = file.options;
        data
    }

    pub fn from_json(json: &str) -> FairValueResult<Self> {
        let file: MarketFile = serde_json::from_str(json)?;
        Ok(Self::from_market_file(file))
    }

    /// Load a market file from disk
    pub fn load(path: impl AsRef<Path>) -> FairValueResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let data = Self::from_json(&json)?;

        tracing::info!(
            "Loaded {} underlyings and {} option quotes from {:?}",
            data.underlyings.len(),
            data.options.len(),
            path
        );
        Ok(data)
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    pub fn with_underlying(mut self, symbol: &str, spot: f64, dividend_yield: f64) -> Self {
        self.underlyings.insert(
            symbol.to_string(),
            UnderlyingEntry {
                symbol: symbol.to_string(),
                spot,
                dividend_yield,
                historical_volatility: None,
            },
        );
        self
    }

    /// Attach a historical volatility to an underlying already added
    pub fn with_historical_vol(mut self, symbol: &str, vol: f64) -> Self {
        if let Some(entry) = self.underlyings.get_mut(symbol) {
            entry.historical_volatility = Some(vol);
        }
        self
    }

    pub fn with_option_quote(
        mut self,
        contract: &OptionContract,
        bid: Option<f64>,
        ask: Option<f64>,
        last: Option<f64>,
    ) -> Self {
        self.options.push(OptionEntry {
            underlying: contract.underlying.clone(),
            strike: contract.strike,
            expiry: contract.expiry,
            option_type: contract.option_type,
            bid,
            ask,
            last,
        });
        self
    }

    fn find_option(&self, contract: &OptionContract) -> Option<&OptionEntry> {
        self.options.iter().find(|o| {
            o.underlying == contract.underlying
                && o.option_type == contract.option_type
                && o.expiry == contract.expiry
                && (o.strike - contract.strike).abs() < STRIKE_TOLERANCE
        })
    }
}

impl MarketDataProvider for StaticMarketData {
    fn underlying(&self, ticker: &str) -> FairValueResult<Lookup<UnderlyingQuote>> {
        Ok(self
            .underlyings
            .get(ticker)
            .map(|entry| UnderlyingQuote {
                symbol: entry.symbol.clone(),
                spot: entry.spot,
                dividend_yield: entry.dividend_yield,
                timestamp: self.timestamp,
            })
            .into())
    }

    fn option_quote(&self, contract: &OptionContract) -> FairValueResult<Lookup<OptionQuote>> {
        Ok(self
            .find_option(contract)
            .map(|entry| {
                let mut quote =
                    OptionQuote::with_prices(contract.clone(), entry.bid, entry.ask, entry.last);
                quote.timestamp = self.timestamp;
                quote
            })
            .into())
    }
}

impl RiskFreeRateProvider for StaticMarketData {
    fn risk_free_rate(&self) -> FairValueResult<Lookup<f64>> {
        Ok(self.risk_free_rate.into())
    }
}

impl HistoricalVolatilityProvider for StaticMarketData {
    fn historical_volatility(&self, ticker: &str) -> FairValueResult<Lookup<f64>> {
        Ok(self
            .underlyings
            .get(ticker)
            .and_then(|entry| entry.historical_volatility)
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MARKET_JSON: &str = r#"{
        "risk_free_rate": 0.0441,
        "underlyings": [
            {"symbol": "LDOS", "spot": 149.16, "dividend_yield": 0.0105, "historical_volatility": 0.28},
            {"symbol": "DFEN", "spot": 45.6}
        ],
        "options": [
            {"underlying": "LDOS", "strike": 180.0, "expiry": "2025-12-19", "type": "call", "bid": 4.0, "ask": 4.6}
        ]
    }"#;

    fn ldos_call(strike: f64) -> OptionContract {
        OptionContract::american(
            "LDOS",
            strike,
            NaiveDate::from_ymd_opt(2025, 12, 19).unwrap(),
            OptionType::Call,
        )
    }

    #[test]
    fn test_load_market_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MARKET_JSON.as_bytes()).unwrap();

        let data = StaticMarketData::load(file.path()).unwrap();

        assert_eq!(data.risk_free_rate().unwrap(), Lookup::Found(0.0441));
        let ldos = data.underlying("LDOS").unwrap().found().unwrap();
        assert_eq!(ldos.spot, 149.16);
        assert_eq!(ldos.dividend_yield, 0.0105);

        let dfen = data.underlying("DFEN").unwrap().found().unwrap();
        assert_eq!(dfen.dividend_yield, 0.0);

        assert_eq!(data.historical_volatility("LDOS").unwrap(), Lookup::Found(0.28));
        assert_eq!(data.historical_volatility("DFEN").unwrap(), Lookup::NotFound);
    }

    #[test]
    fn test_option_lookup() {
        let data = StaticMarketData::from_json(MARKET_JSON).unwrap();

        let quote = data.option_quote(&ldos_call(180.0)).unwrap().found().unwrap();
        assert!((quote.mid_price().unwrap() - 4.3).abs() < 1e-12);

        assert!(!data.option_quote(&ldos_call(185.0)).unwrap().is_found());

        let mut put = ldos_call(180.0);
        put.option_type = OptionType::Put;
        assert!(!data.option_quote(&put).unwrap().is_found());
    }

    #[test]
    fn test_missing_file() {
        let result = StaticMarketData::load("/nonexistent/market.json");
        assert!(matches!(result, Err(crate::core::FairValueError::IO(_))));
    }
}
