//! Yahoo Finance data fetcher
//!
//! Live spot prices, dividend yields, single option quotes, the 10-year
//! Treasury yield (as the risk-free rate) and one year of daily closes for
//! historical volatility. Uses Yahoo Finance's unofficial API.
//!
//! Note: Yahoo Finance data is delayed ~15 minutes and intended for
//! personal use.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::provider::{
    HistoricalVolatilityProvider, Lookup, MarketDataProvider, RiskFreeRateProvider,
};
use crate::core::{
    FairValueError, FairValueResult, OptionContract, OptionQuote, OptionType, UnderlyingQuote,
};
use crate::models::annualized_volatility;

/// 10-year US Treasury yield index, quoted in percent
pub const TREASURY_10Y_SYMBOL: &str = "^TNX";

/// Yields above this are assumed to be quoted in percent
const DIVIDEND_PERCENT_THRESHOLD: f64 = 0.1;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance API client
pub struct YahooClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> FairValueResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against a different host (mirrors, test servers)
    pub fn with_base_url(base_url: impl Into<String>) -> FairValueResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| FairValueError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> FairValueResult<T> {
        tracing::debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| FairValueError::network(e.to_string()))?
            .json()
            .map_err(|e| FairValueError::data(format!("Failed to parse response: {}", e)))
    }

    fn quote_data(&self, symbol: &str) -> FairValueResult<Option<YahooQuoteData>> {
        let url = format!(
            "{}/v7/finance/quote?symbols={}",
            self.base_url,
            encode_symbol(symbol)
        );
        let response: YahooQuoteResponse = self.get_json(&url)?;
        Ok(response.quote_response.result.into_iter().next())
    }

    /// Spot price and dividend yield for a symbol
    pub fn get_quote(&self, symbol: &str) -> FairValueResult<Option<UnderlyingQuote>> {
        let Some(data) = self.quote_data(symbol)? else {
            return Ok(None);
        };

        let spot = match data.regular_market_price.or(data.current_price) {
            Some(price) if price.is_finite() && price > 0.0 => price,
            _ => {
                tracing::warn!("No valid positive spot price for {}", symbol);
                return Ok(None);
            }
        };

        let dividend_yield = normalize_dividend_yield(
            data.dividend_yield
                .or(data.trailing_annual_dividend_yield),
        );

        tracing::info!(
            "{}: spot={:.2}, dividend yield={:.4}",
            symbol,
            spot,
            dividend_yield
        );

        Ok(Some(UnderlyingQuote {
            symbol: symbol.to_string(),
            spot,
            dividend_yield,
            timestamp: Utc::now(),
        }))
    }

    /// Latest 10-year Treasury yield as a decimal
    pub fn get_treasury_yield(&self) -> FairValueResult<Option<f64>> {
        let yield_pct = self
            .quote_data(TREASURY_10Y_SYMBOL)?
            .and_then(|d| d.regular_market_price)
            .filter(|y| y.is_finite());

        if let Some(y) = yield_pct {
            tracing::info!("US 10Y yield: {:.4}%", y);
        }
        Ok(yield_pct.map(|y| y / 100.0))
    }

    /// Available option expiration dates
    pub fn get_expirations(&self, symbol: &str) -> FairValueResult<Vec<NaiveDate>> {
        let url = format!("{}/v7/finance/options/{}", self.base_url, encode_symbol(symbol));
        let response: YahooOptionsResponse = self.get_json(&url)?;

        let chain = response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| FairValueError::data("No options data returned"))?;

        Ok(chain
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect())
    }

    /// Quote for a single contract, `None` when the expiry or strike is not listed
    pub fn get_option_quote(&self, contract: &OptionContract) -> FairValueResult<Option<OptionQuote>> {
        let expiries = self.get_expirations(&contract.underlying)?;
        if !expiries.contains(&contract.expiry) {
            tracing::warn!(
                "Expiry {} not listed for {}",
                contract.expiry,
                contract.underlying
            );
            return Ok(None);
        }

        let expiry_ts = contract
            .expiry
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| FairValueError::invalid_input("Invalid expiry date"))?;

        let url = format!(
            "{}/v7/finance/options/{}?date={}",
            self.base_url,
            encode_symbol(&contract.underlying),
            expiry_ts
        );
        let response: YahooOptionsResponse = self.get_json(&url)?;

        let Some(chain) = response.option_chain.result.into_iter().next() else {
            return Ok(None);
        };
        let Some(options) = chain.options.into_iter().next() else {
            return Ok(None);
        };

        let side = match contract.option_type {
            OptionType::Call => options.calls,
            OptionType::Put => options.puts,
        };

        let Some(data) = side
            .into_iter()
            .find(|o| o.strike.is_some_and(|k| (k - contract.strike).abs() < 0.01))
        else {
            tracing::warn!("{} not found in Yahoo chain", contract.label());
            return Ok(None);
        };

        let mut quote = OptionQuote::with_prices(
            contract.clone(),
            data.bid,
            data.ask,
            data.last_price,
        );
        quote.volume = data.volume.and_then(|v| u64::try_from(v).ok());
        quote.open_interest = data.open_interest.and_then(|oi| u64::try_from(oi).ok());

        tracing::info!(
            "Found {}: bid={:?}, ask={:?}, last={:?}",
            contract.label(),
            quote.bid,
            quote.ask,
            quote.last
        );
        Ok(Some(quote))
    }

    /// Daily closes over the last year
    pub fn get_daily_closes(&self, symbol: &str) -> FairValueResult<Vec<f64>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1y&interval=1d",
            self.base_url,
            encode_symbol(symbol)
        );
        let response: YahooChartResponse = self.get_json(&url)?;

        let closes = response
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|r| r.indicators.quote.into_iter().next())
            .map(|q| q.close.into_iter().flatten().collect())
            .unwrap_or_default();

        Ok(closes)
    }
}

impl MarketDataProvider for YahooClient {
    fn underlying(&self, ticker: &str) -> FairValueResult<Lookup<UnderlyingQuote>> {
        Ok(self.get_quote(ticker)?.into())
    }

    fn option_quote(&self, contract: &OptionContract) -> FairValueResult<Lookup<OptionQuote>> {
        Ok(self.get_option_quote(contract)?.into())
    }
}

impl RiskFreeRateProvider for YahooClient {
    fn risk_free_rate(&self) -> FairValueResult<Lookup<f64>> {
        Ok(self.get_treasury_yield()?.into())
    }
}

impl HistoricalVolatilityProvider for YahooClient {
    fn historical_volatility(&self, ticker: &str) -> FairValueResult<Lookup<f64>> {
        let closes = self.get_daily_closes(ticker)?;
        Ok(annualized_volatility(&closes).into())
    }
}

/// Yahoo mixes decimal and percent dividend yields; values above 10% are
/// taken to be percent. Missing or negative yields become zero.
pub fn normalize_dividend_yield(raw: Option<f64>) -> f64 {
    match raw {
        Some(y) if y.is_finite() && y > DIVIDEND_PERCENT_THRESHOLD => y / 100.0,
        Some(y) if y.is_finite() && y > 0.0 => y,
        _ => 0.0,
    }
}

fn encode_symbol(symbol: &str) -> String {
    symbol.replace('^', "%5E")
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    result: Vec<YahooQuoteData>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteData {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "currentPrice")]
    current_price: Option<f64>,
    #[serde(rename = "dividendYield")]
    dividend_yield: Option<f64>,
    #[serde(rename = "trailingAnnualDividendYield")]
    trailing_annual_dividend_yield: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    result: Vec<YahooOptionChainData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    #[serde(default)]
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    #[serde(default)]
    calls: Vec<YahooOptionData>,
    #[serde(default)]
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionData {
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    volume: Option<i64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dividend_yield() {
        assert_eq!(normalize_dividend_yield(Some(0.0201)), 0.0201);
        assert!((normalize_dividend_yield(Some(1.05)) - 0.0105).abs() < 1e-12);
        assert_eq!(normalize_dividend_yield(None), 0.0);
        assert_eq!(normalize_dividend_yield(Some(f64::NAN)), 0.0);
        assert_eq!(normalize_dividend_yield(Some(-0.01)), 0.0);
    }

    #[test]
    fn test_encode_symbol() {
        assert_eq!(encode_symbol("^TNX"), "%5ETNX");
        assert_eq!(encode_symbol("LDOS"), "LDOS");
    }

    #[test]
    fn test_parse_chart_closes() {
        let json = r#"{"chart": {"result": [{"indicators": {"quote": [{"close": [100.0, null, 101.5, 99.8]}]}}]}}"#;
        let response: YahooChartResponse = serde_json::from_str(json).unwrap();
        let closes: Vec<f64> = response.chart.result.unwrap()[0].indicators.quote[0]
            .close
            .iter()
            .flatten()
            .copied()
            .collect();
        assert_eq!(closes, vec![100.0, 101.5, 99.8]);
    }

    #[test]
    fn test_parse_option_chain() {
        let json = r#"{"optionChain": {"result": [{
            "expirationDates": [1766102400],
            "options": [{"calls": [{"strike": 180.0, "bid": 4.0, "ask": 4.6, "lastPrice": 4.2, "volume": 12, "openInterest": 340}], "puts": []}]
        }]}}"#;
        let response: YahooOptionsResponse = serde_json::from_str(json).unwrap();
        let chain = &response.option_chain.result[0];

        assert_eq!(chain.expiration_dates, vec![1766102400]);
        assert_eq!(chain.options[0].calls[0].last_price, Some(4.2));
        assert!(chain.options[0].puts.is_empty());
    }

    #[test]
    #[ignore] // Requires network
    fn test_get_quote() {
        let client = YahooClient::new().unwrap();
        let quote = client.get_quote("SPY").unwrap().unwrap();

        assert!(quote.spot > 0.0);
        println!("SPY price: {}", quote.spot);
    }

    #[test]
    #[ignore] // Requires network
    fn test_get_treasury_yield() {
        let client = YahooClient::new().unwrap();
        let rate = client.get_treasury_yield().unwrap().unwrap();

        assert!(rate > 0.0 && rate < 0.2);
    }

    #[test]
    #[ignore] // Requires network
    fn test_historical_volatility() {
        let client = YahooClient::new().unwrap();
        let vol = client.historical_volatility("SPY").unwrap().found().unwrap();

        assert!(vol > 0.01 && vol < 2.0);
    }
}
