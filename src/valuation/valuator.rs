//! PortfolioValuator - runs one valuation pass over a set of positions
//!
//! Each option moves through `PricedLive -> IvSolved -> TheoreticallyValued
//! -> Compared` and drops to `Incomplete` at the first stage whose inputs are
//! missing. A gap in one position never stops the others.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::config::{ValuationConfig, VolatilitySource};
use super::summary::summarize;
use crate::core::{
    FairValueError, FairValueResult, MarketSnapshot, OptionContract, OptionType,
    OptionValuation, PortfolioReport, Position, PositionValuation, PriceVerdict,
    ValuationOutcome, ValuationStage, VolatilityComparison, VolatilityOrigin,
};
use crate::data::{
    HistoricalVolatilityProvider, Lookup, MarketDataProvider, RiskFreeRateProvider,
};
use crate::models::implied_volatility;

/// External data sources for one run
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub market: &'a dyn MarketDataProvider,
    pub rates: &'a dyn RiskFreeRateProvider,
    pub history: Option<&'a dyn HistoricalVolatilityProvider>,
}

impl<'a> Collaborators<'a> {
    /// Use a single source that implements every provider
    pub fn from_source<S>(source: &'a S) -> Self
    where
        S: MarketDataProvider + RiskFreeRateProvider + HistoricalVolatilityProvider,
    {
        Self {
            market: source,
            rates: source,
            history: Some(source),
        }
    }
}

/// Volatility estimates available for one option
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolatilityEstimates {
    pub implied: Option<f64>,
    pub historical: Option<f64>,
}

/// Lattice output together with the volatility that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TheoreticalPrice {
    pub price: f64,
    pub volatility: f64,
    pub origin: VolatilityOrigin,
}

/// Main valuation entry point
pub struct PortfolioValuator {
    config: ValuationConfig,
}

impl PortfolioValuator {
    /// Create a valuator with default configuration
    pub fn new() -> Self {
        Self {
            config: ValuationConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Get current configuration
    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Value every position as of `as_of`
    pub fn run(
        &self,
        positions: &[Position],
        sources: Collaborators<'_>,
        as_of: NaiveDate,
    ) -> PortfolioReport {
        tracing::info!("Valuing {} positions as of {}", positions.len(), as_of);

        let rate = self.resolve_rate(sources.rates);
        let snapshots = self.capture_snapshots(positions, sources.market, rate);

        let lines: Vec<PositionValuation> = positions
            .iter()
            .map(|position| {
                self.value_position(position, snapshots.get(&position.ticker), sources, as_of)
            })
            .collect();

        let summary = summarize(&lines);
        tracing::info!(
            total_value = summary.total_value,
            total_pnl = summary.total_pnl,
            skipped = summary.positions_skipped,
            "Valuation complete"
        );

        PortfolioReport {
            as_of,
            risk_free_rate: rate,
            positions: lines,
            summary,
        }
    }

    fn resolve_rate(&self, rates: &dyn RiskFreeRateProvider) -> f64 {
        match rates.risk_free_rate() {
            Ok(Lookup::Found(rate)) if rate.is_finite() => rate,
            Ok(_) => {
                tracing::warn!(
                    "No risk-free rate available; using fallback {:.4}",
                    self.config.fallback_risk_free_rate
                );
                self.config.fallback_risk_free_rate
            }
            Err(e) => {
                tracing::warn!(
                    "Risk-free rate lookup failed ({}); using fallback {:.4}",
                    e,
                    self.config.fallback_risk_free_rate
                );
                self.config.fallback_risk_free_rate
            }
        }
    }

    /// One snapshot per distinct underlying
    fn capture_snapshots(
        &self,
        positions: &[Position],
        market: &dyn MarketDataProvider,
        rate: f64,
    ) -> BTreeMap<String, MarketSnapshot> {
        let mut snapshots = BTreeMap::new();

        for position in positions {
            if snapshots.contains_key(&position.ticker) {
                continue;
            }
            match market.underlying(&position.ticker) {
                Ok(Lookup::Found(quote)) => {
                    let snapshot = MarketSnapshot::from_quote(&quote, rate);
                    if snapshot.is_priceable() {
                        snapshots.insert(position.ticker.clone(), snapshot);
                    } else {
                        tracing::warn!("Non-positive spot {} for {}", quote.spot, position.ticker);
                    }
                }
                Ok(Lookup::NotFound) => {
                    tracing::warn!("No market data for {}", position.ticker);
                }
                Err(e) => {
                    tracing::warn!("Market data lookup failed for {}: {}", position.ticker, e);
                }
            }
        }

        snapshots
    }

    fn value_position(
        &self,
        position: &Position,
        snapshot: Option<&MarketSnapshot>,
        sources: Collaborators<'_>,
        as_of: NaiveDate,
    ) -> PositionValuation {
        if let Err(e) = position.validate() {
            tracing::warn!("Skipping invalid position: {}", e);
            return PositionValuation::skipped(position.clone(), e.to_string());
        }

        let Some(snapshot) = snapshot else {
            tracing::warn!("Live price not found for {}; skipping position", position.ticker);
            return PositionValuation::skipped(
                position.clone(),
                format!("no spot price for {}", position.ticker),
            );
        };

        match position.contract(self.config.contract_multiplier) {
            Some(contract) => self.value_option_position(position, contract, snapshot, sources, as_of),
            None => self.value_equity_position(position, snapshot),
        }
    }

    fn value_equity_position(
        &self,
        position: &Position,
        snapshot: &MarketSnapshot,
    ) -> PositionValuation {
        let quantity = position.quantity as f64;
        let spot = snapshot.spot;

        PositionValuation {
            position: position.clone(),
            spot: Some(spot),
            unit_price: Some(spot),
            market_value: Some(spot * quantity),
            pnl: position.cost_basis.map(|cost| (spot - cost) * quantity),
            days_to_expiry: None,
            option: None,
            note: None,
        }
    }

    fn value_option_position(
        &self,
        position: &Position,
        contract: OptionContract,
        snapshot: &MarketSnapshot,
        sources: Collaborators<'_>,
        as_of: NaiveDate,
    ) -> PositionValuation {
        let valuation = self.value_option(contract, snapshot, sources, as_of);

        let units = position.quantity as f64 * valuation.contract.multiplier;
        let premium = valuation.market_price;
        let note = match &valuation.outcome {
            ValuationOutcome::Compared => None,
            ValuationOutcome::Incomplete { reason, .. } | ValuationOutcome::Unsupported { reason } => {
                Some(reason.clone())
            }
        };

        PositionValuation {
            position: position.clone(),
            spot: Some(snapshot.spot),
            unit_price: premium,
            market_value: premium.map(|p| p * units),
            pnl: premium.zip(position.cost_basis).map(|(p, cost)| (p - cost) * units),
            days_to_expiry: Some(valuation.days_to_expiry),
            option: Some(valuation),
            note,
        }
    }

    /// Run the option state machine for one contract
    pub fn value_option(
        &self,
        contract: OptionContract,
        snapshot: &MarketSnapshot,
        sources: Collaborators<'_>,
        as_of: NaiveDate,
    ) -> OptionValuation {
        let time = contract.time_to_expiry(as_of, self.config.days_per_year);
        let days = contract.days_to_expiry(as_of);
        let label = contract.label();
        let mut pending = PendingValuation::new(contract, time, days, &self.config);

        // PricedLive
        let market_price = match sources.market.option_quote(&pending.contract) {
            Ok(Lookup::Found(quote)) => quote.mid_price(),
            Ok(Lookup::NotFound) => None,
            Err(e) => {
                tracing::warn!("Option quote lookup failed for {}: {}", label, e);
                None
            }
        };
        let Some(market_price) = market_price else {
            tracing::warn!("No valid market price for {}", label);
            return pending.incomplete(None, "no market price");
        };
        pending.market_price = Some(market_price);
        tracing::debug!("{}: market price {:.4}", label, market_price);

        if pending.contract.option_type == OptionType::Put {
            return pending.finish(ValuationOutcome::Unsupported {
                reason: "put valuation is not supported".to_string(),
            });
        }

        if time <= 0.0 {
            return pending.incomplete(Some(ValuationStage::PricedLive), "option expired");
        }

        // IvSolved
        let iv = implied_volatility(
            market_price,
            snapshot.spot,
            pending.contract.strike,
            time,
            snapshot.risk_free_rate,
            snapshot.dividend_yield,
            &self.config.solver,
        );
        let iv_failure = match iv {
            Ok(vol) => {
                tracing::info!("Implied volatility for {}: {:.4}", label, vol);
                pending.implied_volatility = Some(vol);
                None
            }
            Err(e) => {
                tracing::warn!("Implied volatility failed for {}: {}", label, e);
                Some(e.to_string())
            }
        };

        // Reported in every mode; only Historical prices off it
        if sources.history.is_some()
            || self.config.volatility_source == VolatilitySource::Historical
        {
            pending.historical_volatility =
                self.lookup_historical(sources, &pending.contract.underlying);
        }

        let reached = if iv_failure.is_none()
            || self.config.volatility_source != VolatilitySource::Implied
            || self.config.fallback_volatility.is_some()
        {
            ValuationStage::IvSolved
        } else {
            ValuationStage::PricedLive
        };

        // TheoreticallyValued
        let estimates = VolatilityEstimates {
            implied: pending.implied_volatility,
            historical: pending.historical_volatility,
        };
        let theoretical = match self.theoretical_price(
            snapshot,
            &pending.contract,
            time,
            self.config.volatility_source,
            estimates,
        ) {
            Ok(theoretical) => theoretical,
            Err(e) => {
                let reason = match (self.config.volatility_source, iv_failure) {
                    (VolatilitySource::Implied, Some(iv_reason)) => iv_reason,
                    _ => e.to_string(),
                };
                return pending.incomplete(Some(reached), reason);
            }
        };

        if theoretical.origin == VolatilityOrigin::Fallback {
            tracing::warn!(
                "Using fallback volatility {:.4} for {}",
                theoretical.volatility,
                label
            );
        }
        pending.theoretical_price = Some(theoretical.price);
        pending.volatility_used = Some(theoretical.volatility);
        pending.volatility_origin = Some(theoretical.origin);

        // Compared
        pending.finish(ValuationOutcome::Compared)
    }

    /// Lattice price under the chosen volatility source
    ///
    /// `Implied` falls back to `fallback_volatility` when no implied
    /// volatility is available; `Historical` and `Manual` never fall back.
    pub fn theoretical_price(
        &self,
        snapshot: &MarketSnapshot,
        contract: &OptionContract,
        time: f64,
        source: VolatilitySource,
        estimates: VolatilityEstimates,
    ) -> FairValueResult<TheoreticalPrice> {
        let (volatility, origin) = match source {
            VolatilitySource::Implied => match (estimates.implied, self.config.fallback_volatility) {
                (Some(vol), _) => (vol, VolatilityOrigin::Implied),
                (None, Some(vol)) => (vol, VolatilityOrigin::Fallback),
                (None, None) => return Err(FairValueError::data("no implied volatility")),
            },
            VolatilitySource::Historical => match estimates.historical {
                Some(vol) => (vol, VolatilityOrigin::Historical),
                None => return Err(FairValueError::data("no historical volatility")),
            },
            VolatilitySource::Manual(vol) => (vol, VolatilityOrigin::Manual),
        };

        let price = self.config.lattice.american_call(
            snapshot.spot,
            contract.strike,
            time,
            snapshot.risk_free_rate,
            volatility,
            snapshot.dividend_yield,
        )?;

        Ok(TheoreticalPrice {
            price,
            volatility,
            origin,
        })
    }

    fn lookup_historical(&self, sources: Collaborators<'_>, ticker: &str) -> Option<f64> {
        let Some(history) = sources.history else {
            tracing::warn!("No historical volatility provider configured");
            return None;
        };
        match history.historical_volatility(ticker) {
            Ok(Lookup::Found(vol)) if vol.is_finite() && vol > 0.0 => Some(vol),
            Ok(_) if self.config.volatility_source == VolatilitySource::Historical => {
                tracing::warn!("No historical volatility for {}", ticker);
                None
            }
            Ok(_) => {
                tracing::debug!("No historical volatility for {}", ticker);
                None
            }
            Err(e) => {
                tracing::warn!("Historical volatility lookup failed for {}: {}", ticker, e);
                None
            }
        }
    }
}

impl Default for PortfolioValuator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields collected while an option moves through the stages
struct PendingValuation {
    contract: OptionContract,
    time_to_expiry: f64,
    days_to_expiry: i64,
    market_price: Option<f64>,
    implied_volatility: Option<f64>,
    historical_volatility: Option<f64>,
    theoretical_price: Option<f64>,
    volatility_used: Option<f64>,
    volatility_origin: Option<VolatilityOrigin>,
    fair_band_pct: f64,
    iv_hv_band: f64,
}

impl PendingValuation {
    fn new(
        contract: OptionContract,
        time_to_expiry: f64,
        days_to_expiry: i64,
        config: &ValuationConfig,
    ) -> Self {
        Self {
            contract,
            time_to_expiry,
            days_to_expiry,
            fair_band_pct: config.fair_band_pct,
            iv_hv_band: config.iv_hv_band,
            market_price: None,
            implied_volatility: None,
            historical_volatility: None,
            theoretical_price: None,
            volatility_used: None,
            volatility_origin: None,
        }
    }

    fn incomplete(self, reached: Option<ValuationStage>, reason: impl Into<String>) -> OptionValuation {
        self.finish(ValuationOutcome::Incomplete {
            reached,
            reason: reason.into(),
        })
    }

    fn finish(self, outcome: ValuationOutcome) -> OptionValuation {
        let (mispricing, mispricing_pct) = match (&outcome, self.market_price, self.theoretical_price) {
            (ValuationOutcome::Compared, Some(market), Some(theoretical)) => {
                let diff = market - theoretical;
                let pct = (theoretical != 0.0).then(|| diff / theoretical * 100.0);
                (Some(diff), pct)
            }
            _ => (None, None),
        };
        let verdict = mispricing_pct.map(|pct| PriceVerdict::classify(pct, self.fair_band_pct));
        let iv_vs_hv = self
            .implied_volatility
            .zip(self.historical_volatility)
            .map(|(iv, hv)| VolatilityComparison::classify(iv, hv, self.iv_hv_band));

        OptionValuation {
            contract: self.contract,
            market_price: self.market_price,
            theoretical_price: self.theoretical_price,
            implied_volatility: self.implied_volatility,
            historical_volatility: self.historical_volatility,
            volatility_used: self.volatility_used,
            volatility_origin: self.volatility_origin,
            time_to_expiry: self.time_to_expiry,
            days_to_expiry: self.days_to_expiry,
            mispricing,
            mispricing_pct,
            verdict,
            iv_vs_hv,
            outcome,
        }
    }
}
