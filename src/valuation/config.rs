//! Configuration for portfolio valuation

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{FairValueError, FairValueResult, Position, DEFAULT_CONTRACT_MULTIPLIER};
use crate::models::{BinomialTree, IvSolverConfig};

/// Volatility used when implied volatility cannot be solved
pub const DEFAULT_FALLBACK_VOLATILITY: f64 = 0.55;

/// Which volatility feeds the lattice
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilitySource {
    /// Solved from the option's own market price
    #[default]
    Implied,
    /// Realized volatility of the underlying
    Historical,
    /// Fixed annualized volatility
    Manual(f64),
}

/// Valuation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub volatility_source: VolatilitySource,

    /// Volatility substituted when implied volatility cannot be solved.
    /// `None` leaves the option incomplete instead.
    /// Default: 0.55
    pub fallback_volatility: Option<f64>,

    /// Rate used when the rate provider has nothing
    /// Default: 0.045
    pub fallback_risk_free_rate: f64,

    /// Lattice step count
    /// Default: 500
    pub lattice: BinomialTree,

    /// Bisection bracket, tolerance and iteration cap
    pub solver: IvSolverConfig,

    /// Shares per option contract
    /// Default: 100
    pub contract_multiplier: f64,

    /// Day count for time to expiry
    /// Default: 365
    pub days_per_year: f64,

    /// Mispricing within +/- this percent of theoretical counts as fair
    /// Default: 5.0
    pub fair_band_pct: f64,

    /// Relative band for comparing implied with historical volatility
    /// Default: 0.10 (10% of HV)
    pub iv_hv_band: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            volatility_source: VolatilitySource::Implied,
            fallback_volatility: Some(DEFAULT_FALLBACK_VOLATILITY),
            fallback_risk_free_rate: 0.045,
            lattice: BinomialTree::default(),
            solver: IvSolverConfig::default(),
            contract_multiplier: DEFAULT_CONTRACT_MULTIPLIER,
            days_per_year: 365.0,
            fair_band_pct: 5.0,
            iv_hv_band: 0.10,
        }
    }
}

impl ValuationConfig {
    /// Price off realized volatility instead of implied
    pub fn historical() -> Self {
        Self {
            volatility_source: VolatilitySource::Historical,
            ..Default::default()
        }
    }

    /// Leave options incomplete instead of substituting a volatility
    /// when implied volatility cannot be solved
    pub fn strict() -> Self {
        Self {
            fallback_volatility: None,
            ..Default::default()
        }
    }

    /// Price every option at one fixed volatility
    pub fn with_manual_volatility(vol: f64) -> Self {
        Self {
            volatility_source: VolatilitySource::Manual(vol),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FairValueResult<()> {
        if self.lattice.steps == 0 {
            return Err(FairValueError::config("Lattice steps must be at least 1"));
        }
        if !(self.days_per_year > 0.0) {
            return Err(FairValueError::config("days_per_year must be positive"));
        }
        if !(self.contract_multiplier > 0.0) {
            return Err(FairValueError::config("contract_multiplier must be positive"));
        }
        if !(self.solver.low > 0.0 && self.solver.low < self.solver.high) {
            return Err(FairValueError::config(format!(
                "Invalid volatility bracket [{}, {}]",
                self.solver.low, self.solver.high
            )));
        }
        if self.solver.tolerance <= 0.0 || self.solver.max_iterations == 0 {
            return Err(FairValueError::config(
                "Solver needs a positive tolerance and at least one iteration",
            ));
        }
        if !(self.fair_band_pct.is_finite() && self.fair_band_pct >= 0.0) {
            return Err(FairValueError::config("fair_band_pct must be non-negative"));
        }
        if !(self.iv_hv_band.is_finite() && (0.0..1.0).contains(&self.iv_hv_band)) {
            return Err(FairValueError::config("iv_hv_band must be in [0, 1)"));
        }
        let fixed_vols = [
            self.fallback_volatility,
            match self.volatility_source {
                VolatilitySource::Manual(v) => Some(v),
                _ => None,
            },
        ];
        for vol in fixed_vols.into_iter().flatten() {
            if !(vol.is_finite() && vol > 0.0) {
                return Err(FairValueError::config(format!("Invalid volatility {}", vol)));
            }
        }
        Ok(())
    }
}

/// Portfolio definition file: positions plus optional valuation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioFile {
    pub positions: Vec<Position>,
    #[serde(default)]
    pub valuation: ValuationConfig,
}

impl PortfolioFile {
    pub fn load(path: impl AsRef<Path>) -> FairValueResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let file: PortfolioFile = serde_json::from_str(&json)?;
        file.valuation.validate()?;

        tracing::info!("Loaded {} positions from {:?}", file.positions.len(), path);
        Ok(file)
    }
}
