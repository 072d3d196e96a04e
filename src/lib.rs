//! # Portfolio Fair Value
//!
//! Fair-value estimation for a small portfolio of listed equity options,
//! stocks and ETFs.
//!
//! ## Overview
//!
//! For every option position the valuation:
//! - takes the live mid (or last) premium
//! - solves the Black-Scholes-Merton implied volatility by bisection
//! - prices an American call on a Cox-Ross-Rubinstein lattice
//! - reports market minus theoretical as the mispricing
//!
//! Stocks and ETFs are marked at spot. Portfolio totals, P&L and the
//! options/equity exposure split come back in one `PortfolioReport`.
//!
//! ## Key Components
//!
//! - **Data**: Yahoo Finance (spot, dividends, chains, `^TNX` rate) and
//!   offline JSON market files
//! - **Black-Scholes**: European call and implied volatility solver
//! - **Binomial**: American call with early exercise
//! - **Valuation**: per-option stage machine and portfolio summary
//!
//! ## Usage
//!
//! ```rust,no_run
//! use portfolio_fairvalue::prelude::*;
//!
//! let portfolio = PortfolioFile::load("portfolio.json").unwrap();
//! let market = StaticMarketData::load("market.json").unwrap();
//!
//! let valuator = PortfolioValuator::with_config(portfolio.valuation);
//! let today = chrono::Utc::now().date_naive();
//! let report = valuator.run(&portfolio.positions, Collaborators::from_source(&market), today);
//!
//! println!("{}", render_text(&report));
//! ```
//!
//! ## What This Does NOT Do
//!
//! - Price puts (they are reported as unsupported)
//! - Model discrete dividends
//! - Produce trading signals

pub mod core;
pub mod data;
pub mod models;
pub mod report;
pub mod valuation;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        FairValueError, FairValueResult, Instrument, MarketSnapshot, OptionContract,
        OptionQuote, OptionType, OptionValuation, PortfolioReport, PortfolioSummary, Position,
        PositionValuation, PriceVerdict, UnderlyingQuote, ValuationOutcome, ValuationStage,
        VolatilityComparison, VolatilityOrigin,
    };

    // Data
    pub use crate::data::{
        FixedRate, HistoricalVolatilityProvider, Lookup, MarketDataProvider, MarketFile,
        RiskFreeRateProvider, StaticMarketData, YahooClient,
    };

    // Models
    pub use crate::models::{
        american_call, annualized_volatility, call_price, implied_volatility, norm_cdf,
        BinomialTree, IvSolverConfig,
    };

    // Valuation
    pub use crate::valuation::{
        Collaborators, PortfolioFile, PortfolioValuator, ValuationConfig, VolatilitySource,
    };

    pub use crate::report::render_text;
}

// Re-export main types at crate root
pub use crate::core::{FairValueError, FairValueResult};
pub use crate::valuation::{PortfolioValuator, ValuationConfig};
