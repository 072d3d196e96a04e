//! Core data types
//!
//! Defines fundamental types:
//! - Position / OptionContract: what the portfolio holds
//! - OptionQuote / MarketSnapshot: market inputs for one run
//! - OptionValuation / PortfolioReport: valuation output

pub mod option;
pub mod quote;
pub mod valuation;
pub mod error;

pub use option::*;
pub use quote::*;
pub use valuation::*;
pub use error::*;
