//! Portfolio valuation
//!
//! Orchestrates one run:
//! 1. Resolve the risk-free rate and one market snapshot per underlying
//! 2. Value equity lines at spot
//! 3. Drive each option through the pricing stages
//! 4. Aggregate portfolio totals

pub mod config;
pub mod summary;
pub mod valuator;

pub use config::*;
pub use summary::*;
pub use valuator::*;
