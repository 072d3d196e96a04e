//! Market data
//!
//! Handles:
//! - Collaborator traits the valuation consumes
//! - Yahoo Finance live data
//! - Offline JSON market files

pub mod provider;
pub mod yahoo;
pub mod offline;

pub use provider::*;
pub use yahoo::*;
pub use offline::*;
