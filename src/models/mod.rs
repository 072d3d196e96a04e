//! Pricing Models
//!
//! Implements:
//! - Black-Scholes-Merton (European call, implied volatility)
//! - Binomial lattice (American call with early exercise)
//! - Historical volatility from closes

pub mod black_scholes;
pub mod binomial;
pub mod historical;

pub use black_scholes::*;
pub use binomial::*;
pub use historical::*;
