//! Error types for fair-value estimation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FairValueError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Market price {market_price:.4} outside model range [{low_price:.4}, {high_price:.4}]"
    )]
    OutOfBracket {
        market_price: f64,
        low_price: f64,
        high_price: f64,
    },

    #[error("IV solver did not converge after {iterations} iterations (last estimate {last_estimate:.6})")]
    NoConvergence { iterations: usize, last_estimate: f64 },

    #[error("Risk-neutral probability {probability:.6} outside [0, 1]")]
    ArbitrageViolation { probability: f64 },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type FairValueResult<T> = Result<T, FairValueError>;

impl FairValueError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for FairValueError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
