use thiserror::Error;

use crate::market_data::TimestampSec;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Empty input: {0}")]
    EmptyInput(String),
    #[error("Insufficient data: need {required} observations, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(TimestampSec),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
