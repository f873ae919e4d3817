//! Error types for strain-lib

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrainError {
    #[error("no data for cycle {cycle}")]
    EmptyCycle { cycle: u32 },

    #[error("incompatible cycle range: {0}")]
    IncompatibleCycleRange(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("cycle {cycle} has no {field}; calibrate it before extraction")]
    Uncalibrated { cycle: u32, field: &'static str },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),

    #[cfg(feature = "polars")]
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, StrainError>;
