//! Error types for motus-dsp.

use thiserror::Error;

/// Error type for correction and resampling operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("insufficient data: {reason} ({points} points)")]
    InsufficientData {
        reason: &'static str,
        points: usize,
    },

    #[error(transparent)]
    Model(#[from] motus_core::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
