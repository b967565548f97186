//! Error types for motus-core.

use thiserror::Error;

/// Error type for model construction and access.
#[derive(Error, Debug)]
pub enum Error {
    #[error("timestamp t[{index}] = {value} does not advance past previous timestamp {previous} (strictly increasing required, duplicates rejected)")]
    NonMonotonicTimestamp {
        index: usize,
        value: f64,
        previous: f64,
    },

    #[error("timestamp t[{index}] = {value} is not finite")]
    NonFiniteTimestamp { index: usize, value: f64 },

    #[error("channel '{label}' has {values} values for {times} timestamps")]
    ColumnLengthMismatch {
        label: String,
        values: usize,
        times: usize,
    },

    #[error("channel '{label}' has {values} values for {flags} flag entries")]
    FlagColumnLengthMismatch {
        label: String,
        values: usize,
        flags: usize,
    },

    #[error("channel '{label}' mixes value arities ({first} and {other} components)")]
    MixedArity {
        label: String,
        first: usize,
        other: usize,
    },

    #[error("value arity mismatch: {left} vs {right} components")]
    ArityMismatch { left: usize, right: usize },

    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("duplicate channel label '{0}'")]
    DuplicateChannel(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
