use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from correlation and delay finding.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("excerpt spans {excerpt} samples but the reference only {reference}")]
    ExcerptLongerThanReference { reference: usize, excerpt: usize },

    #[error("degenerate signal: {reason}")]
    DegenerateSignal { reason: &'static str },

    #[error(transparent)]
    Dsp(#[from] motus_dsp::Error),

    #[error(transparent)]
    Model(#[from] motus_core::Error),
}
