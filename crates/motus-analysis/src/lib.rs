//! Temporal alignment for motus time series.
//!
//! Two layers:
//! - [`correlation`]: FFT-backed normalized cross-correlation of an
//!   excerpt against every lag of a longer reference.
//! - [`delay`]: the coarse search built on top of it, combining envelope
//!   reduction and downsampling from `motus-dsp` with a confidence
//!   threshold, so a dubious alignment is reported instead of guessed.

mod error;
pub use error::{Error, Result};

pub mod correlation;
pub use correlation::{cross_correlate, peak};

mod delay;
pub use delay::{find_delay, DelayConfig, DelayOutcome};
