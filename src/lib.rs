//! # Motus - time-series correction and alignment
//!
//! Correction, resampling, and alignment for behavioral recordings
//! (motion capture, audio features), built from modular subsystems:
//!
//! - **motus-core** - Shared data model (TimeSeries, Channel, Value,
//!   correction provenance flags, processing log)
//! - **motus-dsp** - Jitter correction (twitches and jumps), windowed
//!   resampling with pluggable interpolation kernels, envelope
//!   extraction, baseline utilities
//! - **motus-analysis** - Cross-correlation and coarse delay finding for
//!   aligning two recordings in time
//!
//! ## Quick Start
//!
//! ```ignore
//! use motus::{correct, resample, JitterConfig, ResampleConfig, WindowSpan};
//!
//! // Repair sensor twitches and jumps, then bring the series to 120 Hz.
//! let config = JitterConfig::new(30.0, WindowSpan::Samples(5));
//! let (cleaned, report) = correct(&series, &config)?;
//! println!("corrected {} points", report.points_corrected());
//!
//! let resampled = resample(&cleaned, &ResampleConfig::new(120.0))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Model, correction, resampling, and alignment
//! - `analysis` - Delay finding and cross-correlation (pulls in rustfft)
//! - `serialization` - Serde on analysis result types

use thiserror::Error as ThisError;

/// Re-export of motus-core for direct access
pub use motus_core as core;

// Data model
pub use motus_core::{
    Channel, CorrectionFlag, FlagSet, ProcessingStep, TimeSeries, TimeUnit, Value,
};

/// Re-export of motus-dsp for direct access
pub use motus_dsp as dsp;

// Correction and resampling
pub use motus_dsp::{
    correct, envelope, fit, randomize_segments, re_reference, resample, ChannelReport, Fitted,
    InterpolationKernel, JitterConfig, JitterInterpolation, JitterReport, ResampleConfig,
    WindowSpan,
};

/// Re-export of motus-analysis for direct access
#[cfg(feature = "analysis")]
pub use motus_analysis as analysis;

// Alignment
#[cfg(feature = "analysis")]
pub use motus_analysis::{cross_correlate, find_delay, peak, DelayConfig, DelayOutcome};

/// Unified error over all subsystems.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] motus_core::Error),

    #[error(transparent)]
    Dsp(#[from] motus_dsp::Error),

    #[cfg(feature = "analysis")]
    #[error(transparent)]
    Analysis(#[from] motus_analysis::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
