//! Correction and resampling engine for motus time series: twitch/jump
//! jitter correction, bounded-memory windowed resampling with pluggable
//! interpolation kernels, envelope extraction, and baseline utilities.
//!
//! Every operation is a pure function `TimeSeries -> TimeSeries` (plus a
//! report where applicable): inputs are never mutated, and each output
//! carries a processing-step record appended to its log. Channels are
//! independent, so callers may parallelize across channels or windows;
//! nothing here holds state between calls.

mod error;
pub use error::{Error, Result};

mod kernel;
pub use kernel::{fit, Fitted, InterpolationKernel};

mod dejitter;
pub use dejitter::{
    correct, ChannelReport, JitterConfig, JitterInterpolation, JitterReport, WindowSpan,
};

mod resample;
pub use resample::{resample, ResampleConfig};

mod envelope;
pub use envelope::envelope;

mod baseline;
pub use baseline::{randomize_segments, re_reference};
