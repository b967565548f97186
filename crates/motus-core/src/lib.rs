//! # Motus Core
//!
//! Shared time-series data model for the motus workspace.
//!
//! A [`TimeSeries`] is an ordered sequence of timestamped samples with one or
//! more named channels. Channels share the timestamp axis but have independent
//! per-sample presence, and every sample/channel pair carries a [`FlagSet`] of
//! provenance flags recording what has happened to it.
//!
//! Transformations never mutate a series in place. Each one derives a fresh
//! series with a [`ProcessingStep`] appended to the log, so the full history
//! of a recording stays auditable:
//!
//! ```rust
//! use motus_core::{Channel, TimeSeries, TimeUnit, Value};
//!
//! let times = vec![0.0, 0.1, 0.2];
//! let wrist = Channel::new(
//!     "wrist",
//!     vec![
//!         Some(Value::Triple([0.0, 1.0, 0.0])),
//!         Some(Value::Triple([0.0, 1.1, 0.0])),
//!         None, // marker occluded on this frame
//!     ],
//! )?;
//! let series = TimeSeries::new(times, vec![wrist], TimeUnit::Seconds, Some(10.0))?;
//! assert_eq!(series.len(), 3);
//! # Ok::<(), motus_core::Error>(())
//! ```

mod error;
pub use error::{Error, Result};

mod flags;
pub use flags::{CorrectionFlag, FlagSet};

mod value;
pub use value::Value;

mod series;
pub use series::{Channel, ProcessingStep, TimeSeries, TimeUnit};
