//! Coarse delay finding: locate where an excerpt begins inside a longer
//! reference recording.
//!
//! One linear pipeline per call, no state and no retries: optionally
//! reduce both series to an amplitude envelope, downsample both to a low
//! common rate, slide the excerpt over the reference with normalized
//! cross-correlation (whole-signal or in overlapping blocks), and accept
//! the peak only if it clears the confidence threshold. The offset is
//! reported at downsampled-grid precision; no full-resolution refinement
//! pass follows.

use crate::correlation::{cross_correlate, peak};
use crate::{Error, Result};
use motus_core::TimeSeries;
use motus_dsp::{envelope, resample, ResampleConfig};
use tracing::debug;

/// Parameters for [`find_delay`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DelayConfig {
    /// Reduce both series to a smoothed amplitude envelope before
    /// correlating. Recommended for oscillatory signals.
    pub compute_envelope: bool,
    /// Envelope smoothing span in the series' time unit. Ignored unless
    /// `compute_envelope` is set.
    pub envelope_window: f64,
    /// Common rate both series are downsampled to before the search.
    /// Sets the precision of the reported offset (one grid tick).
    pub resample_rate: f64,
    /// Split the lag range into this many blocks correlated separately.
    /// `None` correlates the whole reference in one pass.
    pub blocks: Option<usize>,
    /// Fraction of a block's lag span additionally scanned past its end,
    /// in `[0, 1)`, so a peak on a block boundary is not missed.
    pub block_overlap: f64,
    /// Minimum peak score in `(0, 1]` for a match to be accepted.
    pub threshold: f64,
}

impl DelayConfig {
    pub fn new(resample_rate: f64, threshold: f64) -> Self {
        Self {
            compute_envelope: false,
            envelope_window: 0.05,
            resample_rate,
            blocks: None,
            block_overlap: 0.25,
            threshold,
        }
    }

    /// Correlate envelopes instead of raw samples.
    pub fn with_envelope(mut self, window: f64) -> Self {
        self.compute_envelope = true;
        self.envelope_window = window;
        self
    }

    /// Block correlation for references too long to score in one pass.
    pub fn blocked(mut self, blocks: usize, overlap: f64) -> Self {
        self.blocks = Some(blocks);
        self.block_overlap = overlap;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.resample_rate.is_finite() || self.resample_rate <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "resample_rate",
                value: self.resample_rate,
                reason: "must be positive and finite",
            });
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: self.threshold,
                reason: "must lie in (0, 1]",
            });
        }
        if self.compute_envelope
            && (!self.envelope_window.is_finite() || self.envelope_window <= 0.0)
        {
            return Err(Error::InvalidParameter {
                name: "envelope_window",
                value: self.envelope_window,
                reason: "must be positive and finite",
            });
        }
        if self.blocks == Some(0) {
            return Err(Error::InvalidParameter {
                name: "blocks",
                value: 0.0,
                reason: "must be at least one block",
            });
        }
        if !(0.0..1.0).contains(&self.block_overlap) {
            return Err(Error::InvalidParameter {
                name: "block_overlap",
                value: self.block_overlap,
                reason: "must lie in [0, 1)",
            });
        }
        Ok(())
    }
}

/// Result of a delay search. Both arms carry the best offset seen so that
/// a rejected match can still be inspected or logged.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum DelayOutcome {
    /// Peak score cleared the threshold. `offset` is the time after the
    /// reference's first sample at which the excerpt begins.
    Match { offset: f64, confidence: f64 },
    /// No lag scored above the threshold. Callers decide whether to retry
    /// with other parameters or route the pair to manual alignment.
    NoMatch { best_offset: f64, confidence: f64 },
}

/// Find the offset at which `excerpt` begins inside `reference`.
///
/// Both series are read through their first channel; triple-valued
/// samples correlate by Euclidean magnitude. The offset is expressed in
/// the series' time unit, relative to the reference's first sample, and
/// is precise to one tick of `config.resample_rate`.
pub fn find_delay(
    reference: &TimeSeries,
    excerpt: &TimeSeries,
    config: &DelayConfig,
) -> Result<DelayOutcome> {
    config.validate()?;

    let (reference, excerpt) = if config.compute_envelope {
        (
            envelope(reference, config.envelope_window)?,
            envelope(excerpt, config.envelope_window)?,
        )
    } else {
        (reference.clone(), excerpt.clone())
    };

    let grid = ResampleConfig::new(config.resample_rate);
    let reference = resample(&reference, &grid)?;
    let excerpt = resample(&excerpt, &grid)?;

    let ref_signal = first_channel_signal(&reference)?;
    let exc_signal = first_channel_signal(&excerpt)?;
    let n = ref_signal.len();
    let m = exc_signal.len();
    if m > n {
        return Err(Error::ExcerptLongerThanReference {
            reference: n,
            excerpt: m,
        });
    }

    let total_lags = n - m + 1;
    let (best_lag, confidence) = match config.blocks {
        None | Some(1) => {
            let scores = cross_correlate(&ref_signal, &exc_signal)?;
            peak(&scores).unwrap_or((0, 0.0))
        }
        Some(blocks) => {
            let span = total_lags.div_ceil(blocks);
            let context = (config.block_overlap * span as f64).round() as usize;
            let mut best = (0usize, f64::NEG_INFINITY);
            let mut lo = 0usize;
            while lo < total_lags {
                let hi = (lo + span + context).min(total_lags);
                let scores = cross_correlate(&ref_signal[lo..hi - 1 + m], &exc_signal)?;
                if let Some((i, v)) = peak(&scores) {
                    if v > best.1 {
                        best = (lo + i, v);
                    }
                }
                lo += span;
            }
            best
        }
    };

    let offset = best_lag as f64 / config.resample_rate;
    debug!(
        lag = best_lag,
        offset,
        confidence,
        threshold = config.threshold,
        "delay search finished"
    );

    if confidence >= config.threshold {
        Ok(DelayOutcome::Match { offset, confidence })
    } else {
        Ok(DelayOutcome::NoMatch {
            best_offset: offset,
            confidence,
        })
    }
}

/// Flatten the first channel into a dense sample vector. Absent samples
/// read as silence; triple values collapse to their magnitude.
fn first_channel_signal(series: &TimeSeries) -> Result<Vec<f64>> {
    let channel = series.channels().first().ok_or(Error::DegenerateSignal {
        reason: "series has no channels",
    })?;
    Ok((0..channel.len())
        .map(|i| match channel.value(i) {
            Some(value) if value.components() == 1 => value.as_slice()[0],
            Some(value) => value.norm(),
            None => 0.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use motus_core::{Channel, TimeUnit, Value};

    fn pseudo_noise(len: usize, mut state: u64) -> Vec<f64> {
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 33) as f64 / (1u64 << 30) as f64 - 1.0
            })
            .collect()
    }

    fn series_at(values: &[f64], rate: f64) -> TimeSeries {
        // Surface the search's debug logs when a case fails.
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();

        let times: Vec<f64> = (0..values.len()).map(|i| i as f64 / rate).collect();
        let channel = Channel::new(
            "sig",
            values.iter().map(|&v| Some(Value::Scalar(v))).collect(),
        )
        .unwrap();
        TimeSeries::new(times, vec![channel], TimeUnit::Seconds, Some(rate)).unwrap()
    }

    #[test]
    fn test_embedded_excerpt_is_located() {
        let base = pseudo_noise(2000, 9);
        let reference = series_at(&base, 100.0);
        let excerpt = series_at(&base[500..800], 100.0);

        let config = DelayConfig::new(50.0, 0.5);
        match find_delay(&reference, &excerpt, &config).unwrap() {
            DelayOutcome::Match { offset, confidence } => {
                assert_relative_eq!(offset, 5.0, epsilon = 1.0 / 50.0 + 1e-9);
                assert!(confidence > 0.9, "confidence {} too low", confidence);
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_block_search_agrees_with_full_search() {
        let base = pseudo_noise(2000, 9);
        let reference = series_at(&base, 100.0);
        let excerpt = series_at(&base[500..800], 100.0);

        let full = find_delay(&reference, &excerpt, &DelayConfig::new(50.0, 0.5)).unwrap();
        let blocked = find_delay(
            &reference,
            &excerpt,
            &DelayConfig::new(50.0, 0.5).blocked(4, 0.25),
        )
        .unwrap();

        match (full, blocked) {
            (
                DelayOutcome::Match { offset: a, .. },
                DelayOutcome::Match { offset: b, .. },
            ) => assert_relative_eq!(a, b),
            other => panic!("expected two matches, got {:?}", other),
        }
    }

    #[test]
    fn test_unrelated_excerpt_reports_no_match() {
        let reference = series_at(&pseudo_noise(1500, 3), 100.0);
        let excerpt = series_at(&pseudo_noise(200, 77), 100.0);

        let config = DelayConfig::new(50.0, 0.9);
        match find_delay(&reference, &excerpt, &config).unwrap() {
            DelayOutcome::NoMatch { confidence, .. } => {
                assert!(confidence < 0.9, "noise scored {}", confidence);
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_path_locates_a_burst() {
        // Quiet reference with a loud 2 s tone burst starting at 4 s.
        let rate = 100.0;
        let quiet = pseudo_noise(1000, 5);
        let mut base: Vec<f64> = quiet.iter().map(|v| 0.01 * v).collect();
        for i in 400..600 {
            base[i] = (2.0 * std::f64::consts::PI * 8.0 * i as f64 / rate).sin();
        }
        let reference = series_at(&base, rate);
        let excerpt = series_at(&base[400..600], rate);

        let config = DelayConfig::new(20.0, 0.5).with_envelope(0.2);
        match find_delay(&reference, &excerpt, &config).unwrap() {
            DelayOutcome::Match { offset, .. } => {
                assert!(
                    (offset - 4.0).abs() < 0.3,
                    "burst located at {} instead of 4.0",
                    offset
                );
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_parameters_fail_fast() {
        let series = series_at(&pseudo_noise(100, 1), 100.0);

        for config in [
            DelayConfig::new(0.0, 0.5),
            DelayConfig::new(50.0, 1.5),
            DelayConfig::new(50.0, f64::NAN),
            DelayConfig::new(50.0, 0.5).blocked(0, 0.25),
            DelayConfig::new(50.0, 0.5).blocked(4, 1.0),
        ] {
            assert!(
                matches!(
                    find_delay(&series, &series, &config),
                    Err(Error::InvalidParameter { .. })
                ),
                "config {:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_excerpt_longer_than_reference_is_rejected() {
        let reference = series_at(&pseudo_noise(100, 1), 100.0);
        let excerpt = series_at(&pseudo_noise(300, 2), 100.0);

        assert!(matches!(
            find_delay(&reference, &excerpt, &DelayConfig::new(50.0, 0.5)),
            Err(Error::ExcerptLongerThanReference { .. })
        ));
    }
}
