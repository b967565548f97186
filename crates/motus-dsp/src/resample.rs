//! Windowed resampling to a regular target rate.
//!
//! Whole-series interpolation at audio rates is memory-prohibitive, so the
//! series is cut into windows of input samples, each window is resampled
//! independently with local kernel support, and the per-window outputs are
//! stitched back together. Windows are extended on both sides by
//! `overlap_ratio * window_length` input samples before fitting so the
//! kernel has context past the nominal boundary and the stitch is seam-free.
//!
//! With `window_length = None` the whole series is one window, which is the
//! calling convention used for short motion-capture sequences. One
//! algorithm, two calling conventions.

use crate::kernel::{self, InterpolationKernel};
use crate::{Error, Result};
use motus_core::{Channel, CorrectionFlag, FlagSet, ProcessingStep, TimeSeries, Value};
use tracing::debug;

/// Configuration for [`resample`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleConfig {
    /// Output rate in samples per time unit of the series.
    pub target_rate: f64,
    pub kernel: InterpolationKernel,
    /// Input samples per window; `None` treats the whole series as one
    /// window.
    pub window_length: Option<usize>,
    /// Fraction of the window length used as fitting context on each side,
    /// in `[0, 1)`.
    pub overlap_ratio: f64,
}

impl ResampleConfig {
    pub fn new(target_rate: f64) -> Self {
        Self {
            target_rate,
            kernel: InterpolationKernel::default(),
            window_length: None,
            overlap_ratio: 0.0,
        }
    }

    pub fn with_kernel(mut self, kernel: InterpolationKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Bounded-memory mode: fixed windows with overlap context.
    pub fn windowed(mut self, window_length: usize, overlap_ratio: f64) -> Self {
        self.window_length = Some(window_length);
        self.overlap_ratio = overlap_ratio;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.target_rate.is_finite() || self.target_rate <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "target_rate",
                value: self.target_rate,
                reason: "must be positive and finite",
            });
        }
        if !self.overlap_ratio.is_finite() || !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(Error::InvalidParameter {
                name: "overlap_ratio",
                value: self.overlap_ratio,
                reason: "must lie in [0, 1)",
            });
        }
        if self.window_length == Some(0) {
            return Err(Error::InvalidParameter {
                name: "window_length",
                value: 0.0,
                reason: "must be at least one input sample",
            });
        }
        Ok(())
    }
}

/// One stitching unit: an extended input range and the output ticks that
/// fall inside the window's nominal (non-overlapping) span.
#[derive(Debug, Clone, Copy)]
struct Window {
    input_lo: usize,
    input_hi: usize,
    tick_lo: usize,
    tick_hi: usize,
}

/// Resample `series` onto the regular `1/target_rate` grid spanning its
/// first to last timestamp.
///
/// The output has exactly one sample per tick, strictly increasing and
/// evenly spaced. A window with fewer input points than the kernel's
/// minimum support falls back to linear for that window only; the fallback
/// is recorded in the processing log. Resampling a series already at the
/// target rate is a no-op that still returns a fresh series with a
/// degenerate processing step.
pub fn resample(series: &TimeSeries, config: &ResampleConfig) -> Result<TimeSeries> {
    config.validate()?;

    let n = series.len();
    if n < 2 {
        return Err(Error::InsufficientData {
            reason: "resampling needs at least two input samples",
            points: n,
        });
    }

    let mut step = ProcessingStep::new("resample")
        .with_param("target_rate", config.target_rate)
        .with_param("kernel", config.kernel.name())
        .with_param(
            "window_length",
            config
                .window_length
                .map_or_else(|| "whole-series".to_string(), |w| w.to_string()),
        )
        .with_param("overlap_ratio", config.overlap_ratio);

    let dt = 1.0 / config.target_rate;
    if let Some(rate) = series.nominal_rate() {
        if (rate - config.target_rate).abs() <= rate * 1e-9 && series.is_uniform(dt * 1e-9) {
            debug!(rate, "series already at target rate; degenerate resample");
            return Ok(series.with_step(step.with_param("noop", "already at target rate")));
        }
    }

    let times = series.times();
    let eps = dt * 1e-9;
    let tick_count = ((times[n - 1] - times[0]) / dt + eps).floor() as usize + 1;
    let out_times: Vec<f64> = (0..tick_count).map(|k| times[0] + k as f64 * dt).collect();

    let windows = plan_windows(times, &out_times, n, config);

    let mut channels = Vec::with_capacity(series.channels().len());
    for channel in series.channels() {
        let (resampled, fallbacks) =
            resample_channel(times, &out_times, channel, &windows, config, dt)?;
        if !fallbacks.is_empty() {
            debug!(
                channel = channel.label(),
                windows = ?fallbacks,
                "kernel below minimum support; fell back to linear"
            );
            step = step.with_param(
                format!("linear_fallback[{}]", channel.label()),
                fallbacks
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        channels.push(resampled);
    }

    series
        .derive(out_times, channels, Some(config.target_rate), step)
        .map_err(Error::from)
}

/// Cut the input into nominal windows and assign every output tick to
/// exactly one window (ticks before the next window's first input timestamp
/// belong to the current window; the last window takes the remainder).
///
/// The input range always extends at least one sample past the nominal end
/// so the ticks between a window's last input sample and the next window's
/// first are bracketed by knots even at zero overlap.
fn plan_windows(
    times: &[f64],
    out_times: &[f64],
    n: usize,
    config: &ResampleConfig,
) -> Vec<Window> {
    let window_len = config.window_length.unwrap_or(n).min(n);
    let context = (config.overlap_ratio * window_len as f64).round() as usize;

    let mut windows = Vec::new();
    let mut tick_cursor = 0usize;
    let mut start = 0usize;
    while start < n {
        let end = (start + window_len).min(n);
        let tick_hi = if end == n {
            out_times.len()
        } else {
            let boundary = times[end];
            let mut hi = tick_cursor;
            while hi < out_times.len() && out_times[hi] < boundary {
                hi += 1;
            }
            hi
        };
        windows.push(Window {
            input_lo: start.saturating_sub(context),
            input_hi: (end + context.max(1)).min(n),
            tick_lo: tick_cursor,
            tick_hi,
        });
        tick_cursor = tick_hi;
        start = end;
    }
    windows
}

fn resample_channel(
    times: &[f64],
    out_times: &[f64],
    channel: &Channel,
    windows: &[Window],
    config: &ResampleConfig,
    dt: f64,
) -> Result<(Channel, Vec<usize>)> {
    let tick_count = out_times.len();
    let mut out_values: Vec<Option<Value>> = vec![None; tick_count];
    let mut out_flags = vec![FlagSet::EMPTY; tick_count];
    let mut fallbacks = Vec::new();

    let present = channel.present_indices();
    let template = present.first().and_then(|&i| channel.value(i)).copied();
    if let (Some(template), true) = (template, present.len() >= 2) {
        let arity = template.components();
        let span = (times[present[0]], times[present[present.len() - 1]]);

        for (w_index, window) in windows.iter().enumerate() {
            if window.tick_lo == window.tick_hi {
                continue;
            }
            let knots: Vec<usize> = present
                .iter()
                .copied()
                .filter(|&i| i >= window.input_lo && i < window.input_hi)
                .collect();
            let xs: Vec<f64> = knots.iter().map(|&i| times[i]).collect();

            let kernel_used = if xs.len() >= config.kernel.min_support() {
                config.kernel
            } else if xs.len() >= 2 {
                if config.kernel != InterpolationKernel::Linear {
                    fallbacks.push(w_index);
                }
                InterpolationKernel::Linear
            } else {
                // No local support at all; ticks in this window stay absent.
                continue;
            };

            let mut fitted = Vec::with_capacity(arity);
            for component in 0..arity {
                let ys: Vec<f64> = knots
                    .iter()
                    .map(|&i| {
                        channel
                            .value(i)
                            .map(|v| v.as_slice()[component])
                            .unwrap_or(0.0)
                    })
                    .collect();
                fitted.push(kernel::fit(kernel_used, &xs, &ys)?);
            }

            for k in window.tick_lo..window.tick_hi {
                let t = out_times[k];
                if t < span.0 - dt * 1e-9 || t > span.1 + dt * 1e-9 {
                    continue; // outside the channel's present-value span
                }
                let components: Vec<f64> = fitted.iter().map(|f| f.eval(t)).collect();
                out_values[k] = Some(template.from_components(&components));
                out_flags[k] = FlagSet::EMPTY.with(CorrectionFlag::InterpolatedMissing);
            }
        }

        // Ticks landing on an input sample keep its exact value and inherit
        // its provenance instead of counting as interpolated.
        let match_eps = dt * 1e-6;
        let mut pi = 0usize;
        for k in 0..tick_count {
            let t = out_times[k];
            while pi < present.len() && times[present[pi]] < t - match_eps {
                pi += 1;
            }
            if pi < present.len() && (times[present[pi]] - t).abs() <= match_eps {
                out_values[k] = channel.values()[present[pi]];
                out_flags[k] = channel.flags(present[pi]);
            }
        }
    }

    let resampled = Channel::from_parts(channel.label(), out_values, out_flags)?;
    Ok((resampled, fallbacks))
}
