//! Twitch and jump correction for per-channel position/amplitude streams.
//!
//! Sensor streams carry two kinds of short-lived artifacts: **twitches**
//! (a transient deviation that returns to baseline within a search window)
//! and **jumps** (a deviation that never returns and must be accepted as the
//! new baseline). Both are detected by thresholding the instantaneous
//! velocity between the most recently accepted sample (the *anchor*) and
//! each candidate, then scanning forward for the first confirmed return.
//!
//! Correction runs independently per channel; within a channel the loop is
//! inherently sequential because every decision depends on the previous
//! anchor.

use crate::kernel::{self, InterpolationKernel};
use crate::{Error, Result};
use motus_core::{Channel, CorrectionFlag, ProcessingStep, TimeSeries, Value};
use tracing::debug;

/// Forward search bound for the return-to-baseline scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowSpan {
    /// Look ahead at most this many present samples.
    Samples(usize),
    /// Look ahead until this much time has elapsed past the first deviant
    /// sample (in the series' time unit).
    Time(f64),
}

/// How corrected samples are filled in between the anchor and the return
/// (or window-close) sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterInterpolation {
    /// Hold the anchor's value.
    HoldLast,
    /// Linear by time fraction between the anchor and the target sample.
    #[default]
    Linear,
    /// Natural cubic spline over a local window of accepted samples.
    CubicSpline,
}

impl JitterInterpolation {
    fn name(&self) -> &'static str {
        match self {
            JitterInterpolation::HoldLast => "hold-last",
            JitterInterpolation::Linear => "linear",
            JitterInterpolation::CubicSpline => "cubic-spline",
        }
    }
}

/// Configuration for [`correct`].
#[derive(Debug, Clone, PartialEq)]
pub struct JitterConfig {
    /// Maximum acceptable velocity (value distance per time unit) between
    /// the anchor and an accepted sample. Non-positive disables correction.
    pub velocity_threshold: f64,
    /// Forward search bound before a deviation is declared a jump.
    pub window: WindowSpan,
    pub interpolation: JitterInterpolation,
    /// Repair samples classified as twitches.
    pub correct_twitches: bool,
    /// Repair samples classified as jumps (disable to leave jumps for
    /// manual review; they are still detected and reported).
    pub correct_jumps: bool,
}

impl JitterConfig {
    pub fn new(velocity_threshold: f64, window: WindowSpan) -> Self {
        Self {
            velocity_threshold,
            window,
            interpolation: JitterInterpolation::default(),
            correct_twitches: true,
            correct_jumps: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.velocity_threshold.is_nan() {
            return Err(Error::InvalidParameter {
                name: "velocity_threshold",
                value: self.velocity_threshold,
                reason: "must be a number",
            });
        }
        if let WindowSpan::Time(t) = self.window {
            if !t.is_finite() || t < 0.0 {
                return Err(Error::InvalidParameter {
                    name: "window",
                    value: t,
                    reason: "time window must be finite and non-negative",
                });
            }
        }
        Ok(())
    }

    /// A zero window or non-positive threshold disables correction; the
    /// call becomes a documented no-op.
    fn is_disabled(&self) -> bool {
        if self.velocity_threshold <= 0.0 {
            return true;
        }
        match self.window {
            WindowSpan::Samples(w) => w == 0,
            WindowSpan::Time(t) => t == 0.0,
        }
    }

    fn window_param(&self) -> String {
        match self.window {
            WindowSpan::Samples(w) => format!("{} samples", w),
            WindowSpan::Time(t) => format!("{} time units", t),
        }
    }
}

/// Per-channel correction counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub label: String,
    /// Deviations that returned to baseline within the window.
    pub twitches: usize,
    /// Deviations accepted as a new permanent baseline.
    pub jumps: usize,
    /// Samples rewritten by twitch interpolation.
    pub twitch_points: usize,
    /// Samples rewritten by jump interpolation.
    pub jump_points: usize,
}

impl ChannelReport {
    pub fn points_corrected(&self) -> usize {
        self.twitch_points + self.jump_points
    }
}

/// Correction report across all channels, used by callers to decide whether
/// a recording needs exclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JitterReport {
    pub channels: Vec<ChannelReport>,
}

impl JitterReport {
    pub fn twitches(&self) -> usize {
        self.channels.iter().map(|c| c.twitches).sum()
    }

    pub fn jumps(&self) -> usize {
        self.channels.iter().map(|c| c.jumps).sum()
    }

    pub fn twitch_points(&self) -> usize {
        self.channels.iter().map(|c| c.twitch_points).sum()
    }

    pub fn jump_points(&self) -> usize {
        self.channels.iter().map(|c| c.jump_points).sum()
    }

    pub fn points_corrected(&self) -> usize {
        self.twitch_points() + self.jump_points()
    }
}

/// Outcome of one forward scan opened by an over-threshold candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanOutcome {
    /// First in-threshold return found at this position (into the present
    /// sample list) before the window closed.
    Twitch { return_pos: usize },
    /// Window exhausted (or series ended); the sample at this position
    /// becomes the new, permanently shifted anchor.
    Jump { close_pos: usize },
}

/// Detect and repair twitches and jumps in every channel of `series`.
///
/// Returns the corrected series (with a `dejitter` processing step appended)
/// and a [`JitterReport`]. The input series is untouched. Rerunning with the
/// same parameters on the output corrects zero further points.
pub fn correct(series: &TimeSeries, config: &JitterConfig) -> Result<(TimeSeries, JitterReport)> {
    config.validate()?;

    let step = ProcessingStep::new("dejitter")
        .with_param("velocity_threshold", config.velocity_threshold)
        .with_param("window", config.window_param())
        .with_param("interpolation", config.interpolation.name())
        .with_param("correct_twitches", config.correct_twitches)
        .with_param("correct_jumps", config.correct_jumps);

    if config.is_disabled() {
        debug!("dejitter disabled by configuration; passing series through");
        return Ok((
            series.with_step(step.with_param("disabled", true)),
            JitterReport::default(),
        ));
    }

    let mut report = JitterReport::default();
    let mut channels = Vec::with_capacity(series.channels().len());
    for channel in series.channels() {
        let (corrected, channel_report) = correct_channel(series.times(), channel, config)?;
        debug!(
            channel = channel.label(),
            twitches = channel_report.twitches,
            jumps = channel_report.jumps,
            points = channel_report.points_corrected(),
            "dejitter channel complete"
        );
        channels.push(corrected);
        report.channels.push(channel_report);
    }

    let corrected = series.derive(
        series.times().to_vec(),
        channels,
        series.nominal_rate(),
        step.with_param("points_corrected", report.points_corrected()),
    )?;
    Ok((corrected, report))
}

fn correct_channel(
    times: &[f64],
    channel: &Channel,
    config: &JitterConfig,
) -> Result<(Channel, ChannelReport)> {
    let mut report = ChannelReport {
        label: channel.label().to_string(),
        twitches: 0,
        jumps: 0,
        twitch_points: 0,
        jump_points: 0,
    };

    let present = channel.present_indices();
    if present.len() < 2 || is_constant(channel, &present)? {
        return Ok((channel.clone(), report));
    }

    let mut values = channel.values().to_vec();
    let mut flags = channel.flag_column().to_vec();

    // Accepted sample history feeding the cubic-spline local window.
    let mut accepted: Vec<usize> = vec![present[0]];
    let mut anchor_pos = 0usize;
    let mut p = 1usize;

    while p < present.len() {
        let anchor_idx = present[anchor_pos];
        let candidate_idx = present[p];
        let velocity = velocity(times, &values, anchor_idx, candidate_idx)?;

        if velocity <= config.velocity_threshold {
            anchor_pos = p;
            accepted.push(candidate_idx);
            p += 1;
            continue;
        }

        let outcome = scan_forward(times, &values, &present, anchor_pos, p, config)?;
        let (target_pos, correcting, flag, events, points) = match outcome {
            ScanOutcome::Twitch { return_pos } => (
                return_pos,
                config.correct_twitches,
                CorrectionFlag::DejitteredTwitch,
                &mut report.twitches,
                &mut report.twitch_points,
            ),
            ScanOutcome::Jump { close_pos } => (
                close_pos,
                config.correct_jumps,
                CorrectionFlag::DejitteredJump,
                &mut report.jumps,
                &mut report.jump_points,
            ),
        };

        *events += 1;
        if correcting {
            *points += interpolate_region(
                times,
                &mut values,
                &mut flags,
                &present,
                &accepted,
                anchor_pos,
                target_pos,
                config.interpolation,
                flag,
            )?;
        }

        anchor_pos = target_pos;
        accepted.push(present[target_pos]);
        p = target_pos + 1;
    }

    let corrected = Channel::from_parts(channel.label(), values, flags)?;
    Ok((corrected, report))
}

/// Scan forward from the first deviant sample for a return to baseline.
///
/// Candidates start at the deviant sample itself and run until the window
/// closes: after `window` present samples, after `window` elapsed time, or
/// at the end of the series, whichever comes first.
fn scan_forward(
    times: &[f64],
    values: &[Option<Value>],
    present: &[usize],
    anchor_pos: usize,
    deviant_pos: usize,
    config: &JitterConfig,
) -> Result<ScanOutcome> {
    let anchor_idx = present[anchor_pos];
    let deviant_time = times[present[deviant_pos]];

    let mut last_scanned = deviant_pos;
    for q in deviant_pos..present.len() {
        let within = match config.window {
            WindowSpan::Samples(w) => q - deviant_pos < w,
            WindowSpan::Time(t) => times[present[q]] - deviant_time <= t,
        };
        if !within {
            break;
        }
        last_scanned = q;
        if velocity(times, values, anchor_idx, present[q])? <= config.velocity_threshold {
            return Ok(ScanOutcome::Twitch { return_pos: q });
        }
    }
    Ok(ScanOutcome::Jump {
        close_pos: last_scanned,
    })
}

/// Rewrite every present sample strictly between `anchor_pos` and
/// `target_pos` by interpolating from the anchor's value toward the target
/// sample's own observed value. Samples already carrying a dejitter flag are
/// never touched twice. Returns the number of samples rewritten.
#[allow(clippy::too_many_arguments)]
fn interpolate_region(
    times: &[f64],
    values: &mut [Option<Value>],
    flags: &mut [motus_core::FlagSet],
    present: &[usize],
    accepted: &[usize],
    anchor_pos: usize,
    target_pos: usize,
    interpolation: JitterInterpolation,
    flag: CorrectionFlag,
) -> Result<usize> {
    if target_pos <= anchor_pos + 1 {
        // Adjacent samples: nothing strictly between (e.g. a jump landing on
        // the final sample is reported, not corrected).
        return Ok(0);
    }

    let anchor_idx = present[anchor_pos];
    let target_idx = present[target_pos];
    let anchor_value = values[anchor_idx].ok_or(Error::InsufficientData {
        reason: "anchor sample absent",
        points: 0,
    })?;
    let target_value = values[target_idx].ok_or(Error::InsufficientData {
        reason: "target sample absent",
        points: 0,
    })?;

    let spline = match interpolation {
        JitterInterpolation::CubicSpline => {
            fit_local_spline(times, values, accepted, anchor_idx, target_idx)?
        }
        _ => None,
    };

    let span = times[target_idx] - times[anchor_idx];
    let mut corrected = 0;
    for &idx in &present[anchor_pos + 1..target_pos] {
        if flags[idx].is_dejittered() {
            continue;
        }
        let replacement = match (&interpolation, &spline) {
            (JitterInterpolation::HoldLast, _) => anchor_value,
            (JitterInterpolation::CubicSpline, Some(fitted)) => {
                let components: Vec<f64> = fitted.iter().map(|f| f.eval(times[idx])).collect();
                anchor_value.from_components(&components)
            }
            // Linear by time fraction; also the documented fallback when the
            // spline lacks support.
            _ => {
                let fraction = (times[idx] - times[anchor_idx]) / span;
                anchor_value.lerp(&target_value, fraction)?
            }
        };
        values[idx] = Some(replacement);
        flags[idx].insert(flag);
        corrected += 1;
    }
    Ok(corrected)
}

/// Fit one natural cubic spline per component over a local window of
/// accepted samples (up to three before the anchor) plus the target sample.
/// Returns `None` below minimum support; the caller falls back to linear.
fn fit_local_spline(
    times: &[f64],
    values: &[Option<Value>],
    accepted: &[usize],
    anchor_idx: usize,
    target_idx: usize,
) -> Result<Option<Vec<kernel::Fitted>>> {
    let history = accepted
        .iter()
        .rev()
        .take(4) // anchor plus up to three accepted predecessors
        .copied()
        .collect::<Vec<_>>();
    let mut knots: Vec<usize> = history.into_iter().rev().collect();
    debug_assert_eq!(knots.last(), Some(&anchor_idx));
    knots.push(target_idx);

    let arity = match values[anchor_idx] {
        Some(v) => v.components(),
        None => return Ok(None),
    };
    let xs: Vec<f64> = knots.iter().map(|&i| times[i]).collect();
    if xs.len() < InterpolationKernel::CubicSpline.min_support() {
        debug!("local spline lacks support; falling back to linear");
        return Ok(None);
    }

    let mut fitted = Vec::with_capacity(arity);
    for component in 0..arity {
        let ys: Vec<f64> = knots
            .iter()
            .map(|&i| {
                values[i]
                    .as_ref()
                    .map(|v| v.as_slice()[component])
                    .unwrap_or(0.0)
            })
            .collect();
        fitted.push(kernel::fit(InterpolationKernel::CubicSpline, &xs, &ys)?);
    }
    Ok(Some(fitted))
}

/// Velocity between two present samples: value distance over elapsed time.
/// Elapsed time is always positive (strictly increasing timestamps).
fn velocity(times: &[f64], values: &[Option<Value>], from: usize, to: usize) -> Result<f64> {
    let a = values[from].ok_or(Error::InsufficientData {
        reason: "velocity from absent sample",
        points: 0,
    })?;
    let b = values[to].ok_or(Error::InsufficientData {
        reason: "velocity to absent sample",
        points: 0,
    })?;
    Ok(a.distance(&b)? / (times[to] - times[from]))
}

/// A channel that never moves short-circuits with zero corrections.
fn is_constant(channel: &Channel, present: &[usize]) -> Result<bool> {
    let first = match channel.value(present[0]) {
        Some(v) => v,
        None => return Ok(true),
    };
    for &idx in &present[1..] {
        if let Some(value) = channel.value(idx) {
            if value.distance(first)? > 0.0 {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
