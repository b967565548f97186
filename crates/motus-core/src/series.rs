//! The `TimeSeries` container: timestamp axis, channel columns, processing log.

use crate::{Error, FlagSet, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time unit of a series' timestamp axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

/// One record in a series' processing log.
///
/// Every transformation appends exactly one step; the log itself is never
/// edited in place, so a series' history can always be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub operation: String,
    pub parameters: BTreeMap<String, String>,
}

impl ProcessingStep {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Record a parameter of the operation.
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }
}

/// One named channel: a column of optional values sharing the series'
/// timestamp axis, plus a parallel column of provenance flags.
///
/// `None` encodes per-sample absence (an occluded marker, a dropout). All
/// present values in one channel have the same arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    label: String,
    values: Vec<Option<Value>>,
    flags: Vec<FlagSet>,
}

impl Channel {
    /// Build a channel from observed values. Present samples are flagged
    /// `Original`, absent samples carry no flags.
    pub fn new(label: impl Into<String>, values: Vec<Option<Value>>) -> Result<Self> {
        let flags = values
            .iter()
            .map(|v| match v {
                Some(_) => FlagSet::original(),
                None => FlagSet::EMPTY,
            })
            .collect();
        Self::from_parts(label, values, flags)
    }

    /// Build a channel from explicit value and flag columns (used by
    /// transformations carrying provenance forward).
    pub fn from_parts(
        label: impl Into<String>,
        values: Vec<Option<Value>>,
        flags: Vec<FlagSet>,
    ) -> Result<Self> {
        let label = label.into();
        if values.len() != flags.len() {
            return Err(Error::FlagColumnLengthMismatch {
                label,
                values: values.len(),
                flags: flags.len(),
            });
        }
        let mut arity = None;
        for value in values.iter().flatten() {
            match arity {
                None => arity = Some(value.components()),
                Some(first) if first != value.components() => {
                    return Err(Error::MixedArity {
                        label,
                        first,
                        other: value.components(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            label,
            values,
            flags,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at sample `index`, `None` if absent.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// Provenance flags at sample `index`.
    pub fn flags(&self, index: usize) -> FlagSet {
        self.flags.get(index).copied().unwrap_or(FlagSet::EMPTY)
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn flag_column(&self) -> &[FlagSet] {
        &self.flags
    }

    /// Indices of samples with a present value, in order.
    pub fn present_indices(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|_| i))
            .collect()
    }

    /// Arity of the channel's values, `None` if every sample is absent.
    pub fn arity(&self) -> Option<usize> {
        self.values.iter().flatten().next().map(|v| v.components())
    }
}

/// An ordered sequence of timestamped multi-channel samples.
///
/// Timestamps are strictly increasing (duplicates are rejected at
/// construction). Transformations derive new series via [`TimeSeries::derive`]
/// or [`TimeSeries::with_step`]; the input is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    channels: Vec<Channel>,
    time_unit: TimeUnit,
    /// Nominal sampling rate (samples per time unit), `None` for
    /// variable-rate recordings.
    nominal_rate: Option<f64>,
    log: Vec<ProcessingStep>,
}

impl TimeSeries {
    /// Build a series, validating the timestamp axis and column lengths.
    pub fn new(
        times: Vec<f64>,
        channels: Vec<Channel>,
        time_unit: TimeUnit,
        nominal_rate: Option<f64>,
    ) -> Result<Self> {
        for (index, &value) in times.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::NonFiniteTimestamp { index, value });
            }
            if index > 0 && value <= times[index - 1] {
                return Err(Error::NonMonotonicTimestamp {
                    index,
                    value,
                    previous: times[index - 1],
                });
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for channel in &channels {
            if channel.len() != times.len() {
                return Err(Error::ColumnLengthMismatch {
                    label: channel.label().to_string(),
                    values: channel.len(),
                    times: times.len(),
                });
            }
            if !seen.insert(channel.label().to_string()) {
                return Err(Error::DuplicateChannel(channel.label().to_string()));
            }
        }
        Ok(Self {
            times,
            channels,
            time_unit,
            nominal_rate,
            log: Vec::new(),
        })
    }

    /// Derive a transformed series: new axis and channels, inherited time
    /// unit, and the parent's log extended by `step`.
    pub fn derive(
        &self,
        times: Vec<f64>,
        channels: Vec<Channel>,
        nominal_rate: Option<f64>,
        step: ProcessingStep,
    ) -> Result<TimeSeries> {
        let mut series = TimeSeries::new(times, channels, self.time_unit, nominal_rate)?;
        series.log = self.log.clone();
        series.log.push(step);
        Ok(series)
    }

    /// Copy of the series with `step` appended and nothing else changed
    /// (used by documented no-op transformations).
    pub fn with_step(&self, step: ProcessingStep) -> TimeSeries {
        let mut series = self.clone();
        series.log.push(step);
        series
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub fn nominal_rate(&self) -> Option<f64> {
        self.nominal_rate
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_labels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.label())
    }

    pub fn channel(&self, label: &str) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.label() == label)
            .ok_or_else(|| Error::UnknownChannel(label.to_string()))
    }

    pub fn log(&self) -> &[ProcessingStep] {
        &self.log
    }

    /// Elapsed time between the first and last sample.
    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Mean inter-sample interval, `None` for fewer than two samples.
    pub fn mean_interval(&self) -> Option<f64> {
        if self.times.len() < 2 {
            return None;
        }
        Some(self.duration() / (self.times.len() - 1) as f64)
    }

    /// Sampling rate estimated from the mean interval (samples per time unit).
    pub fn estimated_rate(&self) -> Option<f64> {
        self.mean_interval().map(|dt| 1.0 / dt)
    }

    /// True if consecutive intervals all match the mean within `tolerance`.
    pub fn is_uniform(&self, tolerance: f64) -> bool {
        let Some(mean) = self.mean_interval() else {
            return true;
        };
        self.times
            .windows(2)
            .all(|w| ((w[1] - w[0]) - mean).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scalar_channel(label: &str, values: &[f64]) -> Channel {
        Channel::new(
            label,
            values.iter().map(|&v| Some(Value::Scalar(v))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let result = TimeSeries::new(
            vec![0.0, 0.1, 0.1],
            vec![],
            TimeUnit::Seconds,
            None,
        );
        assert!(matches!(
            result,
            Err(Error::NonMonotonicTimestamp { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let result = TimeSeries::new(vec![0.0, 0.2, 0.1], vec![], TimeUnit::Seconds, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_column_length_mismatch() {
        let channel = scalar_channel("a", &[1.0, 2.0]);
        let result = TimeSeries::new(
            vec![0.0, 0.1, 0.2],
            vec![channel],
            TimeUnit::Seconds,
            None,
        );
        assert!(matches!(result, Err(Error::ColumnLengthMismatch { .. })));
    }

    #[test]
    fn test_rejects_flag_column_length_mismatch() {
        let result = Channel::from_parts(
            "a",
            vec![Some(Value::Scalar(1.0)), Some(Value::Scalar(2.0))],
            vec![FlagSet::original()],
        );
        assert!(matches!(
            result,
            Err(Error::FlagColumnLengthMismatch {
                values: 2,
                flags: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_mixed_arity_channel() {
        let result = Channel::new(
            "bad",
            vec![Some(Value::Scalar(1.0)), Some(Value::Triple([0.0; 3]))],
        );
        assert!(matches!(result, Err(Error::MixedArity { .. })));
    }

    #[test]
    fn test_rejects_duplicate_channel_labels() {
        let a = scalar_channel("a", &[1.0]);
        let b = scalar_channel("a", &[2.0]);
        let result = TimeSeries::new(vec![0.0], vec![a, b], TimeUnit::Seconds, None);
        assert!(matches!(result, Err(Error::DuplicateChannel(_))));
    }

    #[test]
    fn test_present_indices_skip_absent() {
        let channel = Channel::new(
            "a",
            vec![Some(Value::Scalar(1.0)), None, Some(Value::Scalar(3.0))],
        )
        .unwrap();
        assert_eq!(channel.present_indices(), vec![0, 2]);
        assert!(channel.flags(1).is_empty());
        assert!(channel.flags(0).contains(crate::CorrectionFlag::Original));
    }

    #[test]
    fn test_derive_extends_log() {
        let series = TimeSeries::new(
            vec![0.0, 0.1],
            vec![scalar_channel("a", &[1.0, 2.0])],
            TimeUnit::Seconds,
            Some(10.0),
        )
        .unwrap();

        let step = ProcessingStep::new("noop").with_param("reason", "test");
        let derived = series
            .derive(
                series.times().to_vec(),
                series.channels().to_vec(),
                Some(10.0),
                step.clone(),
            )
            .unwrap();

        assert!(series.log().is_empty(), "input log must not change");
        assert_eq!(derived.log(), &[step]);
    }

    #[test]
    fn test_rate_helpers() {
        let series = TimeSeries::new(
            (0..11).map(|i| i as f64 * 0.1).collect(),
            vec![],
            TimeUnit::Seconds,
            None,
        )
        .unwrap();
        assert_relative_eq!(series.duration(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(series.mean_interval().unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(series.estimated_rate().unwrap(), 10.0, epsilon = 1e-9);
        assert!(series.is_uniform(1e-9));
    }
}
