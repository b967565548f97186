//! Offline envelope extraction.
//!
//! Rectifies each channel (Euclidean norm per sample) and smooths the
//! result with a centered moving-RMS window. The output is always a scalar
//! channel, which is what the coarse correlation search in delay finding
//! wants: amplitude structure without fine detail.

use crate::{Error, Result};
use motus_core::{Channel, ProcessingStep, TimeSeries, Value};

/// Compute the smoothed, rectified amplitude envelope of every channel.
///
/// `window` is the smoothing span in the series' time unit, centered on
/// each sample. Provenance flags are inherited sample-for-sample; absent
/// samples stay absent.
pub fn envelope(series: &TimeSeries, window: f64) -> Result<TimeSeries> {
    if !window.is_finite() || window <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "window",
            value: window,
            reason: "must be positive and finite",
        });
    }

    let times = series.times();
    let half = window / 2.0;
    let mut channels = Vec::with_capacity(series.channels().len());

    for channel in series.channels() {
        let present = channel.present_indices();
        let rectified: Vec<f64> = present
            .iter()
            .filter_map(|&i| channel.value(i))
            .map(|v| v.norm())
            .collect();

        let mut out_values: Vec<Option<Value>> = vec![None; channel.len()];
        // Centered moving RMS over the rectified signal, two-pointer over
        // the irregular timestamp axis.
        let mut lo = 0usize;
        let mut hi = 0usize;
        let mut sum_sq = 0.0f64;
        for &idx in &present {
            let t = times[idx];
            while hi < present.len() && times[present[hi]] <= t + half {
                sum_sq += rectified[hi] * rectified[hi];
                hi += 1;
            }
            while times[present[lo]] < t - half {
                sum_sq -= rectified[lo] * rectified[lo];
                lo += 1;
            }
            let count = hi - lo;
            debug_assert!(count > 0);
            // Guard against drift from repeated subtraction.
            let mean = (sum_sq / count as f64).max(0.0);
            out_values[idx] = Some(Value::Scalar(mean.sqrt()));
        }

        channels.push(Channel::from_parts(
            channel.label(),
            out_values,
            channel.flag_column().to_vec(),
        )?);
    }

    series
        .derive(
            times.to_vec(),
            channels,
            series.nominal_rate(),
            ProcessingStep::new("envelope").with_param("window", window),
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use motus_core::TimeUnit;

    fn series_of(values: Vec<Option<Value>>, rate: f64) -> TimeSeries {
        let times: Vec<f64> = (0..values.len()).map(|i| i as f64 / rate).collect();
        let channel = Channel::new("ch", values).unwrap();
        TimeSeries::new(times, vec![channel], TimeUnit::Seconds, Some(rate)).unwrap()
    }

    #[test]
    fn test_sine_envelope_approaches_rms_amplitude() {
        let rate = 1000.0;
        let values: Vec<Option<Value>> = (0..2000)
            .map(|i| {
                let t = i as f64 / rate;
                Some(Value::Scalar(
                    0.8 * (2.0 * std::f64::consts::PI * 50.0 * t).sin(),
                ))
            })
            .collect();
        let series = series_of(values, rate);

        let env = envelope(&series, 0.1).unwrap();
        // Interior samples: RMS of a sine is A / sqrt(2).
        let expected = 0.8 / 2.0f64.sqrt();
        for i in 500..1500 {
            match env.channels()[0].value(i) {
                Some(Value::Scalar(v)) => {
                    assert_relative_eq!(*v, expected, epsilon = 0.02);
                }
                other => panic!("expected scalar, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_triple_channel_is_rectified_to_scalar() {
        let values: Vec<Option<Value>> = (0..10)
            .map(|_| Some(Value::Triple([3.0, 4.0, 0.0])))
            .collect();
        let series = series_of(values, 10.0);

        let env = envelope(&series, 0.5).unwrap();
        for i in 0..10 {
            assert_eq!(env.channels()[0].value(i), Some(&Value::Scalar(5.0)));
        }
    }

    #[test]
    fn test_absent_samples_stay_absent() {
        let mut values: Vec<Option<Value>> =
            (0..10).map(|_| Some(Value::Scalar(1.0))).collect();
        values[4] = None;
        let series = series_of(values, 10.0);

        let env = envelope(&series, 0.3).unwrap();
        assert_eq!(env.channels()[0].value(4), None);
        assert_eq!(env.channels()[0].value(3), Some(&Value::Scalar(1.0)));
    }

    #[test]
    fn test_invalid_window_fails_fast() {
        let series = series_of(vec![Some(Value::Scalar(1.0)), Some(Value::Scalar(2.0))], 10.0);
        assert!(matches!(
            envelope(&series, 0.0),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            envelope(&series, f64::NAN),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_appends_processing_step() {
        let series = series_of(vec![Some(Value::Scalar(1.0)), Some(Value::Scalar(2.0))], 10.0);
        let env = envelope(&series, 0.5).unwrap();
        assert_eq!(env.log().last().unwrap().operation, "envelope");
    }
}
