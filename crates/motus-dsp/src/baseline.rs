//! Baseline utilities: re-referencing and segment randomization.
//!
//! Both produce surrogate series for analysis: `re_reference` expresses
//! every channel relative to a reference channel (marker re-referencing),
//! and `randomize_segments` builds permutation baselines by shuffling
//! fixed-length segments with a seeded, deterministic permutation.

use crate::{Error, Result};
use motus_core::{Channel, CorrectionFlag, FlagSet, ProcessingStep, TimeSeries, Value};

/// Subtract the `reference` channel from every other channel,
/// sample-by-sample. Samples where either side is absent pass through
/// unchanged; re-expressed samples are flagged `ReReferenced`. The
/// reference channel itself is copied through untouched.
pub fn re_reference(series: &TimeSeries, reference: &str) -> Result<TimeSeries> {
    let reference_channel = series.channel(reference)?.clone();

    let mut channels = Vec::with_capacity(series.channels().len());
    for channel in series.channels() {
        if channel.label() == reference {
            channels.push(channel.clone());
            continue;
        }

        let mut values = channel.values().to_vec();
        let mut flags = channel.flag_column().to_vec();
        for i in 0..channel.len() {
            if let (Some(value), Some(origin)) = (channel.value(i), reference_channel.value(i)) {
                values[i] = Some(value.sub(origin)?);
                flags[i].insert(CorrectionFlag::ReReferenced);
            }
        }
        channels.push(Channel::from_parts(channel.label(), values, flags)?);
    }

    series
        .derive(
            series.times().to_vec(),
            channels,
            series.nominal_rate(),
            ProcessingStep::new("re_reference").with_param("reference", reference),
        )
        .map_err(Error::from)
}

/// Shuffle fixed-length segments of every channel with a deterministic,
/// seeded permutation (the same permutation for every channel, so
/// cross-channel structure inside a segment survives).
///
/// A trailing partial segment stays in place. Timestamps are unchanged;
/// values and their flags relocate together, and every present sample of
/// the output additionally carries `Randomized`.
pub fn randomize_segments(
    series: &TimeSeries,
    segment_length: usize,
    seed: u64,
) -> Result<TimeSeries> {
    if segment_length == 0 {
        return Err(Error::InvalidParameter {
            name: "segment_length",
            value: 0.0,
            reason: "must be at least one sample",
        });
    }

    let n = series.len();
    let full_segments = n / segment_length;
    let mut order: Vec<usize> = (0..full_segments).collect();
    let mut rng = XorShift64::new(seed);
    // Fisher-Yates over the segment order.
    for i in (1..order.len()).rev() {
        let j = (rng.next() % (i as u64 + 1)) as usize;
        order.swap(i, j);
    }

    let mut channels = Vec::with_capacity(series.channels().len());
    for channel in series.channels() {
        let mut values: Vec<Option<Value>> = Vec::with_capacity(n);
        let mut flags: Vec<FlagSet> = Vec::with_capacity(n);
        for &segment in &order {
            let start = segment * segment_length;
            for i in start..start + segment_length {
                values.push(channel.values()[i]);
                flags.push(channel.flags(i));
            }
        }
        // Trailing partial segment keeps its position.
        for i in full_segments * segment_length..n {
            values.push(channel.values()[i]);
            flags.push(channel.flags(i));
        }
        for (value, flag) in values.iter().zip(flags.iter_mut()) {
            if value.is_some() {
                flag.insert(CorrectionFlag::Randomized);
            }
        }
        channels.push(Channel::from_parts(channel.label(), values, flags)?);
    }

    series
        .derive(
            series.times().to_vec(),
            channels,
            series.nominal_rate(),
            ProcessingStep::new("randomize_segments")
                .with_param("segment_length", segment_length)
                .with_param("seed", seed),
        )
        .map_err(Error::from)
}

/// Small deterministic generator for the segment permutation; seeded runs
/// must reproduce exactly, so no external RNG is involved.
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motus_core::TimeUnit;

    fn two_channel_series(n: usize) -> TimeSeries {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let a = Channel::new(
            "a",
            (0..n).map(|i| Some(Value::Scalar(i as f64))).collect(),
        )
        .unwrap();
        let origin = Channel::new(
            "origin",
            (0..n).map(|_| Some(Value::Scalar(1.0))).collect(),
        )
        .unwrap();
        TimeSeries::new(times, vec![a, origin], TimeUnit::Seconds, Some(10.0)).unwrap()
    }

    #[test]
    fn test_re_reference_subtracts_reference() {
        let series = two_channel_series(5);
        let out = re_reference(&series, "origin").unwrap();

        for i in 0..5 {
            assert_eq!(
                out.channel("a").unwrap().value(i),
                Some(&Value::Scalar(i as f64 - 1.0))
            );
            assert!(out.channel("a")
                .unwrap()
                .flags(i)
                .contains(CorrectionFlag::ReReferenced));
            // Reference channel untouched.
            assert_eq!(
                out.channel("origin").unwrap().value(i),
                Some(&Value::Scalar(1.0))
            );
        }
    }

    #[test]
    fn test_re_reference_unknown_channel() {
        let series = two_channel_series(3);
        assert!(re_reference(&series, "missing").is_err());
    }

    #[test]
    fn test_randomize_is_deterministic_per_seed() {
        let series = two_channel_series(20);
        let a = randomize_segments(&series, 4, 7).unwrap();
        let b = randomize_segments(&series, 4, 7).unwrap();
        let c = randomize_segments(&series, 4, 8).unwrap();

        assert_eq!(a.channels(), b.channels());
        assert_ne!(
            a.channel("a").unwrap().values(),
            c.channel("a").unwrap().values(),
            "different seeds should permute differently"
        );
    }

    #[test]
    fn test_randomize_preserves_value_multiset() {
        let series = two_channel_series(20);
        let out = randomize_segments(&series, 4, 3).unwrap();

        let mut original: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut shuffled: Vec<f64> = out
            .channel("a")
            .unwrap()
            .values()
            .iter()
            .map(|v| match v {
                Some(Value::Scalar(s)) => *s,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        original.sort_by(f64::total_cmp);
        shuffled.sort_by(f64::total_cmp);
        assert_eq!(original, shuffled);
    }

    #[test]
    fn test_randomize_flags_and_tail() {
        // 10 samples, segments of 4: the 2-sample tail stays in place.
        let series = two_channel_series(10);
        let out = randomize_segments(&series, 4, 11).unwrap();

        let a = out.channel("a").unwrap();
        assert_eq!(a.value(8), Some(&Value::Scalar(8.0)));
        assert_eq!(a.value(9), Some(&Value::Scalar(9.0)));
        for i in 0..10 {
            assert!(a.flags(i).contains(CorrectionFlag::Randomized));
        }
    }

    #[test]
    fn test_randomize_zero_segment_fails_fast() {
        let series = two_channel_series(4);
        assert!(matches!(
            randomize_segments(&series, 0, 1),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
