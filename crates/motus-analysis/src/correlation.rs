//! Normalized cross-correlation of an excerpt against a longer reference.
//!
//! The numerator is computed in the frequency domain (forward FFT of both
//! signals, conjugate multiply, inverse FFT), the denominator from prefix
//! sums of the squared reference, so scoring all lags costs
//! O((n + m) log(n + m)) instead of O(n * m).

use crate::{Error, Result};
use rustfft::{num_complex::Complex, FftPlanner};

/// Scores below this energy are treated as silence rather than divided
/// through.
const ENERGY_FLOOR: f64 = 1e-12;

/// Score `excerpt` against every non-negative lag of `reference`.
///
/// Returns one normalized score per lag, `reference.len() - excerpt.len()
/// + 1` in total, each in `[-1, 1]`. A lag whose reference window carries
/// no energy scores 0 instead of dividing by it.
pub fn cross_correlate(reference: &[f64], excerpt: &[f64]) -> Result<Vec<f64>> {
    let n = reference.len();
    let m = excerpt.len();
    if m == 0 {
        return Err(Error::DegenerateSignal {
            reason: "excerpt is empty",
        });
    }
    if m > n {
        return Err(Error::ExcerptLongerThanReference {
            reference: n,
            excerpt: m,
        });
    }

    let excerpt_energy: f64 = excerpt.iter().map(|&v| v * v).sum();
    if excerpt_energy <= ENERGY_FLOOR {
        return Err(Error::DegenerateSignal {
            reason: "excerpt carries no energy",
        });
    }
    let excerpt_norm = excerpt_energy.sqrt();

    // Zero-pad past n + m so the circular correlation is linear over the
    // lags we read back.
    let fft_size = (n + m).next_power_of_two();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let mut ref_fft: Vec<Complex<f64>> = reference
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_size)
        .collect();
    let mut exc_fft: Vec<Complex<f64>> = excerpt
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_size)
        .collect();

    fft.process(&mut ref_fft);
    fft.process(&mut exc_fft);

    let mut cross: Vec<Complex<f64>> = ref_fft
        .iter()
        .zip(exc_fft.iter())
        .map(|(r, e)| r * e.conj())
        .collect();
    ifft.process(&mut cross);

    // rustfft leaves the inverse unnormalized.
    let scale = 1.0 / fft_size as f64;

    // Sliding reference-window energy from prefix sums.
    let mut prefix = vec![0.0f64; n + 1];
    for (i, &v) in reference.iter().enumerate() {
        prefix[i + 1] = prefix[i] + v * v;
    }

    let mut scores = Vec::with_capacity(n - m + 1);
    for lag in 0..=n - m {
        let window_energy = prefix[lag + m] - prefix[lag];
        if window_energy <= ENERGY_FLOOR {
            scores.push(0.0);
            continue;
        }
        let numerator = cross[lag].re * scale;
        let score = numerator / (window_energy.sqrt() * excerpt_norm);
        scores.push(score.clamp(-1.0, 1.0));
    }
    Ok(scores)
}

/// Index and value of the largest score, or `None` for an empty slice.
pub fn peak(scores: &[f64]) -> Option<(usize, f64)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tone(len: usize, freq: f64, rate: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn test_identical_signals_score_one_at_lag_zero() {
        let signal = tone(256, 10.0, 100.0);
        let scores = cross_correlate(&signal, &signal).unwrap();

        assert_eq!(scores.len(), 1);
        assert_relative_eq!(scores[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_embedded_excerpt_peaks_at_its_offset() {
        let reference = tone(1000, 7.0, 100.0);
        let excerpt = reference[300..450].to_vec();

        let scores = cross_correlate(&reference, &excerpt).unwrap();
        let (lag, value) = peak(&scores).unwrap();

        // A periodic tone repeats, so accept any peak one period apart
        // from the true offset as long as the true lag itself is near 1.
        assert_relative_eq!(scores[300], 1.0, epsilon = 1e-9);
        assert!(value >= scores[300] - 1e-9, "peak at lag {} below true offset", lag);
    }

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

    #[test]
    fn test_shifted_noise_recovers_exact_lag() {
        // Aperiodic signal: the peak is unambiguous.
        let reference = pseudo_noise(500, 42);
        let excerpt = reference[123..223].to_vec();

        let scores = cross_correlate(&reference, &excerpt).unwrap();
        let (lag, value) = peak(&scores).unwrap();

        assert_eq!(lag, 123);
        assert_relative_eq!(value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_silent_reference_window_scores_zero() {
        let mut reference = vec![0.0; 300];
        for (i, v) in reference.iter_mut().enumerate().skip(200) {
            *v = ((i % 17) as f64) - 8.0;
        }
        let excerpt: Vec<f64> = (0..50).map(|i| ((i % 13) as f64) - 6.0).collect();

        let scores = cross_correlate(&reference, &excerpt).unwrap();
        assert_eq!(scores[0], 0.0, "all-zero window must not divide by zero");
    }

    #[test]
    fn test_empty_and_silent_excerpts_are_rejected() {
        let reference = tone(100, 5.0, 100.0);
        assert!(matches!(
            cross_correlate(&reference, &[]),
            Err(Error::DegenerateSignal { .. })
        ));
        assert!(matches!(
            cross_correlate(&reference, &[0.0; 10]),
            Err(Error::DegenerateSignal { .. })
        ));
    }

    #[test]
    fn test_excerpt_longer_than_reference_is_rejected() {
        let reference = tone(50, 5.0, 100.0);
        let excerpt = tone(51, 5.0, 100.0);
        assert!(matches!(
            cross_correlate(&reference, &excerpt),
            Err(Error::ExcerptLongerThanReference { reference: 50, excerpt: 51 })
        ));
    }

    #[test]
    fn test_scores_stay_normalized() {
        let reference: Vec<f64> = (0..400)
            .map(|i| 50.0 * ((i * 29) % 97) as f64 - 2000.0)
            .collect();
        let excerpt = reference[40..140].to_vec();

        let scores = cross_correlate(&reference, &excerpt).unwrap();
        for (lag, &s) in scores.iter().enumerate() {
            assert!((-1.0..=1.0).contains(&s), "score {} out of range at lag {}", s, lag);
        }
    }
}
