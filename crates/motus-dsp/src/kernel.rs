//! Interpolation kernels.
//!
//! Every kernel fits over a local set of strictly increasing knots and
//! evaluates at arbitrary positions inside the knot range. The resampler
//! fits one kernel per window; the jitter corrector fits tiny kernels
//! spanning an anchor and its return sample.

use crate::{Error, Result};

/// Interpolation kernel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationKernel {
    /// Piecewise linear between neighboring knots.
    #[default]
    Linear,
    /// Natural cubic spline (zero second derivative at the ends).
    CubicSpline,
    /// Monotone cubic (Fritsch-Carlson); no overshoot between knots.
    Pchip,
    /// Akima's smooth blend; resists ringing near outliers.
    Akima,
}

impl InterpolationKernel {
    /// Minimum number of knots the kernel needs.
    pub fn min_support(&self) -> usize {
        match self {
            InterpolationKernel::Linear => 2,
            InterpolationKernel::CubicSpline => 3,
            InterpolationKernel::Pchip => 2,
            InterpolationKernel::Akima => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InterpolationKernel::Linear => "linear",
            InterpolationKernel::CubicSpline => "cubic-spline",
            InterpolationKernel::Pchip => "pchip",
            InterpolationKernel::Akima => "akima",
        }
    }
}

/// A kernel fitted to one set of knots, ready to evaluate.
#[derive(Debug, Clone)]
pub enum Fitted {
    Linear {
        xs: Vec<f64>,
        ys: Vec<f64>,
    },
    /// Cubic Hermite form: per-knot slopes (Pchip and Akima).
    Hermite {
        xs: Vec<f64>,
        ys: Vec<f64>,
        slopes: Vec<f64>,
    },
    /// Natural cubic spline: per-knot second derivatives.
    Spline {
        xs: Vec<f64>,
        ys: Vec<f64>,
        second: Vec<f64>,
    },
}

/// Fit `kernel` over knots `(xs, ys)`.
///
/// `xs` must be strictly increasing (the caller takes them from a validated
/// timestamp axis). Fails with [`Error::InsufficientData`] below the kernel's
/// minimum support; the caller decides whether to fall back to linear.
pub fn fit(kernel: InterpolationKernel, xs: &[f64], ys: &[f64]) -> Result<Fitted> {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert!(xs.windows(2).all(|w| w[0] < w[1]));

    if xs.len() < kernel.min_support() {
        return Err(Error::InsufficientData {
            reason: "fewer knots than the kernel's minimum support",
            points: xs.len(),
        });
    }

    let fitted = match kernel {
        InterpolationKernel::Linear => Fitted::Linear {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        },
        InterpolationKernel::CubicSpline => Fitted::Spline {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second: natural_spline_second_derivatives(xs, ys),
        },
        InterpolationKernel::Pchip => Fitted::Hermite {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes: pchip_slopes(xs, ys),
        },
        InterpolationKernel::Akima => Fitted::Hermite {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes: akima_slopes(xs, ys),
        },
    };
    Ok(fitted)
}

impl Fitted {
    /// Evaluate at `x`. Positions outside the knot range clamp to the end
    /// segments; the resampler only queries inside the range.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Fitted::Linear { xs, ys } => {
                let i = segment(xs, x);
                let h = xs[i + 1] - xs[i];
                let t = (x - xs[i]) / h;
                ys[i] + t * (ys[i + 1] - ys[i])
            }
            Fitted::Hermite { xs, ys, slopes } => {
                let i = segment(xs, x);
                let h = xs[i + 1] - xs[i];
                let t = (x - xs[i]) / h;
                let t2 = t * t;
                let t3 = t2 * t;
                let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
                let h10 = t3 - 2.0 * t2 + t;
                let h01 = -2.0 * t3 + 3.0 * t2;
                let h11 = t3 - t2;
                h00 * ys[i] + h10 * h * slopes[i] + h01 * ys[i + 1] + h11 * h * slopes[i + 1]
            }
            Fitted::Spline { xs, ys, second } => {
                let i = segment(xs, x);
                let h = xs[i + 1] - xs[i];
                let a = (xs[i + 1] - x) / h;
                let b = (x - xs[i]) / h;
                a * ys[i]
                    + b * ys[i + 1]
                    + ((a * a * a - a) * second[i] + (b * b * b - b) * second[i + 1]) * h * h / 6.0
            }
        }
    }
}

/// Index of the segment containing `x` (clamped to valid segments).
fn segment(xs: &[f64], x: f64) -> usize {
    let upper = xs.partition_point(|&knot| knot <= x);
    upper.saturating_sub(1).min(xs.len() - 2)
}

/// Second derivatives of the natural cubic spline (Thomas algorithm).
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut second = vec![0.0; n];
    if n < 3 {
        return second;
    }

    // Tridiagonal system over interior knots; natural ends stay zero.
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    let mut upper = vec![0.0; n];

    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        diag[i] = 2.0 * (h0 + h1);
        upper[i] = h1;
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }

    // Forward elimination.
    for i in 2..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let factor = h0 / diag[i - 1];
        diag[i] -= factor * upper[i - 1];
        rhs[i] -= factor * rhs[i - 1];
    }

    // Back substitution.
    for i in (1..n - 1).rev() {
        second[i] = (rhs[i] - upper[i] * second[i + 1]) / diag[i];
    }
    second
}

/// Monotone slopes after Fritsch-Carlson.
fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n == 2 {
        let d = (ys[1] - ys[0]) / (xs[1] - xs[0]);
        return vec![d, d];
    }

    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = ys
        .windows(2)
        .zip(h.iter())
        .map(|(w, &dx)| (w[1] - w[0]) / dx)
        .collect();

    let mut slopes = vec![0.0; n];
    for i in 1..n - 1 {
        if delta[i - 1] * delta[i] <= 0.0 {
            slopes[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            slopes[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }
    slopes[0] = endpoint_slope(h[0], h[1], delta[0], delta[1]);
    slopes[n - 1] = endpoint_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    slopes
}

/// One-sided three-point endpoint slope with monotonicity clamping.
fn endpoint_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let slope = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if slope * d0 <= 0.0 {
        0.0
    } else if d0 * d1 < 0.0 && slope.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        slope
    }
}

/// Akima slopes with quadratic extrapolation of the boundary differences.
fn akima_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let inner: Vec<f64> = ys
        .windows(2)
        .zip(xs.windows(2))
        .map(|(yw, xw)| (yw[1] - yw[0]) / (xw[1] - xw[0]))
        .collect();

    // Differences padded by two on each side.
    let mut d = Vec::with_capacity(inner.len() + 4);
    d.push(0.0);
    d.push(0.0);
    d.extend_from_slice(&inner);
    d.push(0.0);
    d.push(0.0);
    d[1] = 2.0 * d[2] - d[3];
    d[0] = 2.0 * d[1] - d[2];
    let m = d.len();
    d[m - 2] = 2.0 * d[m - 3] - d[m - 4];
    d[m - 1] = 2.0 * d[m - 2] - d[m - 3];

    let mut slopes = vec![0.0; n];
    for i in 0..n {
        // Knot i sits between padded differences d[i+1] and d[i+2].
        let w1 = (d[i + 3] - d[i + 2]).abs();
        let w2 = (d[i + 1] - d[i]).abs();
        slopes[i] = if w1 + w2 > f64::EPSILON {
            (w1 * d[i + 1] + w2 * d[i + 2]) / (w1 + w2)
        } else {
            0.5 * (d[i + 1] + d[i + 2])
        };
    }
    slopes
}
