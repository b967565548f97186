//! Per-channel observation values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single observation on one channel: a scalar (audio amplitude, pitch,
/// intensity) or a fixed three-component vector (a spatial joint position).
///
/// Channels never mix arities; [`crate::Channel::new`] rejects columns that do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f64),
    Triple([f64; 3]),
}

impl Value {
    /// Number of components (1 or 3).
    pub fn components(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Triple(_) => 3,
        }
    }

    /// Components as a slice.
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Value::Scalar(v) => core::slice::from_ref(v),
            Value::Triple(v) => v,
        }
    }

    /// Rebuild a value of the same arity as `self` from components.
    ///
    /// Panics if `components` has fewer entries than `self` has components;
    /// callers obtain the slice from a value of matching arity.
    pub fn from_components(&self, components: &[f64]) -> Value {
        match self {
            Value::Scalar(_) => Value::Scalar(components[0]),
            Value::Triple(_) => Value::Triple([components[0], components[1], components[2]]),
        }
    }

    /// Euclidean distance to another value of the same arity.
    pub fn distance(&self, other: &Value) -> Result<f64> {
        let (a, b) = self.check_arity(other)?;
        let sum: f64 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum();
        Ok(sum.sqrt())
    }

    /// Euclidean norm (absolute value for scalars).
    pub fn norm(&self) -> f64 {
        let sum: f64 = self.as_slice().iter().map(|x| x * x).sum();
        sum.sqrt()
    }

    /// Linear blend: `self + t * (other - self)`, component-wise.
    pub fn lerp(&self, other: &Value, t: f64) -> Result<Value> {
        let (a, b) = self.check_arity(other)?;
        let blended: Vec<f64> = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| x + t * (y - x))
            .collect();
        Ok(self.from_components(&blended))
    }

    /// Component-wise difference `self - other`.
    pub fn sub(&self, other: &Value) -> Result<Value> {
        let (a, b) = self.check_arity(other)?;
        let diff: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
        Ok(self.from_components(&diff))
    }

    fn check_arity<'a>(&'a self, other: &'a Value) -> Result<(&'a [f64], &'a [f64])> {
        if self.components() != other.components() {
            return Err(Error::ArityMismatch {
                left: self.components(),
                right: other.components(),
            });
        }
        Ok((self.as_slice(), other.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_distance() {
        let a = Value::Scalar(2.0);
        let b = Value::Scalar(-1.0);
        assert_relative_eq!(a.distance(&b).unwrap(), 3.0);
    }

    #[test]
    fn test_triple_distance() {
        let a = Value::Triple([0.0, 0.0, 0.0]);
        let b = Value::Triple([3.0, 4.0, 0.0]);
        assert_relative_eq!(a.distance(&b).unwrap(), 5.0);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = Value::Triple([0.0, 10.0, -2.0]);
        let b = Value::Triple([4.0, 0.0, 2.0]);
        let mid = a.lerp(&b, 0.5).unwrap();
        assert_eq!(mid, Value::Triple([2.0, 5.0, 0.0]));
    }

    #[test]
    fn test_arity_mismatch() {
        let a = Value::Scalar(1.0);
        let b = Value::Triple([1.0, 2.0, 3.0]);
        assert!(matches!(
            a.distance(&b),
            Err(Error::ArityMismatch { left: 1, right: 3 })
        ));
    }
}
