//! Quantized (int8) and real-valued vectors.
//!
//! Both are immutable once built: every operation returns a new vector.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::QUANT_SCALE;
use crate::error::{BrainError, Result};
use crate::kernels::int8_gemm_cpu::{dot_saturating, floor_activation};

/// Fixed-length sequence of signed 8-bit activations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedVector {
    values: Array1<i8>,
}

impl QuantizedVector {
    pub fn new(values: Vec<i8>) -> Self {
        Self {
            values: Array1::from_vec(values),
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            values: Array1::zeros(len),
        }
    }

    /// Build from a length and a per-index initialiser.
    pub fn from_fn(len: usize, f: impl FnMut(usize) -> i8) -> Self {
        Self::new((0..len).map(f).collect())
    }

    /// Quantize raw bytes (0..=255) into the non-negative half of the int8 range.
    pub fn from_unsigned(bytes: &[u8]) -> Self {
        Self::new(bytes.iter().map(|&b| (b >> 1) as i8).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<i8> {
        self.values.get(i).copied()
    }

    pub fn as_slice(&self) -> &[i8] {
        // Built from a Vec, so always contiguous.
        self.values
            .as_slice()
            .expect("QuantizedVector storage is contiguous")
    }

    pub fn as_array(&self) -> &Array1<i8> {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = i8> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<i8> {
        self.values.to_vec()
    }

    /// Largest element, or `None` for an empty vector.
    pub fn max(&self) -> Option<i8> {
        self.values.iter().copied().max()
    }

    /// Smallest element, or `None` for an empty vector.
    pub fn min(&self) -> Option<i8> {
        self.values.iter().copied().min()
    }

    /// Sum of squares in a wide accumulator.
    pub fn squared_norm(&self) -> i64 {
        self.values.iter().map(|&v| (v as i64) * (v as i64)).sum()
    }

    /// Saturating dot product with another vector of the same length.
    pub fn dot(&self, other: &QuantizedVector) -> Result<i8> {
        if self.len() != other.len() {
            return Err(BrainError::shape(
                "vector dot",
                self.len().to_string(),
                other.len(),
            ));
        }
        Ok(dot_saturating(self.as_slice(), other.as_slice()))
    }

    /// Clamp every non-positive activation to zero.
    pub fn floored(&self) -> Self {
        Self {
            values: self.values.mapv(floor_activation),
        }
    }

    /// Concatenate several vectors in order.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a QuantizedVector>) -> Self {
        let mut out = Vec::new();
        for p in parts {
            out.extend_from_slice(p.as_slice());
        }
        Self::new(out)
    }
}

impl From<Vec<i8>> for QuantizedVector {
    fn from(values: Vec<i8>) -> Self {
        Self::new(values)
    }
}

/// Fixed-length sequence of f64 used as raw, pre-quantization input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealVector {
    values: Array1<f64>,
}

impl RealVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: Array1::from_vec(values),
        }
    }

    pub fn from_fn(len: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self::new((0..len).map(f).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        self.values
            .as_slice()
            .expect("RealVector storage is contiguous")
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.values.dot(&self.values).sqrt()
    }

    /// Dot product with another real vector.
    pub fn dot(&self, other: &RealVector) -> Result<f64> {
        if self.len() != other.len() {
            return Err(BrainError::shape(
                "real vector dot",
                self.len().to_string(),
                other.len(),
            ));
        }
        Ok(self.values.dot(&other.values))
    }

    /// Normalise to unit length and rescale into the int8 range.
    ///
    /// A zero (or non-finite) norm yields an all-zero vector.
    pub fn quantize_unit(&self) -> QuantizedVector {
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            return QuantizedVector::zeros(self.len());
        }
        QuantizedVector::new(
            self.values
                .iter()
                .map(|&v| ((v / norm) * QUANT_SCALE) as i8)
                .collect(),
        )
    }
}

impl From<Vec<f64>> for RealVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}
