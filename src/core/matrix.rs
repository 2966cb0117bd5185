//! Immutable int8 weight matrix ("axons") in row-major order.
//!
//! Logical shape: `[rows, cols]`. A vector is applied against whichever
//! dimension its length matches; the other dimension is the output size.
//! When both match (square matrix) the column orientation wins.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::vector::{QuantizedVector, RealVector};
use crate::error::{BrainError, Result};
use crate::kernels::int8_gemm_cpu;

/// Which side of the matrix an input vector is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Input length equals `rows`; output has `cols` entries.
    Columns,
    /// Input length equals `cols`; output has `rows` entries.
    Rows,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedMatrix {
    values: Array2<i8>,
}

impl QuantizedMatrix {
    /// Create from a flat row-major buffer.
    pub fn new(rows: usize, cols: usize, values: Vec<i8>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(BrainError::shape(
                "matrix construction",
                "non-empty rows and cols",
                rows * cols,
            ));
        }
        if values.len() != rows * cols {
            return Err(BrainError::shape(
                "matrix construction",
                format!("{} values for {}x{}", rows * cols, rows, cols),
                values.len(),
            ));
        }
        let values = Array2::from_shape_vec((rows, cols), values)
            .map_err(|_| BrainError::shape("matrix construction", "row-major buffer", rows * cols))?;
        Ok(Self { values })
    }

    /// Build from a per-position initialiser (position = `row * cols + col`).
    pub fn from_fn(rows: usize, cols: usize, f: impl FnMut(usize) -> i8) -> Result<Self> {
        Self::new(rows, cols, (0..rows * cols).map(f).collect())
    }

    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::new(rows, cols, vec![0; rows * cols])
    }

    /// Uniformly random weights over the full int8 range.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Self> {
        Self::from_fn(rows, cols, |_| rng.gen::<i8>())
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i8> {
        self.values.get((row, col)).copied()
    }

    pub fn as_array(&self) -> &Array2<i8> {
        &self.values
    }

    /// Row-major storage.
    pub fn as_slice(&self) -> &[i8] {
        self.values
            .as_slice()
            .expect("QuantizedMatrix storage is row-major contiguous")
    }

    /// Orientation used for an input of length `len`, if any.
    pub fn orientation(&self, len: usize) -> Option<Orientation> {
        if len == self.rows() {
            Some(Orientation::Columns)
        } else if len == self.cols() {
            Some(Orientation::Rows)
        } else {
            None
        }
    }

    /// Output length for an input of length `len`, if compatible.
    pub fn output_len(&self, len: usize) -> Option<usize> {
        self.orientation(len).map(|o| match o {
            Orientation::Columns => self.cols(),
            Orientation::Rows => self.rows(),
        })
    }

    fn require(&self, len: usize, context: &str) -> Result<Orientation> {
        self.orientation(len).ok_or_else(|| {
            BrainError::shape(
                context,
                format!("{} or {}", self.rows(), self.cols()),
                len,
            )
        })
    }

    /// Saturating matrix-vector product.
    pub fn apply(&self, v: &QuantizedVector) -> Result<QuantizedVector> {
        let (rows, cols, w) = (self.rows(), self.cols(), self.as_slice());
        let out = match self.require(v.len(), "matrix apply")? {
            Orientation::Columns => int8_gemm_cpu::matvec_cols(w, rows, cols, v.as_slice()),
            Orientation::Rows => int8_gemm_cpu::matvec_rows(w, rows, cols, v.as_slice()),
        };
        Ok(QuantizedVector::new(out))
    }

    /// Apply to many inputs with one pass over the weights.
    ///
    /// All inputs must share a length; results are in input order.
    pub fn apply_mass(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        let Some(first) = inputs.first() else {
            return Ok(Vec::new());
        };
        let orientation = self.require(first.len(), "matrix mass apply")?;
        if let Some(bad) = inputs.iter().find(|v| v.len() != first.len()) {
            return Err(BrainError::shape(
                "matrix mass apply",
                first.len().to_string(),
                bad.len(),
            ));
        }

        let refs: Vec<&[i8]> = inputs.iter().map(|v| v.as_slice()).collect();
        let (rows, cols, w) = (self.rows(), self.cols(), self.as_slice());
        let out = match orientation {
            Orientation::Columns => int8_gemm_cpu::mass_matvec_cols(w, rows, cols, &refs),
            Orientation::Rows => int8_gemm_cpu::mass_matvec_rows(w, rows, cols, &refs),
        };
        Ok(out.into_iter().map(QuantizedVector::new).collect())
    }

    /// Un-quantized product used by the input layer.
    pub fn apply_real(&self, v: &RealVector) -> Result<RealVector> {
        let (rows, cols, w) = (self.rows(), self.cols(), self.as_slice());
        let out = match self.require(v.len(), "matrix real apply")? {
            Orientation::Columns => int8_gemm_cpu::real_matvec_cols(w, rows, cols, v.as_slice()),
            Orientation::Rows => int8_gemm_cpu::real_matvec_rows(w, rows, cols, v.as_slice()),
        };
        Ok(RealVector::new(out))
    }

    /// Replace each weight with a fresh random value with probability `rate`.
    ///
    /// `rate` is clamped into `[0, 1]`; NaN counts as zero.
    pub fn mutated<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Self {
        let rate = clamp_rate(rate);
        if rate == 0.0 {
            return self.clone();
        }
        let values = self.values.mapv(|w| {
            if rng.gen_bool(rate) {
                rng.gen::<i8>()
            } else {
                w
            }
        });
        Self { values }
    }
}

/// Clamp a mutation rate into `[0, 1]`.
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn m(rows: usize, cols: usize, values: &[i8]) -> QuantizedMatrix {
        QuantizedMatrix::new(rows, cols, values.to_vec()).unwrap()
    }

    #[test]
    fn test_rejects_bad_buffer() {
        assert!(QuantizedMatrix::new(2, 3, vec![0; 5]).is_err());
        assert!(QuantizedMatrix::new(0, 3, vec![]).is_err());
    }

    #[test]
    fn test_apply_matches_cols() {
        let w = m(2, 3, &[1, 2, 3, 4, 5, 6]);
        let out = w.apply(&QuantizedVector::new(vec![1, 2, 3])).unwrap();
        assert_eq!(out.to_vec(), vec![14, 32]);
    }

    #[test]
    fn test_apply_matches_rows() {
        let w = m(2, 3, &[1, 2, 3, 4, 5, 6]);
        let out = w.apply(&QuantizedVector::new(vec![1, 1])).unwrap();
        assert_eq!(out.to_vec(), vec![5, 7, 9]);
    }

    #[test]
    fn test_square_prefers_columns() {
        let w = m(2, 2, &[1, 2, 3, 4]);
        let out = w.apply(&QuantizedVector::new(vec![1, 0])).unwrap();
        // Column orientation: [x·col0, x·col1] = [1, 2].
        assert_eq!(out.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_apply_shape_mismatch() {
        let w = m(2, 3, &[1, 2, 3, 4, 5, 6]);
        let err = w.apply(&QuantizedVector::new(vec![1; 4])).unwrap_err();
        assert!(matches!(err, BrainError::ShapeMismatch { actual: 4, .. }));
    }

    #[test]
    fn test_apply_saturates() {
        let w = m(1, 3, &[127, 127, 127]);
        let out = w.apply(&QuantizedVector::new(vec![127, 127, 127])).unwrap();
        assert_eq!(out.to_vec(), vec![127]);
        let out = w.apply(&QuantizedVector::new(vec![-128, -128, -128])).unwrap();
        assert_eq!(out.to_vec(), vec![-128]);
    }

    #[test]
    fn test_apply_mass_matches_apply() {
        let w = m(3, 2, &[5, -3, 2, 9, -7, 1]);
        let inputs = vec![
            QuantizedVector::new(vec![1, 2]),
            QuantizedVector::new(vec![-100, 50]),
            QuantizedVector::new(vec![0, 0]),
        ];
        let mass = w.apply_mass(&inputs).unwrap();
        assert_eq!(mass.len(), 3);
        for (x, y) in inputs.iter().zip(&mass) {
            assert_eq!(&w.apply(x).unwrap(), y);
        }
    }

    #[test]
    fn test_apply_mass_rejects_mixed_lengths() {
        let w = m(3, 2, &[5, -3, 2, 9, -7, 1]);
        let inputs = vec![QuantizedVector::new(vec![1, 2]), QuantizedVector::new(vec![1, 2, 3])];
        assert!(w.apply_mass(&inputs).is_err());
    }

    #[test]
    fn test_apply_real() {
        let w = m(2, 2, &[1, 2, 3, 4]);
        let out = w.apply_real(&RealVector::new(vec![0.5, 1.0])).unwrap();
        assert_eq!(out.as_slice(), &[3.5, 5.0]);
    }

    #[test]
    fn test_mutate_zero_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = QuantizedMatrix::random(8, 8, &mut rng).unwrap();
        assert_eq!(w.mutated(0.0, &mut rng), w);
        assert_eq!(w.mutated(-3.0, &mut rng), w);
        assert_eq!(w.mutated(f64::NAN, &mut rng), w);
    }

    #[test]
    fn test_mutate_one_replaces_nearly_everything() {
        let mut rng = StdRng::seed_from_u64(2);
        let w = QuantizedMatrix::random(40, 50, &mut rng).unwrap();
        let mutated = w.mutated(1.0, &mut rng);
        let changed = w
            .as_slice()
            .iter()
            .zip(mutated.as_slice())
            .filter(|(a, b)| a != b)
            .count();
        // Expected 2000 * 255/256 ≈ 1992.
        assert!(changed > 1950, "only {} of 2000 changed", changed);
    }

    #[test]
    fn test_mutate_leaves_source_untouched() {
        let mut rng = StdRng::seed_from_u64(3);
        let w = QuantizedMatrix::random(4, 4, &mut rng).unwrap();
        let before = w.clone();
        let _ = w.mutated(0.5, &mut rng);
        assert_eq!(w, before);
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(2.0), 1.0);
        assert_eq!(clamp_rate(-0.1), 0.0);
        assert_eq!(clamp_rate(0.25), 0.25);
    }
}
