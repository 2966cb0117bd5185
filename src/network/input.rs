//! Network inputs: a single sample or a homogeneous batch of samples.

use serde::{Deserialize, Serialize};

use crate::core::{QuantizedVector, RealVector};
use crate::error::{BrainError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Sample {
    Quantized(QuantizedVector),
    Real(RealVector),
}

impl Sample {
    pub fn len(&self) -> usize {
        match self {
            Sample::Quantized(v) => v.len(),
            Sample::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Sample::Real(_))
    }
}

impl From<QuantizedVector> for Sample {
    fn from(v: QuantizedVector) -> Self {
        Sample::Quantized(v)
    }
}

impl From<RealVector> for Sample {
    fn from(v: RealVector) -> Self {
        Sample::Real(v)
    }
}

/// A batch where every sample has the same element type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SampleBatch {
    Quantized(Vec<QuantizedVector>),
    Real(Vec<RealVector>),
}

impl SampleBatch {
    /// Split samples into a homogeneous batch. An empty input yields an
    /// empty quantized batch.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Result<Self> {
        let mut samples = samples.into_iter().peekable();
        let real = matches!(samples.peek(), Some(Sample::Real(_)));
        if real {
            samples
                .map(|s| match s {
                    Sample::Real(v) => Ok(v),
                    Sample::Quantized(_) => Err(mixed()),
                })
                .collect::<Result<Vec<_>>>()
                .map(SampleBatch::Real)
        } else {
            samples
                .map(|s| match s {
                    Sample::Quantized(v) => Ok(v),
                    Sample::Real(_) => Err(mixed()),
                })
                .collect::<Result<Vec<_>>>()
                .map(SampleBatch::Quantized)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBatch::Quantized(v) => v.len(),
            SampleBatch::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_real(&self) -> bool {
        matches!(self, SampleBatch::Real(_))
    }

    pub fn get(&self, i: usize) -> Option<Sample> {
        match self {
            SampleBatch::Quantized(v) => v.get(i).cloned().map(Sample::Quantized),
            SampleBatch::Real(v) => v.get(i).cloned().map(Sample::Real),
        }
    }

    /// Contiguous sub-batch `[start, start + len)`, clipped to the batch.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        fn clip<T: Clone>(v: &[T], start: usize, len: usize) -> Vec<T> {
            let start = start.min(v.len());
            let end = start.saturating_add(len).min(v.len());
            v[start..end].to_vec()
        }
        match self {
            SampleBatch::Quantized(v) => SampleBatch::Quantized(clip(v, start, len)),
            SampleBatch::Real(v) => SampleBatch::Real(clip(v, start, len)),
        }
    }
}

fn mixed() -> BrainError {
    BrainError::UnsupportedElementType("batch mixes real and quantized samples".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous_batches() {
        let batch = SampleBatch::from_samples(vec![
            Sample::Real(RealVector::new(vec![1.0])),
            Sample::Real(RealVector::new(vec![2.0])),
        ])
        .unwrap();
        assert!(batch.is_real());
        assert_eq!(batch.len(), 2);

        let empty = SampleBatch::from_samples(Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.is_real());
    }

    #[test]
    fn test_mixed_batch_rejected() {
        let err = SampleBatch::from_samples(vec![
            Sample::Quantized(QuantizedVector::new(vec![1])),
            Sample::Real(RealVector::new(vec![2.0])),
        ])
        .unwrap_err();
        assert!(matches!(err, BrainError::UnsupportedElementType(_)));
    }

    #[test]
    fn test_slice_clips() {
        let batch = SampleBatch::Quantized((0..5).map(|i| QuantizedVector::new(vec![i])).collect());
        assert_eq!(batch.slice(3, 10).len(), 2);
        assert_eq!(batch.slice(9, 2).len(), 0);
        assert_eq!(batch.get(4), Some(Sample::Quantized(QuantizedVector::new(vec![4]))));
    }
}
