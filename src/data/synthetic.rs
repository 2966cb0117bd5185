//! Seeded synthetic datasets of real-valued points.
//!
//! Every coordinate is drawn uniformly from `[0, SYNTHETIC_RANGE)`; labels
//! come from a caller-supplied function of the point.

use rand::Rng;

use super::training::{TrainingData, TrainingItem};
use crate::config::SYNTHETIC_RANGE;
use crate::core::RealVector;
use crate::error::{BrainError, Result};

/// `n` points of dimension `dims`, labelled by `labeler`.
pub fn labelled<R, L>(n: usize, dims: usize, rng: &mut R, mut labeler: L) -> Result<TrainingData>
where
    R: Rng + ?Sized,
    L: FnMut(&RealVector) -> usize,
{
    if dims == 0 {
        return Err(BrainError::InvalidConfig(
            "synthetic points need at least one dimension".into(),
        ));
    }
    let items = (0..n)
        .map(|_| {
            let point = RealVector::from_fn(dims, |_| rng.gen_range(0.0..SYNTHETIC_RANGE));
            let label = labeler(&point);
            TrainingItem::new(point, label)
        })
        .collect();
    TrainingData::new(items)
}

/// Label 0 inside the disc `x0² + x1² < threshold`, 1 outside.
pub fn squared_sum_threshold<R: Rng + ?Sized>(
    n: usize,
    dims: usize,
    threshold: f64,
    rng: &mut R,
) -> Result<TrainingData> {
    if dims < 2 {
        return Err(BrainError::InvalidConfig(format!(
            "squared-sum labels need two dimensions, got {}",
            dims
        )));
    }
    labelled(n, dims, rng, |p| {
        let s = p.as_slice();
        usize::from(s[0] * s[0] + s[1] * s[1] >= threshold)
    })
}

/// Label `floor(x0 / width)`.
pub fn first_component_bucket<R: Rng + ?Sized>(
    n: usize,
    dims: usize,
    width: f64,
    rng: &mut R,
) -> Result<TrainingData> {
    if width.is_nan() || width <= 0.0 {
        return Err(BrainError::InvalidConfig(format!(
            "bucket width must be positive, got {}",
            width
        )));
    }
    labelled(n, dims, rng, |p| (p.as_slice()[0] / width).floor() as usize)
}
