//! Incremental construction of randomly initialised brains.

use rand::Rng;

use super::brain::Brain;
use crate::error::{BrainError, Result};
use crate::layers::{ConvolutionEnsemble, DenseLayer, Layer, Shape2};

/// MNIST image side.
pub const MNIST_SIDE: usize = 28;

#[derive(Clone, Debug)]
enum Stage {
    Convolutions {
        filters: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        shape: Shape2,
    },
    Dense {
        outputs: usize,
    },
}

/// Records the stages of a network, tracking the running width, and draws
/// random weights for all of them in [`BrainBuilder::build`].
#[derive(Clone, Debug)]
pub struct BrainBuilder {
    input_len: usize,
    stages: Vec<Stage>,
}

impl BrainBuilder {
    pub fn new(input_len: usize) -> Self {
        Self {
            input_len,
            stages: Vec::new(),
        }
    }

    /// A bank of `filters` convolutions of `kh × kw` over a `shape` input.
    pub fn convolutions(mut self, filters: usize, kh: usize, kw: usize, shape: Shape2) -> Self {
        self.stages.push(Stage::Convolutions {
            filters,
            kernel_rows: kh,
            kernel_cols: kw,
            shape,
        });
        self
    }

    pub fn dense(mut self, outputs: usize) -> Self {
        self.stages.push(Stage::Dense { outputs });
        self
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Brain> {
        let mut width = self.input_len;
        let mut layers: Vec<Layer> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let layer: Layer = match *stage {
                Stage::Convolutions {
                    filters,
                    kernel_rows,
                    kernel_cols,
                    shape,
                } => {
                    if shape.size() != width {
                        return Err(BrainError::shape(
                            format!("convolutions over {}", shape),
                            shape.size().to_string(),
                            width,
                        ));
                    }
                    ConvolutionEnsemble::random(filters, kernel_rows, kernel_cols, shape, rng)?
                        .into()
                }
                Stage::Dense { outputs } => DenseLayer::random(width, outputs, rng)?.into(),
            };
            width = layer.output_len(width).ok_or_else(|| {
                BrainError::shape(format!("{} stage", layer.kind()), "compatible width", width)
            })?;
            layers.push(layer);
        }
        Brain::new(layers)
    }
}

/// 10 filters of 5×5 over 28×28 images → 1440 → 400 → 100 → 10.
pub fn mnist_brain<R: Rng + ?Sized>(rng: &mut R) -> Result<Brain> {
    let side = Shape2::new(MNIST_SIDE, MNIST_SIDE);
    BrainBuilder::new(side.size())
        .convolutions(10, 5, 5, side)
        .dense(400)
        .dense(100)
        .dense(10)
        .build(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QuantizedVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_dense_stack() {
        let mut rng = StdRng::seed_from_u64(31);
        let brain = BrainBuilder::new(2).dense(16).dense(2).build(&mut rng).unwrap();
        assert_eq!(brain.depth(), 2);
        assert_eq!(brain.param_count(), 2 * 16 + 16 * 2);
        assert!(brain.accepts_real());
    }

    #[test]
    fn test_mnist_topology() {
        let mut rng = StdRng::seed_from_u64(32);
        let brain = mnist_brain(&mut rng).unwrap();
        let widths: Vec<_> = {
            let mut w = 784;
            brain
                .layers()
                .iter()
                .map(|l| {
                    w = l.output_len(w).unwrap();
                    w
                })
                .collect()
        };
        assert_eq!(widths, vec![1440, 400, 100, 10]);
        let out = brain.digest(&QuantizedVector::zeros(784)).unwrap();
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_convolution_width_checked() {
        let mut rng = StdRng::seed_from_u64(33);
        let res = BrainBuilder::new(100)
            .convolutions(2, 3, 3, Shape2::new(9, 9))
            .build(&mut rng);
        assert!(res.is_err());
    }
}
