//! Single convolutional filter followed by 2×2 max pooling.
//!
//! The input is a flat row-major `H × W` buffer. The kernel slides with
//! stride 1 over every valid position (no padding), each window is reduced
//! to one saturated, floored scalar, and the resulting
//! `(H - kh + 1) × (W - kw + 1)` grid is max-pooled in non-overlapping
//! 2×2 blocks. Trailing rows/columns that do not fill a block are dropped.

use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::POOL_SIZE;
use crate::core::{QuantizedMatrix, QuantizedVector};
use crate::error::{BrainError, Result};
use crate::kernels::int8_gemm_cpu::{floor_activation, saturate};

/// A 2D shape `(rows, cols)` for a flattened buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape2 {
    pub rows: usize,
    pub cols: usize,
}

impl Shape2 {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.rows * self.cols
    }
}

impl std::fmt::Display for Shape2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvolutionLayer {
    kernel: QuantizedMatrix,
    input_shape: Shape2,
}

impl ConvolutionLayer {
    /// Build a filter, checking the kernel fits the declared input shape.
    pub fn new(kernel: QuantizedMatrix, input_shape: Shape2) -> Result<Self> {
        let layer = Self {
            kernel,
            input_shape,
        };
        layer.validate()?;
        Ok(layer)
    }

    pub fn random<R: Rng + ?Sized>(
        kernel_rows: usize,
        kernel_cols: usize,
        input_shape: Shape2,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(
            QuantizedMatrix::random(kernel_rows, kernel_cols, rng)?,
            input_shape,
        )
    }

    /// Kernel must fit inside the input and leave at least one pooled cell.
    pub fn validate(&self) -> Result<()> {
        let (kh, kw) = (self.kernel.rows(), self.kernel.cols());
        let Shape2 { rows: h, cols: w } = self.input_shape;
        if kh == 0 || kw == 0 || kh > h || kw > w {
            return Err(BrainError::shape(
                format!("convolution kernel {}x{}", kh, kw),
                format!("kernel within input {}", self.input_shape),
                kh * kw,
            ));
        }
        let pooled = self.pooled_shape();
        if pooled.size() == 0 {
            return Err(BrainError::shape(
                format!("convolution over {}", self.input_shape),
                format!("conv grid of at least {0}x{0}", POOL_SIZE),
                self.grid_shape().size(),
            ));
        }
        Ok(())
    }

    pub fn kernel(&self) -> &QuantizedMatrix {
        &self.kernel
    }

    pub fn input_shape(&self) -> Shape2 {
        self.input_shape
    }

    /// Shape of the pre-pooling response grid.
    pub fn grid_shape(&self) -> Shape2 {
        Shape2::new(
            (self.input_shape.rows + 1).saturating_sub(self.kernel.rows()),
            (self.input_shape.cols + 1).saturating_sub(self.kernel.cols()),
        )
    }

    /// Shape after 2×2 pooling (truncating).
    pub fn pooled_shape(&self) -> Shape2 {
        let grid = self.grid_shape();
        Shape2::new(grid.rows / POOL_SIZE, grid.cols / POOL_SIZE)
    }

    pub fn output_len(&self) -> usize {
        self.pooled_shape().size()
    }

    pub fn transform(&self, v: &QuantizedVector) -> Result<QuantizedVector> {
        if v.len() != self.input_shape.size() {
            return Err(BrainError::shape(
                format!("convolution over {}", self.input_shape),
                self.input_shape.size().to_string(),
                v.len(),
            ));
        }
        let input = ArrayView2::from_shape(
            (self.input_shape.rows, self.input_shape.cols),
            v.as_slice(),
        )
        .map_err(|_| {
            BrainError::shape("convolution input", self.input_shape.size().to_string(), v.len())
        })?;

        let grid = self.respond(input);
        Ok(QuantizedVector::new(max_pool(grid.view())))
    }

    pub fn mass_transform(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        inputs.iter().map(|v| self.transform(v)).collect()
    }

    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Self {
        Self {
            kernel: self.kernel.mutated(rate, rng),
            input_shape: self.input_shape,
        }
    }

    /// Slide the kernel over every stride-1 window.
    fn respond(&self, input: ArrayView2<'_, i8>) -> Array2<i8> {
        let kernel = self.kernel.as_array();
        let grid = self.grid_shape();
        let responses: Vec<i8> = input
            .windows((kernel.nrows(), kernel.ncols()))
            .into_iter()
            .map(|window| {
                let acc: i64 = window
                    .iter()
                    .zip(kernel.iter())
                    .map(|(&x, &k)| x as i64 * k as i64)
                    .sum();
                floor_activation(saturate(acc))
            })
            .collect();
        // windows() yields exactly grid.rows * grid.cols views in row-major order.
        Array2::from_shape_vec((grid.rows, grid.cols), responses)
            .unwrap_or_else(|_| Array2::zeros((grid.rows, grid.cols)))
    }
}

/// Non-overlapping `POOL_SIZE × POOL_SIZE` max pooling, row-major output.
pub fn max_pool(grid: ArrayView2<'_, i8>) -> Vec<i8> {
    grid.exact_chunks((POOL_SIZE, POOL_SIZE))
        .into_iter()
        .map(|block| block.iter().copied().max().unwrap_or(0))
        .collect()
}
