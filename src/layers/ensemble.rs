//! Parallel convolutional filters over one input, concatenated by channel.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::convolution::{ConvolutionLayer, Shape2};
use crate::core::QuantizedVector;
use crate::error::{BrainError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvolutionEnsemble {
    filters: Vec<ConvolutionLayer>,
}

impl ConvolutionEnsemble {
    /// All filters must declare the same input shape and produce the same
    /// pooled length.
    pub fn new(filters: Vec<ConvolutionLayer>) -> Result<Self> {
        let ensemble = Self { filters };
        ensemble.validate()?;
        Ok(ensemble)
    }

    pub fn random<R: Rng + ?Sized>(
        count: usize,
        kernel_rows: usize,
        kernel_cols: usize,
        input_shape: Shape2,
        rng: &mut R,
    ) -> Result<Self> {
        let filters = (0..count)
            .map(|_| ConvolutionLayer::random(kernel_rows, kernel_cols, input_shape, rng))
            .collect::<Result<Vec<_>>>()?;
        Self::new(filters)
    }

    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.filters.first() else {
            return Err(BrainError::shape("convolution ensemble", "at least one filter", 0));
        };
        for (i, filter) in self.filters.iter().enumerate() {
            filter.validate()?;
            if filter.input_shape() != first.input_shape()
                || filter.output_len() != first.output_len()
            {
                return Err(BrainError::shape(
                    format!("convolution ensemble filter {}", i),
                    format!("input {} pooled to {}", first.input_shape(), first.output_len()),
                    filter.input_shape().size(),
                ));
            }
        }
        Ok(())
    }

    pub fn filters(&self) -> &[ConvolutionLayer] {
        &self.filters
    }

    pub fn input_shape(&self) -> Shape2 {
        self.filters[0].input_shape()
    }

    /// `filters × pooled` entries.
    pub fn output_len(&self) -> usize {
        self.filters.len() * self.filters[0].output_len()
    }

    pub fn transform(&self, v: &QuantizedVector) -> Result<QuantizedVector> {
        let channels = self
            .filters
            .iter()
            .map(|f| f.transform(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(QuantizedVector::concat(&channels))
    }

    /// Every filter over every input, filters in parallel; outputs are
    /// re-assembled per input in input order.
    pub fn mass_transform(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        let per_filter = self
            .filters
            .par_iter()
            .map(|f| f.mass_transform(inputs))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..inputs.len())
            .map(|i| QuantizedVector::concat(per_filter.iter().map(|channel| &channel[i])))
            .collect())
    }

    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Self {
        Self {
            filters: self.filters.iter().map(|f| f.mutate(rate, rng)).collect(),
        }
    }
}
