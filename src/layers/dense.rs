//! Fully-connected layer: one weight matrix followed by the floor nonlinearity.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{QuantizedMatrix, QuantizedVector, RealVector};
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseLayer {
    axons: QuantizedMatrix,
}

impl DenseLayer {
    pub fn new(axons: QuantizedMatrix) -> Self {
        Self { axons }
    }

    /// Random layer mapping `inputs` activations to `outputs` neurons.
    pub fn random<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Result<Self> {
        Ok(Self::new(QuantizedMatrix::random(outputs, inputs, rng)?))
    }

    pub fn axons(&self) -> &QuantizedMatrix {
        &self.axons
    }

    pub fn output_len(&self, input_len: usize) -> Option<usize> {
        self.axons.output_len(input_len)
    }

    pub fn transform(&self, v: &QuantizedVector) -> Result<QuantizedVector> {
        Ok(self.axons.apply(v)?.floored())
    }

    /// Real input: project, normalise to unit length, rescale to int8, floor.
    pub fn transform_real(&self, v: &RealVector) -> Result<QuantizedVector> {
        Ok(self.axons.apply_real(v)?.quantize_unit().floored())
    }

    pub fn mass_transform(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        Ok(self
            .axons
            .apply_mass(inputs)?
            .into_iter()
            .map(|v| v.floored())
            .collect())
    }

    pub fn mass_transform_real(&self, inputs: &[RealVector]) -> Result<Vec<QuantizedVector>> {
        inputs.iter().map(|v| self.transform_real(v)).collect()
    }

    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Self {
        Self::new(self.axons.mutated(rate, rng))
    }
}
