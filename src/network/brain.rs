//! The Brain: an ordered, immutable pipeline of layers.
//!
//! The first layer sees either real or quantized input; every later layer
//! consumes the previous layer's quantized output. Construction checks that
//! consecutive widths line up, so a constructed brain never fails a forward
//! pass on inputs of the width it was built for.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::input::{Sample, SampleBatch};
use crate::core::{QuantizedVector, RealVector};
use crate::error::{BrainError, Result};
use crate::layers::Layer;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Layer>", into = "Vec<Layer>")]
pub struct Brain {
    layers: Vec<Layer>,
}

impl Brain {
    /// Validate each layer and the chain between them.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(BrainError::shape("brain", "at least one layer", 0));
        }
        for layer in &layers {
            layer.validate()?;
        }
        check_chain(&layers)?;
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(Layer::param_count).sum()
    }

    /// Whether the first layer accepts real-valued input.
    pub fn accepts_real(&self) -> bool {
        self.layers[0].accepts_real()
    }

    pub fn digest(&self, input: &QuantizedVector) -> Result<QuantizedVector> {
        let first = self.layers[0].transform(input)?;
        self.fold(first)
    }

    pub fn digest_real(&self, input: &RealVector) -> Result<QuantizedVector> {
        let first = self.layers[0].transform_real(input)?;
        self.fold(first)
    }

    pub fn digest_sample(&self, input: &Sample) -> Result<QuantizedVector> {
        match input {
            Sample::Quantized(v) => self.digest(v),
            Sample::Real(v) => self.digest_real(v),
        }
    }

    pub fn mass_digest(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        let first = self.layers[0].mass_transform(inputs)?;
        self.fold_mass(first)
    }

    pub fn mass_digest_real(&self, inputs: &[RealVector]) -> Result<Vec<QuantizedVector>> {
        let first = self.layers[0].mass_transform_real(inputs)?;
        self.fold_mass(first)
    }

    pub fn mass_digest_batch(&self, batch: &SampleBatch) -> Result<Vec<QuantizedVector>> {
        match batch {
            SampleBatch::Quantized(v) => self.mass_digest(v),
            SampleBatch::Real(v) => self.mass_digest_real(v),
        }
    }

    /// Mutate every layer independently at the same rate.
    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Brain {
        Brain {
            layers: self.layers.iter().map(|l| l.mutate(rate, rng)).collect(),
        }
    }

    /// Serialise to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Brain serialisation should not fail")
    }

    /// Deserialise from bytes; stored shapes are re-validated.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn fold(&self, first: QuantizedVector) -> Result<QuantizedVector> {
        self.layers[1..]
            .iter()
            .try_fold(first, |acc, layer| layer.transform(&acc))
    }

    fn fold_mass(&self, first: Vec<QuantizedVector>) -> Result<Vec<QuantizedVector>> {
        self.layers[1..]
            .iter()
            .try_fold(first, |acc, layer| layer.mass_transform(&acc))
    }
}

impl TryFrom<Vec<Layer>> for Brain {
    type Error = BrainError;

    fn try_from(layers: Vec<Layer>) -> Result<Self> {
        Brain::new(layers)
    }
}

impl From<Brain> for Vec<Layer> {
    fn from(brain: Brain) -> Self {
        brain.layers
    }
}

/// A dense matrix accepts either of its dimensions, so the set of possible
/// widths is carried forward; every later layer must accept one of them.
fn check_chain(layers: &[Layer]) -> Result<()> {
    let mut widths = first_widths(&layers[0]);
    for (i, layer) in layers.iter().enumerate().skip(1) {
        let mut next: Vec<usize> = widths.iter().filter_map(|&w| layer.output_len(w)).collect();
        next.sort_unstable();
        next.dedup();
        if next.is_empty() {
            return Err(BrainError::shape(
                format!("layer {} ({})", i, layer.kind()),
                format!("input width compatible with {:?}", widths),
                widths.first().copied().unwrap_or(0),
            ));
        }
        widths = next;
    }
    Ok(())
}

fn first_widths(layer: &Layer) -> Vec<usize> {
    match layer {
        Layer::Dense(d) => {
            let (rows, cols) = (d.axons().rows(), d.axons().cols());
            let mut widths = vec![rows, cols];
            widths.dedup();
            widths
        }
        Layer::Convolution(c) => vec![c.output_len()],
        Layer::Ensemble(e) => vec![e.output_len()],
    }
}
