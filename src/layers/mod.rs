//! Layer module: the forward transforms a brain is built from.
//!
//! Every variant maps a quantized vector to a quantized vector. Only the
//! dense variant also accepts real-valued input, which it normalises and
//! quantizes on the way through.

pub mod convolution;
pub mod dense;
pub mod ensemble;

pub use convolution::{ConvolutionLayer, Shape2};
pub use dense::DenseLayer;
pub use ensemble::ConvolutionEnsemble;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{QuantizedVector, RealVector};
use crate::error::{BrainError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Dense(DenseLayer),
    Convolution(ConvolutionLayer),
    Ensemble(ConvolutionEnsemble),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Dense(_) => "dense",
            Layer::Convolution(_) => "convolution",
            Layer::Ensemble(_) => "convolution ensemble",
        }
    }

    /// Whether `transform_real` is supported.
    pub fn accepts_real(&self) -> bool {
        matches!(self, Layer::Dense(_))
    }

    /// Output length for an input of `input_len`, or `None` if the layer
    /// cannot consume it.
    pub fn output_len(&self, input_len: usize) -> Option<usize> {
        match self {
            Layer::Dense(l) => l.output_len(input_len),
            Layer::Convolution(l) => {
                (input_len == l.input_shape().size()).then(|| l.output_len())
            }
            Layer::Ensemble(l) => (input_len == l.input_shape().size()).then(|| l.output_len()),
        }
    }

    /// Internal consistency (kernel fits shape, ensemble filters agree).
    pub fn validate(&self) -> Result<()> {
        match self {
            Layer::Dense(_) => Ok(()),
            Layer::Convolution(l) => l.validate(),
            Layer::Ensemble(l) => l.validate(),
        }
    }

    /// Number of weights.
    pub fn param_count(&self) -> usize {
        match self {
            Layer::Dense(l) => l.axons().len(),
            Layer::Convolution(l) => l.kernel().len(),
            Layer::Ensemble(l) => l.filters().iter().map(|f| f.kernel().len()).sum(),
        }
    }

    pub fn transform(&self, v: &QuantizedVector) -> Result<QuantizedVector> {
        match self {
            Layer::Dense(l) => l.transform(v),
            Layer::Convolution(l) => l.transform(v),
            Layer::Ensemble(l) => l.transform(v),
        }
    }

    pub fn transform_real(&self, v: &RealVector) -> Result<QuantizedVector> {
        match self {
            Layer::Dense(l) => l.transform_real(v),
            other => Err(other.real_unsupported()),
        }
    }

    pub fn mass_transform(&self, inputs: &[QuantizedVector]) -> Result<Vec<QuantizedVector>> {
        match self {
            Layer::Dense(l) => l.mass_transform(inputs),
            Layer::Convolution(l) => l.mass_transform(inputs),
            Layer::Ensemble(l) => l.mass_transform(inputs),
        }
    }

    pub fn mass_transform_real(&self, inputs: &[RealVector]) -> Result<Vec<QuantizedVector>> {
        match self {
            Layer::Dense(l) => l.mass_transform_real(inputs),
            other => Err(other.real_unsupported()),
        }
    }

    pub fn mutate<R: Rng + ?Sized>(&self, rate: f64, rng: &mut R) -> Layer {
        match self {
            Layer::Dense(l) => Layer::Dense(l.mutate(rate, rng)),
            Layer::Convolution(l) => Layer::Convolution(l.mutate(rate, rng)),
            Layer::Ensemble(l) => Layer::Ensemble(l.mutate(rate, rng)),
        }
    }

    fn real_unsupported(&self) -> BrainError {
        BrainError::UnsupportedElementType(format!("real-valued input into a {} layer", self.kind()))
    }
}

impl From<DenseLayer> for Layer {
    fn from(l: DenseLayer) -> Self {
        Layer::Dense(l)
    }
}

impl From<ConvolutionLayer> for Layer {
    fn from(l: ConvolutionLayer) -> Self {
        Layer::Convolution(l)
    }
}

impl From<ConvolutionEnsemble> for Layer {
    fn from(l: ConvolutionEnsemble) -> Self {
        Layer::Ensemble(l)
    }
}
