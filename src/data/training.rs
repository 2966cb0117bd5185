//! Labelled training data and the scoring of predictions against it.
//!
//! Two per-item measures are computed for every prediction:
//!
//! - **rate**: 1 / (number of entries equal to the maximum) when the label's
//!   entry is one of the maxima, else 0. Averaged over a batch this is a
//!   tie-aware accuracy.
//! - **margin**: a continuous score rewarding the label's entry and
//!   penalising every other entry, each measured above the vector minimum
//!   and divided by the squared norm.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::QuantizedVector;
use crate::error::{BrainError, Result};
use crate::network::{Sample, SampleBatch};

/// Which batch measure drives selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMetric {
    /// Selection score equals the classification rate.
    #[default]
    Rate,
    /// Selection score is the mean margin.
    Margin,
}

/// Batch-averaged measures of one predictor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchScore {
    pub rate: f64,
    pub margin: f64,
}

impl BatchScore {
    pub fn score(&self, metric: ScoreMetric) -> f64 {
        match metric {
            ScoreMetric::Rate => self.rate,
            ScoreMetric::Margin => self.margin,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingItem {
    pub input: Sample,
    pub label: usize,
}

impl TrainingItem {
    pub fn new(input: impl Into<Sample>, label: usize) -> Self {
        Self {
            input: input.into(),
            label,
        }
    }
}

/// A homogeneous batch of inputs with their labels. Cloning is cheap.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingData {
    inputs: Arc<SampleBatch>,
    labels: Arc<[usize]>,
}

impl TrainingData {
    /// Items must all be real or all quantized.
    pub fn new(items: Vec<TrainingItem>) -> Result<Self> {
        let (inputs, labels): (Vec<Sample>, Vec<usize>) =
            items.into_iter().map(|it| (it.input, it.label)).unzip();
        Self::from_batch(SampleBatch::from_samples(inputs)?, labels)
    }

    pub fn from_batch(inputs: SampleBatch, labels: Vec<usize>) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(BrainError::shape(
                "training data labels",
                inputs.len().to_string(),
                labels.len(),
            ));
        }
        Ok(Self {
            inputs: Arc::new(inputs),
            labels: labels.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn inputs(&self) -> &SampleBatch {
        &self.inputs
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn item(&self, i: usize) -> Option<TrainingItem> {
        Some(TrainingItem {
            input: self.inputs.get(i)?,
            label: *self.labels.get(i)?,
        })
    }

    /// Contiguous window `[start, start + len)`, clipped to the data.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let inputs = self.inputs.slice(start, len);
        let start = start.min(self.labels.len());
        let end = start + inputs.len();
        Self {
            inputs: Arc::new(inputs),
            labels: self.labels[start..end].into(),
        }
    }

    /// Score a per-sample predictor, averaging over the batch.
    pub fn score_and_rate<F>(&self, predictor: F) -> Result<BatchScore>
    where
        F: Fn(&Sample) -> Result<QuantizedVector>,
    {
        let mut predictions = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            if let Some(sample) = self.inputs.get(i) {
                predictions.push(predictor(&sample)?);
            }
        }
        self.average(&predictions)
    }

    /// Score a batch predictor that returns one prediction per input, in
    /// order.
    pub fn score_and_rate_mass<F>(&self, predictor: F) -> Result<BatchScore>
    where
        F: FnOnce(&SampleBatch) -> Result<Vec<QuantizedVector>>,
    {
        let predictions = predictor(&self.inputs)?;
        self.average(&predictions)
    }

    fn average(&self, predictions: &[QuantizedVector]) -> Result<BatchScore> {
        if predictions.len() != self.len() {
            return Err(BrainError::shape(
                "batch predictions",
                self.len().to_string(),
                predictions.len(),
            ));
        }
        if predictions.is_empty() {
            return Ok(BatchScore::default());
        }
        let n = predictions.len() as f64;
        let (rate, margin) = predictions
            .iter()
            .zip(self.labels.iter())
            .fold((0.0, 0.0), |(r, m), (p, &label)| {
                (r + item_rate(p, label), m + item_margin(p, label))
            });
        Ok(BatchScore {
            rate: rate / n,
            margin: margin / n,
        })
    }
}

/// Tie-aware hit: `1 / ties` if `label` holds the maximum, else 0.
pub fn item_rate(prediction: &QuantizedVector, label: usize) -> f64 {
    let Some(max) = prediction.max() else {
        return 0.0;
    };
    match prediction.get(label) {
        Some(v) if v == max => {
            let ties = prediction.iter().filter(|&x| x == max).count();
            1.0 / ties as f64
        }
        _ => 0.0,
    }
}

/// `Σ sign_i (v_i - min) / ‖v‖²`, `sign = +1` at `label`, `-1` elsewhere.
pub fn item_margin(prediction: &QuantizedVector, label: usize) -> f64 {
    let Some(min) = prediction.min() else {
        return 0.0;
    };
    let norm = match prediction.squared_norm() {
        0 => 1.0,
        n => n as f64,
    };
    prediction
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let lifted = (v as f64 - min as f64) / norm;
            if i == label {
                lifted
            } else {
                -lifted
            }
        })
        .sum()
}
