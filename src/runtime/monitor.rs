//! Training progress monitor.
//!
//! Keeps rolling per-epoch metrics for a run and flags a plateau when the
//! best rate stops moving.

use std::collections::VecDeque;

/// Progress status.
#[derive(Clone, Debug, PartialEq)]
pub enum TrainingStatus {
    /// Not enough epochs to judge, or the rate is still moving.
    Improving,
    /// The best rate varied less than the tolerance over the window.
    Plateaued(String),
}

#[derive(Clone, Debug)]
pub struct MetricSample {
    pub epoch: usize,
    pub value: f64,
}

/// A rolling metric tracker.
#[derive(Clone, Debug)]
pub struct MetricTracker {
    pub name: String,
    pub samples: VecDeque<MetricSample>,
    pub max_samples: usize,
}

impl MetricTracker {
    pub fn new(name: &str, max_samples: usize) -> Self {
        Self {
            name: name.to_string(),
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, epoch: usize, value: f64) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(MetricSample { epoch, value });
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().map(|s| s.value)
    }

    pub fn first(&self) -> Option<f64> {
        self.samples.front().map(|s| s.value)
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.value).sum::<f64>() / self.samples.len() as f64
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .samples
            .iter()
            .map(|s| (s.value - mean).powi(2))
            .sum::<f64>()
            / (self.samples.len() - 1) as f64;
        var.sqrt()
    }

    pub fn max(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.value)
            .fold(f64::INFINITY, f64::min)
    }

    /// Whether the last `window` samples span less than `tolerance`.
    pub fn is_flat(&self, window: usize, tolerance: f64) -> bool {
        if window < 2 || self.samples.len() < window {
            return false;
        }
        let recent = self.samples.iter().rev().take(window).map(|s| s.value);
        let (lo, hi) = recent.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        hi - lo < tolerance
    }
}

/// Per-run monitor fed by the trainer once per epoch.
#[derive(Clone, Debug)]
pub struct TrainingMonitor {
    pub best_rate: MetricTracker,
    pub best_score: MetricTracker,
    pub epoch_secs: MetricTracker,
    pub epochs: usize,
    plateau_window: usize,
    plateau_tolerance: f64,
}

impl Default for TrainingMonitor {
    fn default() -> Self {
        Self::new(3, 1e-3)
    }
}

impl TrainingMonitor {
    pub fn new(plateau_window: usize, plateau_tolerance: f64) -> Self {
        Self {
            best_rate: MetricTracker::new("best_rate", 1000),
            best_score: MetricTracker::new("best_score", 1000),
            epoch_secs: MetricTracker::new("epoch_secs", 1000),
            epochs: 0,
            plateau_window,
            plateau_tolerance,
        }
    }

    pub fn record_epoch(&mut self, epoch: usize, rate: f64, score: f64, secs: f64) {
        self.epochs += 1;
        self.best_rate.record(epoch, rate);
        self.best_score.record(epoch, score);
        self.epoch_secs.record(epoch, secs);
    }

    pub fn status(&self) -> TrainingStatus {
        if self
            .best_rate
            .is_flat(self.plateau_window, self.plateau_tolerance)
        {
            TrainingStatus::Plateaued(format!(
                "{}: flat within {} over {} epochs",
                self.best_rate.name, self.plateau_tolerance, self.plateau_window
            ))
        } else {
            TrainingStatus::Improving
        }
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            status: self.status(),
            epochs: self.epochs,
            final_rate: self.best_rate.latest().unwrap_or(0.0),
            rate_gain: match (self.best_rate.first(), self.best_rate.latest()) {
                (Some(a), Some(b)) => b - a,
                _ => 0.0,
            },
            final_score: self.best_score.latest().unwrap_or(0.0),
            mean_epoch_secs: self.epoch_secs.mean(),
            max_epoch_secs: if self.epoch_secs.samples.is_empty() {
                0.0
            } else {
                self.epoch_secs.max()
            },
        }
    }
}

/// A monitor snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSummary {
    pub status: TrainingStatus,
    pub epochs: usize,
    pub final_rate: f64,
    pub rate_gain: f64,
    pub final_score: f64,
    pub mean_epoch_secs: f64,
    pub max_epoch_secs: f64,
}
