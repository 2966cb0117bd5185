//! Population-based random search over brains.
//!
//! Each epoch draws a batch and runs a fixed number of tours. In a tour
//! every population member breeds mutated children on a worker, each branch
//! keeps the top entries among the member and its children, and the
//! branches are tree-reduced back into one population. The mutation rate
//! shrinks with the tour index and with the best rate reached so far:
//!
//!   rate = RATE_NUMERATOR / (tour + RATE_OFFSET + best_rate)
//!
//! Every random draw comes from a seed derived up front from the run seed,
//! so a run is reproducible regardless of thread scheduling.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pool::WorkerPool;
use super::population::{EvaluatedBrain, Population};
use crate::config;
use crate::data::{ScoreMetric, TrainingBatchSource, TrainingData};
use crate::error::{BrainError, Result};
use crate::network::Brain;
use crate::runtime::monitor::{TrainingMonitor, TrainingSummary};

/// Trainer configuration. Every field is optional in a settings file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    /// Population capacity K.
    pub capacity: usize,

    /// Children bred from each member per tour.
    pub mutants_per_member: usize,

    /// Tours per epoch.
    pub tours: usize,

    pub max_epochs: usize,

    /// Stop once the best rate exceeds this.
    pub convergence_rate: f64,

    /// Worker threads (0 = one per core).
    pub threads: usize,

    /// Run seed.
    pub seed: u64,

    /// Optional wall-clock budget for the whole run.
    pub time_budget_secs: Option<f64>,

    /// Measure used as the selection score.
    pub score_metric: ScoreMetric,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            capacity: config::POPULATION_CAPACITY,
            mutants_per_member: config::MUTANTS_PER_MEMBER,
            tours: config::TOURS,
            max_epochs: config::MAX_EPOCHS,
            convergence_rate: config::CONVERGENCE_RATE,
            threads: 0,
            seed: config::DEFAULT_SEED,
            time_budget_secs: None,
            score_metric: ScoreMetric::Rate,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(BrainError::InvalidConfig("capacity must be positive".into()));
        }
        if self.tours == 0 {
            return Err(BrainError::InvalidConfig("tours must be positive".into()));
        }
        if !self.convergence_rate.is_finite() {
            return Err(BrainError::InvalidConfig(format!(
                "convergence rate must be finite, got {}",
                self.convergence_rate
            )));
        }
        if let Some(secs) = self.time_budget_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(BrainError::InvalidConfig(format!(
                    "time budget must be a non-negative number of seconds, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    ExhaustedEpochs,
    DeadlineReached,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StopReason::Converged => "converged",
            StopReason::ExhaustedEpochs => "exhausted epochs",
            StopReason::DeadlineReached => "deadline reached",
        })
    }
}

/// Outcome of [`Trainer::run`].
#[derive(Clone, Debug)]
pub struct TrainingReport {
    pub brain: Brain,
    pub best_rate: f64,
    pub best_score: f64,
    pub epochs: usize,
    pub stop: StopReason,
    pub summary: TrainingSummary,
}

/// Mutation rate for `tour` given the best rate so far.
pub fn mutation_rate(tour: usize, best_rate: f64) -> f64 {
    config::RATE_NUMERATOR / (tour as f64 + config::RATE_OFFSET + best_rate)
}

pub struct Trainer<S> {
    initial: Brain,
    source: S,
    config: TrainerConfig,
    pool: WorkerPool,
}

impl<S: TrainingBatchSource> Trainer<S> {
    pub fn new(initial: Brain, source: S, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.threads)?;
        Ok(Self {
            initial,
            source,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The batch source, e.g. to draw a verification batch after a run.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Train and return the best brain.
    pub fn train(&mut self) -> anyhow::Result<Brain> {
        Ok(self.run()?.brain)
    }

    /// Train and report how the run went.
    pub fn run(&mut self) -> anyhow::Result<TrainingReport> {
        let started = Instant::now();
        let deadline = self
            .config
            .time_budget_secs
            .map(|secs| started + Duration::from_secs_f64(secs));
        let mut seeds = StdRng::seed_from_u64(self.config.seed);
        let metric = self.config.score_metric;

        let mut batch = self.source.next_batch()?;
        let initial = evaluate(self.initial.clone(), &batch, metric)?;
        info!(
            rate = initial.rate,
            score = initial.score,
            batch = batch.len(),
            threads = self.pool.threads(),
            "initial brain scored"
        );
        let mut population = Population::new(self.config.capacity)?;
        population.insert(initial);

        let mut monitor = TrainingMonitor::default();
        let mut stop = StopReason::ExhaustedEpochs;
        let mut epochs = 0;

        for epoch in 0..self.config.max_epochs {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                stop = StopReason::DeadlineReached;
                break;
            }
            let epoch_started = Instant::now();
            if epoch > 0 {
                batch = self.source.next_batch()?;
            }

            for tour in 0..self.config.tours {
                let rate = mutation_rate(tour, population.try_best()?.rate);
                population = self.tour(&population, &batch, rate, &mut seeds)?;
                debug!(
                    epoch,
                    tour,
                    rate,
                    size = population.len(),
                    best = population.try_best()?.rate,
                    "tour complete"
                );
            }

            epochs += 1;
            let best = population.try_best()?;
            let secs = epoch_started.elapsed().as_secs_f64();
            monitor.record_epoch(epoch, best.rate, best.score, secs);
            info!(
                epoch,
                rate = best.rate,
                score = best.score,
                secs,
                "epoch complete"
            );
            if best.rate > self.config.convergence_rate {
                stop = StopReason::Converged;
                break;
            }
        }

        let best = population.try_best()?;
        info!(
            %stop,
            epochs,
            rate = best.rate,
            secs = started.elapsed().as_secs_f64(),
            "training finished"
        );
        Ok(TrainingReport {
            brain: (*best.brain).clone(),
            best_rate: best.rate,
            best_score: best.score,
            epochs,
            stop,
            summary: monitor.summary(),
        })
    }

    /// Mean per-item rate of `brain` on `data`, without training.
    pub fn test(&self, brain: &Brain, data: &TrainingData) -> Result<f64> {
        Ok(data
            .score_and_rate_mass(|inputs| brain.mass_digest_batch(inputs))?
            .rate)
    }

    fn tour(
        &self,
        population: &Population,
        batch: &TrainingData,
        rate: f64,
        seeds: &mut StdRng,
    ) -> Result<Population> {
        let members: Vec<(EvaluatedBrain, u64)> =
            population.iter().map(|m| (m.clone(), seeds.gen())).collect();

        let config = &self.config;
        let branches = self
            .pool
            .fan_out(&members, |(member, seed)| breed(member, *seed, rate, batch, config))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        self.pool
            .tree_reduce(branches, |a, b| a.merge(b))
            .ok_or(BrainError::EmptyPopulation)
    }
}

/// A capacity-K population of `member` and its scored children.
fn breed(
    member: &EvaluatedBrain,
    seed: u64,
    rate: f64,
    batch: &TrainingData,
    config: &TrainerConfig,
) -> Result<Population> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut branch = Population::new(config.capacity)?;
    branch.insert(member.clone());
    for _ in 0..config.mutants_per_member {
        let child = member.brain.mutate(rate, &mut rng);
        branch.insert(evaluate(child, batch, config.score_metric)?);
    }
    Ok(branch)
}

fn evaluate(brain: Brain, batch: &TrainingData, metric: ScoreMetric) -> Result<EvaluatedBrain> {
    let score = batch.score_and_rate_mass(|inputs| brain.mass_digest_batch(inputs))?;
    Ok(EvaluatedBrain::new(brain, score.score(metric), score.rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QuantizedMatrix, QuantizedVector, RealVector};
    use crate::data::{synthetic, FixedBatch, TrainingItem};
    use crate::layers::{ConvolutionLayer, DenseLayer, Shape2};
    use crate::network::BrainBuilder;

    fn small_config(seed: u64) -> TrainerConfig {
        TrainerConfig {
            capacity: 4,
            mutants_per_member: 3,
            tours: 2,
            max_epochs: 2,
            threads: 2,
            seed,
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let c = TrainerConfig::default();
        assert_eq!(c.capacity, 10);
        assert_eq!(c.mutants_per_member, 15);
        assert_eq!(c.tours, 4);
        assert_eq!(c.max_epochs, 10);
        assert_eq!(c.convergence_rate, 0.9999);
        assert_eq!(c.score_metric, ScoreMetric::Rate);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let c = TrainerConfig {
            capacity: 0,
            ..TrainerConfig::default()
        };
        assert!(c.validate().is_err());
        let c = TrainerConfig {
            time_budget_secs: Some(-1.0),
            ..TrainerConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_mutation_rate_schedule() {
        assert_eq!(mutation_rate(0, 0.0), 0.5);
        assert!((mutation_rate(3, 1.0) - 0.3).abs() < 1e-12);
        assert!(mutation_rate(1, 0.5) < mutation_rate(0, 0.5));
    }

    #[test]
    fn test_converges_immediately_on_perfect_brain() {
        // [x] → [x, 0]: label 0 always wins for positive x.
        let brain = Brain::new(vec![
            DenseLayer::new(QuantizedMatrix::new(1, 2, vec![1, 0]).unwrap()).into(),
        ])
        .unwrap();
        let data = TrainingData::new(
            (1..=5)
                .map(|i| TrainingItem::new(QuantizedVector::new(vec![i]), 0))
                .collect(),
        )
        .unwrap();
        let mut trainer = Trainer::new(brain, FixedBatch::new(data), small_config(1)).unwrap();
        let report = trainer.run().unwrap();
        assert_eq!(report.stop, StopReason::Converged);
        assert_eq!(report.epochs, 1);
        assert_eq!(report.best_rate, 1.0);
    }

    #[test]
    fn test_zero_budget_returns_initial() {
        let mut rng = StdRng::seed_from_u64(3);
        let brain = BrainBuilder::new(2).dense(4).dense(2).build(&mut rng).unwrap();
        let data = synthetic::squared_sum_threshold(20, 2, 100.0, &mut rng).unwrap();
        let config = TrainerConfig {
            time_budget_secs: Some(0.0),
            ..small_config(3)
        };
        let mut trainer = Trainer::new(brain.clone(), FixedBatch::new(data), config).unwrap();
        let report = trainer.run().unwrap();
        assert_eq!(report.stop, StopReason::DeadlineReached);
        assert_eq!(report.epochs, 0);
        assert_eq!(report.brain, brain);
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut rng = StdRng::seed_from_u64(4);
        let brain = BrainBuilder::new(2).dense(6).dense(2).build(&mut rng).unwrap();
        let data = synthetic::squared_sum_threshold(40, 2, 100.0, &mut rng).unwrap();

        let run = |seed| {
            Trainer::new(brain.clone(), FixedBatch::new(data.clone()), small_config(seed))
                .unwrap()
                .run()
                .unwrap()
        };
        let (a, b) = (run(9), run(9));
        assert_eq!(a.brain, b.brain);
        assert_eq!(a.best_rate, b.best_rate);
        assert_eq!(a.epochs, b.epochs);
    }

    #[test]
    fn test_best_rate_never_drops_on_fixed_batch() {
        let mut rng = StdRng::seed_from_u64(5);
        let brain = BrainBuilder::new(2).dense(6).dense(2).build(&mut rng).unwrap();
        let data = synthetic::squared_sum_threshold(40, 2, 100.0, &mut rng).unwrap();
        let mut trainer = Trainer::new(brain.clone(), FixedBatch::new(data.clone()), small_config(5)).unwrap();
        let before = trainer.test(&brain, &data).unwrap();
        let report = trainer.run().unwrap();
        assert!(report.best_rate >= before);
        assert_eq!(trainer.test(&report.brain, &data).unwrap(), report.best_rate);
    }

    #[test]
    fn test_real_data_into_convolution_fails() {
        let kernel = QuantizedMatrix::new(2, 2, vec![1, 1, 1, 1]).unwrap();
        let conv = ConvolutionLayer::new(kernel, Shape2::new(4, 4)).unwrap();
        let brain = Brain::new(vec![conv.into()]).unwrap();
        let data = TrainingData::new(vec![TrainingItem::new(RealVector::new(vec![0.5; 16]), 0)]).unwrap();
        let mut trainer = Trainer::new(brain, FixedBatch::new(data), small_config(6)).unwrap();
        let err = trainer.run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BrainError>(),
            Some(BrainError::UnsupportedElementType(_))
        ));
    }

    #[test]
    fn test_source_errors_propagate() {
        let brain = Brain::new(vec![
            DenseLayer::new(QuantizedMatrix::zeros(2, 2).unwrap()).into(),
        ])
        .unwrap();
        let source = || -> anyhow::Result<TrainingData> { anyhow::bail!("no data") };
        let mut trainer = Trainer::new(brain, source, small_config(7)).unwrap();
        assert!(trainer.train().is_err());
    }
}
