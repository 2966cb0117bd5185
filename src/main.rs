//! evobrain: train an int8 MNIST classifier by evolutionary search.
//!
//! Loads the latest stored brain (or draws a fresh one), trains it on
//! cycling MNIST batches, reports the rate on the next batch and stores the
//! result as a new version.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use evobrain::data::{CyclingBatches, MnistDataset, TrainingBatchSource};
use evobrain::learning::Trainer;
use evobrain::network::mnist_brain;
use evobrain::runtime::{FileModelStore, ModelStore};
use evobrain::settings::RunSettings;

/// evobrain training CLI.
#[derive(Parser, Debug)]
#[command(
    name = "evobrain",
    about = "Train a saturating int8 network on MNIST by population search",
    version
)]
struct Cli {
    /// TOML settings file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with train-images-idx3-ubyte and train-labels-idx1-ubyte.
    #[arg(long)]
    mnist_dir: Option<PathBuf>,

    /// Directory of versioned brain files.
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Maximum number of epochs.
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Items per training batch.
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Run seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker threads (0 = one per core).
    #[arg(short, long)]
    threads: Option<usize>,
}

impl Cli {
    fn settings(&self) -> Result<RunSettings> {
        let mut settings = match &self.config {
            Some(path) => RunSettings::load(path)?,
            None => RunSettings::default(),
        };
        if let Some(dir) = &self.mnist_dir {
            settings.data.mnist_dir = dir.clone();
        }
        if let Some(dir) = &self.model_dir {
            settings.data.model_dir = dir.clone();
        }
        if let Some(epochs) = self.epochs {
            settings.trainer.max_epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            settings.data.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            settings.trainer.seed = seed;
        }
        if let Some(threads) = self.threads {
            settings.trainer.threads = threads;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    tracing::info!("evobrain v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Config: capacity={}, mutants={}, tours={}, epochs={}, batch={}, seed={}",
        settings.trainer.capacity,
        settings.trainer.mutants_per_member,
        settings.trainer.tours,
        settings.trainer.max_epochs,
        settings.data.batch_size,
        settings.trainer.seed,
    );

    let dataset = MnistDataset::load_dir(&settings.data.mnist_dir)?.into_training_data()?;
    let source = CyclingBatches::new(dataset, settings.data.batch_size)?;

    let mut store = FileModelStore::new(&settings.data.model_dir);
    let brain = match store.load()? {
        Some(brain) => brain,
        None => {
            tracing::info!("No stored brain; drawing a fresh one");
            mnist_brain(&mut StdRng::seed_from_u64(settings.trainer.seed))?
        }
    };
    tracing::info!(
        "Brain: {} layers, {} weights",
        brain.depth(),
        brain.param_count()
    );

    let mut trainer = Trainer::new(brain, source, settings.trainer.clone())?;
    let report = trainer.run()?;
    tracing::info!(
        "Stopped ({}) after {} epochs: rate={:.4}, score={:.4}, rate gain={:.4}, mean epoch {:.1}s",
        report.stop,
        report.epochs,
        report.best_rate,
        report.best_score,
        report.summary.rate_gain,
        report.summary.mean_epoch_secs,
    );

    store.save(&report.brain)?;

    let test_batch = trainer.source_mut().next_batch()?;
    let test_rate = trainer.test(&report.brain, &test_batch)?;
    tracing::info!("Test rate on {} held-over items: {:.4}", test_batch.len(), test_rate);

    Ok(())
}
