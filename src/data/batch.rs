//! Batch sources feeding the trainer one [`TrainingData`] per epoch.

use anyhow::{bail, Result};

use super::training::TrainingData;

/// Supplies training batches on demand.
pub trait TrainingBatchSource: Send {
    fn next_batch(&mut self) -> Result<TrainingData>;
}

impl<F> TrainingBatchSource for F
where
    F: FnMut() -> Result<TrainingData> + Send,
{
    fn next_batch(&mut self) -> Result<TrainingData> {
        self()
    }
}

/// Always hands out the same data.
#[derive(Clone, Debug)]
pub struct FixedBatch {
    data: TrainingData,
}

impl FixedBatch {
    pub fn new(data: TrainingData) -> Self {
        Self { data }
    }
}

impl TrainingBatchSource for FixedBatch {
    fn next_batch(&mut self) -> Result<TrainingData> {
        Ok(self.data.clone())
    }
}

/// Walks a dataset in consecutive windows of `batch_size`, restarting from
/// the beginning when the following window would reach the end.
#[derive(Clone, Debug)]
pub struct CyclingBatches {
    dataset: TrainingData,
    batch_size: usize,
    index: usize,
}

impl CyclingBatches {
    pub fn new(dataset: TrainingData, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            bail!("batch size must be positive");
        }
        if dataset.len() < batch_size {
            bail!(
                "dataset of {} items is smaller than one batch of {}",
                dataset.len(),
                batch_size
            );
        }
        Ok(Self {
            dataset,
            batch_size,
            index: 0,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl TrainingBatchSource for CyclingBatches {
    fn next_batch(&mut self) -> Result<TrainingData> {
        if (self.index + 1) * self.batch_size >= self.dataset.len() {
            self.index = 0;
        }
        let batch = self
            .dataset
            .slice(self.index * self.batch_size, self.batch_size);
        self.index += 1;
        Ok(batch)
    }
}
