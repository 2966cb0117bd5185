//! Network module: brains composed from layers, and their inputs.

pub mod brain;
pub mod builder;
pub mod input;

pub use brain::Brain;
pub use builder::{mnist_brain, BrainBuilder};
pub use input::{Sample, SampleBatch};
