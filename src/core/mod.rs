//! Core module: saturating int8 vectors and weight matrices.

pub mod matrix;
pub mod vector;

pub use matrix::{clamp_rate, Orientation, QuantizedMatrix};
pub use vector::{QuantizedVector, RealVector};
