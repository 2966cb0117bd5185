//! Compute kernels.
//!
//! Only a pure-Rust CPU backend exists: saturating int8 GEMV in single,
//! row-parallel and mass (many inputs, one weight pass) forms.

pub mod int8_gemm_cpu;
