//! DSP building blocks for the effect graphs.
//!
//! Pure Rust, allocation-free once constructed. The graph nodes in
//! [`crate::graph`] wire these together per effect family.

pub mod compressor;
pub mod convolver;
pub mod delay;
pub mod filter;
pub mod lfo;
pub mod param;
pub mod waveshaper;
