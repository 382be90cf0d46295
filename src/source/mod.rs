//! Stages with no inputs that start a pipeline.

/// Procedurally generated samples.
pub mod generator;
/// Samples imported from memory.
pub mod memory;
