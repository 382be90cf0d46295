//! Data objects and their sample storage.

/// Typed sample buffers, worker tiles and read views.
pub mod buffer;
/// The pipeline data object and its metadata.
pub mod object;
