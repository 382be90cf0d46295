//! Region partitioning and threaded fork/join dispatch.

/// Fork/join of a stage's per-region work across worker threads.
pub mod dispatch;
/// Region partitioning.
pub mod splitter;
