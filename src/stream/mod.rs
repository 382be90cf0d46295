//! Piecewise updates for outputs too large to materialize at once.

/// Piece planning and the streaming loop.
pub mod controller;
/// Destinations for streamed pieces.
pub mod sink;
