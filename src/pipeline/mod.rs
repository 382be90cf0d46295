//! Producers, the stage hook set, and the three-pass update coordinator.

/// Producer nodes wrapping a [`Stage`](stage::Stage).
pub mod producer;
/// Change-tracked stage parameters.
pub mod property;
/// The hook set a transformation stage implements.
pub mod stage;
/// Information, requested-region and data passes.
pub mod update;
