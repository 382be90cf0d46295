/// Result alias used across the engine.
pub type GridflowResult<T> = Result<T, GridflowError>;

/// Engine error kinds.
///
/// None of these are retried automatically; callers decide whether to re-invoke `update()`.
#[derive(thiserror::Error, Debug)]
pub enum GridflowError {
    /// Missing required input, cyclic producer graph, dimension or sample-type mismatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A region outside the largest possible region, or a broken split.
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    /// A stage failed while generating data (including worker-thread failures).
    #[error("compute error: {0}")]
    Compute(String),

    /// Error raised by a collaborator (reader, sink, stage) and passed through unmodified.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GridflowError {
    /// Build a [`GridflowError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`GridflowError::InvalidRegion`].
    pub fn invalid_region(msg: impl Into<String>) -> Self {
        Self::InvalidRegion(msg.into())
    }

    /// Build a [`GridflowError::Compute`].
    pub fn compute(msg: impl Into<String>) -> Self {
        Self::Compute(msg.into())
    }

    /// Return `true` for [`GridflowError::Configuration`].
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Return `true` for [`GridflowError::InvalidRegion`].
    pub fn is_invalid_region(&self) -> bool {
        matches!(self, Self::InvalidRegion(_))
    }

    /// Return `true` for [`GridflowError::Compute`].
    pub fn is_compute(&self) -> bool {
        matches!(self, Self::Compute(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
