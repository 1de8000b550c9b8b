/// Convenience result type used across texbake.
pub type BakeResult<T> = Result<T, BakeError>;

/// Top-level error taxonomy used by the baking core.
#[derive(thiserror::Error, Debug)]
pub enum BakeError {
    /// Invalid caller-provided data (bad buffer sizes, out-of-range tiles, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Job configuration that cannot be planned (no objects, missing UVs, no channels).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Shading-graph lookups or rewiring that could not be performed.
    #[error("graph error: {0}")]
    Graph(String),

    /// The external bake backend reported a failure.
    #[error("render error: {0}")]
    Render(String),

    /// Saving, exporting or state-file IO failed.
    #[error("io error: {0}")]
    Io(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BakeError {
    /// Build a [`BakeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BakeError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`BakeError::Graph`] value.
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }

    /// Build a [`BakeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`BakeError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`BakeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for BakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
