use std::path::PathBuf;

/// Convenience result type used across textmorph.
pub type TextmorphResult<T> = Result<T, TextmorphError>;

/// Top-level error taxonomy used by the synthesis pipeline.
#[derive(thiserror::Error, Debug)]
pub enum TextmorphError {
    /// Invalid user-provided configuration or input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A parameter snapshot was requested from a path that does not exist.
    #[error("missing checkpoint: '{}'", .0.display())]
    MissingCheckpoint(PathBuf),

    /// Failures reported by the generator, encoders or translator.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// The similarity objective received malformed input.
    #[error("objective error: {0}")]
    Objective(String),

    /// Errors when serializing or deserializing snapshots and manifests.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Tensor math or autodiff failure.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextmorphError {
    /// Build a [`TextmorphError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TextmorphError::MissingCheckpoint`] value.
    pub fn missing_checkpoint(path: impl Into<PathBuf>) -> Self {
        Self::MissingCheckpoint(path.into())
    }

    /// Build a [`TextmorphError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`TextmorphError::Objective`] value.
    pub fn objective(msg: impl Into<String>) -> Self {
        Self::Objective(msg.into())
    }

    /// Build a [`TextmorphError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
