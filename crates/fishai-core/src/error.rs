//! Error types for FishAI

/// Result type alias using FishAI's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for FishAI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upload rejected before any inference work
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bytes could not be decoded as an image
    #[error("unable to decode image: {0}")]
    Decode(String),

    /// No classifier is loaded
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Provenance log or upload persistence failures
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller supplied bad input (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Decode(_))
    }
}

/// Reasons an upload is rejected before it reaches the classifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Uploaded file must be an image.")]
    UnsupportedContentType(Option<String>),

    #[error("Empty file uploaded.")]
    EmptyBody,

    #[error("Image exceeds maximum size of {limit_mb} MB.")]
    TooLarge { limit_mb: u64 },

    #[error("Missing multipart field `{0}`.")]
    MissingField(&'static str),

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_names_the_limit() {
        let err = Error::from(ValidationError::TooLarge { limit_mb: 6 });
        assert_eq!(err.to_string(), "Image exceeds maximum size of 6 MB.");
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_is_not_a_client_error() {
        assert!(!Error::storage("disk full").is_client_error());
        assert!(Error::decode("bad header").is_client_error());
    }
}
