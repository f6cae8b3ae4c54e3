//! Upload validation
//!
//! Checks run before any inference work:
//! - the declared content type is an image type
//! - the body is not empty
//! - the body fits the configured size limit

use bytes::Bytes;
use fishai_core::ValidationError;

/// A file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied name, sanitized later
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Size limit for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    limit_mb: u64,
    max_bytes: usize,
}

impl UploadLimits {
    pub fn from_mb(limit_mb: u64) -> Self {
        Self {
            limit_mb,
            max_bytes: (limit_mb as usize).saturating_mul(1024 * 1024),
        }
    }

    pub fn limit_mb(&self) -> u64 {
        self.limit_mb
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn too_large(&self) -> ValidationError {
        ValidationError::TooLarge {
            limit_mb: self.limit_mb,
        }
    }

    /// Reject once `received` bytes exceed the limit
    pub fn check_len(&self, received: usize) -> Result<(), ValidationError> {
        if received > self.max_bytes {
            return Err(self.too_large());
        }
        Ok(())
    }
}

/// Accept only `image/*` content types (case-insensitive)
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if ct.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("image/")) => Ok(()),
        other => Err(ValidationError::UnsupportedContentType(other.map(str::to_string))),
    }
}

/// Run every upload check, in order
pub fn validate_upload(upload: &Upload, limits: &UploadLimits) -> Result<(), ValidationError> {
    validate_content_type(upload.content_type.as_deref())?;
    if upload.bytes.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    limits.check_len(upload.bytes.len())
}

/// Label used for the rejection counter
pub fn rejection_reason(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::UnsupportedContentType(_) => "content_type",
        ValidationError::EmptyBody => "empty",
        ValidationError::TooLarge { .. } => "too_large",
        ValidationError::MissingField(_) => "missing_field",
        ValidationError::Malformed(_) => "malformed",
        ValidationError::InvalidPrediction(_) => "invalid_prediction",
    }
}
