//! FishAI Core
//!
//! Core types and utilities shared across the FishAI classifier service.
//!
//! This crate provides:
//! - The classification record and prediction types persisted as provenance
//! - Error types and result handling
//! - Upload file-name sanitization

pub mod error;
pub mod sanitize;
pub mod types;

pub use error::{Error, Result, ValidationError};
pub use sanitize::{sanitize_file_name, DEFAULT_FILE_NAME};
pub use types::{ClassificationRecord, Prediction};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::types::{ClassificationRecord, Prediction};
}
