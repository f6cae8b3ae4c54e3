//! FishAI Provenance
//!
//! Durable storage for accepted classifications.
//!
//! Provides:
//! - A bounded, most-recent-first provenance log with atomic replace
//! - An upload sink that keeps image bytes next to the log

pub mod store;
pub mod uploads;

pub use store::{ProvenanceStore, StoreConfig};
pub use uploads::UploadSink;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::store::{ProvenanceStore, StoreConfig};
    pub use crate::uploads::UploadSink;
}
