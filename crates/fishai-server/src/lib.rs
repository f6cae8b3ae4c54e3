//! FishAI Server
//!
//! HTTP surface for the FishAI classifier: upload validation, orchestration
//! of prediction and provenance logging, and the axum router.

pub mod cli;
pub mod config;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use cli::Cli;
pub use config::Settings;
pub use routes::{create_router, AppError};
pub use service::ClassificationService;
pub use state::AppState;
pub use validation::{Upload, UploadLimits};
