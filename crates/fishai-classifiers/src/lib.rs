//! FishAI Classifiers
//!
//! The classifier seam of the service and everything needed to turn its
//! output into provenance records:
//! - [`ImageClassifier`]: the opaque, already-trained oracle
//! - [`LinearProbeClassifier`]: a Candle implementation loading an exported model
//! - [`Predictor`]: top-K selection, description, and record assembly
//!
//! Inference runs on CPU only.

pub mod classifier;
pub mod linear_probe;
pub mod model_loader;
pub mod predictor;

pub use classifier::{ClassificationResult, ImageClassifier};
pub use linear_probe::LinearProbeClassifier;
pub use model_loader::{ModelArtifact, ModelConfig, ModelManifest, ModelSource};
pub use predictor::{top_k, Predictor};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, ImageClassifier};
    pub use crate::linear_probe::LinearProbeClassifier;
    pub use crate::model_loader::{ModelConfig, ModelSource};
    pub use crate::predictor::Predictor;
}
