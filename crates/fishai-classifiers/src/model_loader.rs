//! Model artifact discovery and loading for Candle-based classifiers
//!
//! An exported model is a directory (local or a Hugging Face repo) holding:
//! - `config.json`: the label vocabulary and input resolution
//! - `model.safetensors`: the classifier weights

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use fishai_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest file name inside a model directory
pub const MANIFEST_FILE: &str = "config.json";

/// Weights file name inside a model directory
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Source location for model artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Load from a local directory
    LocalDir(PathBuf),

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Configuration for loading a model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Where the artifacts live
    pub source: ModelSource,
}

impl ModelConfig {
    /// Create a new model configuration from a local directory
    pub fn from_local(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalDir(dir.into()),
        }
    }

    /// Create a new model configuration from Hugging Face
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
            },
        }
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let ModelSource::HuggingFace { repo_id, .. } = self.source {
            self.source = ModelSource::HuggingFace {
                repo_id,
                revision: Some(revision.into()),
            };
        }
        self
    }
}

/// Contents of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Model name/identifier
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Ordered label vocabulary
    pub labels: Vec<String>,

    /// Square input resolution the model was trained on
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

fn default_model_name() -> String {
    "fish-classifier".to_string()
}

fn default_image_size() -> u32 {
    64
}

impl ModelManifest {
    /// Read and validate a manifest file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::model_unavailable(format!("failed to read manifest {}: {}", path.display(), e))
        })?;
        let manifest: Self = serde_json::from_str(&content).map_err(|e| {
            Error::model_unavailable(format!("invalid manifest {}: {}", path.display(), e))
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the vocabulary and resolution are usable
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::model_unavailable("manifest declares no labels"));
        }
        if let Some(empty) = self.labels.iter().position(|l| l.trim().is_empty()) {
            return Err(Error::model_unavailable(format!(
                "manifest label at index {empty} is empty"
            )));
        }
        if self.image_size == 0 {
            return Err(Error::model_unavailable("manifest image_size must be positive"));
        }
        Ok(())
    }

    /// Length of the flattened CHW input vector
    pub fn input_dim(&self) -> usize {
        3 * (self.image_size as usize) * (self.image_size as usize)
    }
}

/// Resolved artifact paths plus the parsed manifest
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub manifest: ModelManifest,
    pub weights_path: PathBuf,
}

impl ModelArtifact {
    /// Resolve and validate the artifacts named by `config`
    pub fn resolve(config: &ModelConfig) -> Result<Self> {
        let (manifest_path, weights_path) = match &config.source {
            ModelSource::LocalDir(dir) => {
                let manifest = dir.join(MANIFEST_FILE);
                let weights = dir.join(WEIGHTS_FILE);
                for path in [&manifest, &weights] {
                    if !path.exists() {
                        return Err(Error::model_unavailable(format!(
                            "model file not found: {}",
                            path.display()
                        )));
                    }
                }
                (manifest, weights)
            }
            ModelSource::HuggingFace { repo_id, revision } => {
                download_from_hub(repo_id, revision.as_deref())?
            }
        };

        let manifest = ModelManifest::from_file(&manifest_path)?;
        info!(
            "Resolved model '{}' ({} labels, {}px) from {:?}",
            manifest.name,
            manifest.labels.len(),
            manifest.image_size,
            weights_path
        );

        Ok(Self {
            manifest,
            weights_path,
        })
    }

    /// Load the safetensors weights into a CPU `VarBuilder`
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let tensors: HashMap<String, Tensor> =
            candle_core::safetensors::load(&self.weights_path, device).map_err(|e| {
                Error::model_unavailable(format!(
                    "failed to load weights {}: {}",
                    self.weights_path.display(),
                    e
                ))
            })?;
        debug!("Loaded {} tensors", tensors.len());
        Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
    }
}

#[cfg(feature = "hf-hub")]
fn download_from_hub(repo_id: &str, revision: Option<&str>) -> Result<(PathBuf, PathBuf)> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    let api = Api::new()
        .map_err(|e| Error::model_unavailable(format!("failed to initialize HF API: {}", e)))?;
    let repo = api.repo(Repo::with_revision(
        repo_id.to_string(),
        RepoType::Model,
        revision.unwrap_or("main").to_string(),
    ));

    info!("Fetching model artifacts from Hugging Face repo {}", repo_id);
    let fetch = |file: &str| {
        repo.get(file).map_err(|e| {
            Error::model_unavailable(format!("failed to download {} from {}: {}", file, repo_id, e))
        })
    };
    Ok((fetch(MANIFEST_FILE)?, fetch(WEIGHTS_FILE)?))
}

#[cfg(not(feature = "hf-hub"))]
fn download_from_hub(repo_id: &str, _revision: Option<&str>) -> Result<(PathBuf, PathBuf)> {
    Err(Error::model_unavailable(format!(
        "cannot fetch {repo_id}: built without the `hf-hub` feature"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_config_hf() {
        let config = ModelConfig::from_hf("fishai/fish-classifier").with_revision("v2");

        if let ModelSource::HuggingFace { repo_id, revision } = &config.source {
            assert_eq!(repo_id, "fishai/fish-classifier");
            assert_eq!(revision.as_deref(), Some("v2"));
        } else {
            panic!("Expected HuggingFace source");
        }
    }

    #[test]
    fn test_revision_ignored_for_local() {
        let config = ModelConfig::from_local("/models/fish").with_revision("v2");
        assert_eq!(config.source, ModelSource::LocalDir("/models/fish".into()));
    }

    #[test]
    fn test_missing_dir_is_model_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = ModelArtifact::resolve(&ModelConfig::from_local(dir.path().join("nope")))
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)), "got {err:?}");
    }

    #[test]
    fn test_manifest_validation() {
        let manifest: ModelManifest =
            serde_json::from_str(r#"{"labels": ["cod", "eel"]}"#).unwrap();
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.image_size, 64);
        assert_eq!(manifest.input_dim(), 3 * 64 * 64);

        let empty: ModelManifest = serde_json::from_str(r#"{"labels": []}"#).unwrap();
        assert!(empty.validate().is_err());

        let blank: ModelManifest =
            serde_json::from_str(r#"{"labels": ["cod", " "], "image_size": 8}"#).unwrap();
        assert!(blank.validate().is_err());
    }
}
