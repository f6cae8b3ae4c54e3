//! Service configuration
//!
//! Layered as: built-in defaults, then the YAML file (if present), then
//! `FISHAI_*` environment variables, then command-line flags.

use crate::cli::Cli;
use fishai_classifiers::ModelConfig;
use fishai_core::{Error, Result};
use fishai_provenance::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path prefix for every API route
    pub api_prefix: String,

    pub host: String,
    pub port: u16,

    /// Local model directory
    pub model_dir: PathBuf,

    /// Hugging Face repository id; takes precedence over `model_dir`
    pub model_repo: Option<String>,

    pub upload_dir: PathBuf,
    pub metadata_path: PathBuf,

    /// Predictions kept per record
    pub top_k: usize,

    /// Largest accepted upload, in MiB
    pub max_upload_mb: u64,

    /// Records kept in the provenance log
    pub retention_cap: usize,

    /// Allow any CORS origin; otherwise only `cors_origins`
    pub cors_allow_any: bool,
    pub cors_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("model"),
            model_repo: None,
            upload_dir: PathBuf::from("storage/uploads"),
            metadata_path: PathBuf::from("storage/metadata.json"),
            top_k: 5,
            max_upload_mb: 6,
            retention_cap: 50,
            cors_allow_any: true,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Load configuration from file, environment and CLI overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let layered = config::Config::builder()
            .add_source(config::File::from(cli.config.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("FISHAI")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        let mut settings: Settings = layered
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))?;

        settings.apply_overrides(cli);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.model_dir {
            self.model_dir = dir.clone();
        }
        if let Some(repo) = &cli.model_repo {
            self.model_repo = Some(repo.clone());
        }
        if let Some(dir) = &cli.upload_dir {
            self.upload_dir = dir.clone();
        }
        if let Some(path) = &cli.metadata_path {
            self.metadata_path = path.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_prefix.starts_with('/') {
            return Err(Error::config(format!(
                "api_prefix must start with '/', got {:?}",
                self.api_prefix
            )));
        }
        if self.top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }
        if self.max_upload_mb == 0 {
            return Err(Error::config("max_upload_mb must be at least 1"));
        }
        if self.retention_cap == 0 {
            return Err(Error::config("retention_cap must be at least 1"));
        }
        Ok(())
    }

    /// API prefix without a trailing slash; empty when routes live at the root
    pub fn api_base(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }

    /// Public URL prefix stored uploads are served under
    pub fn uploads_url_prefix(&self) -> String {
        format!("{}/uploads", self.api_base())
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn model_config(&self) -> ModelConfig {
        match &self.model_repo {
            Some(repo) => ModelConfig::from_hf(repo.clone()),
            None => ModelConfig::from_local(self.model_dir.clone()),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.metadata_path.clone(),
            capacity: self.retention_cap,
        }
    }
}
