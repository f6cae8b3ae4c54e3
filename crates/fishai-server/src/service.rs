//! Classification orchestration
//!
//! Validate, predict, store the upload, then log provenance. A record only
//! reaches the log once its image is durably stored.

use crate::config::Settings;
use crate::validation::{validate_upload, Upload, UploadLimits};
use fishai_classifiers::{ImageClassifier, Predictor};
use fishai_core::{ClassificationRecord, Error, Result};
use fishai_provenance::{ProvenanceStore, UploadSink};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Records returned by `recent` when no limit is given
pub const DEFAULT_RECENT_LIMIT: usize = 12;

/// Upper bound for `recent`
pub const MAX_RECENT_LIMIT: usize = 50;

pub struct ClassificationService {
    predictor: Predictor,
    store: Arc<ProvenanceStore>,
    sink: Arc<UploadSink>,
    limits: UploadLimits,
}

impl ClassificationService {
    pub fn new(
        predictor: Predictor,
        store: Arc<ProvenanceStore>,
        sink: Arc<UploadSink>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            predictor,
            store,
            sink,
            limits,
        }
    }

    /// Wire up the service from settings around an already-loaded classifier
    pub fn from_settings(settings: &Settings, classifier: Arc<dyn ImageClassifier>) -> Self {
        Self::new(
            Predictor::new(classifier, settings.top_k),
            Arc::new(ProvenanceStore::new(settings.store_config())),
            Arc::new(UploadSink::new(
                settings.upload_dir.clone(),
                settings.uploads_url_prefix(),
            )),
            UploadLimits::from_mb(settings.max_upload_mb),
        )
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Classify an upload and log it.
    ///
    /// Nothing is stored when validation or inference fails.
    #[instrument(skip_all, fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    pub async fn classify(&self, upload: Upload) -> Result<ClassificationRecord> {
        validate_upload(&upload, &self.limits)?;

        let started = Instant::now();
        let record = self
            .predictor
            .predict(&upload.file_name, &upload.bytes, self.predictor.default_k())
            .await?;
        metrics::histogram!("fishai_inference_latency_us")
            .record(started.elapsed().as_micros() as f64);

        let sink = Arc::clone(&self.sink);
        let pending = record.clone();
        let bytes = upload.bytes;
        let url = blocking(move || sink.store(&pending, &bytes)).await?;
        let record = record.with_image_url(url);

        let store = Arc::clone(&self.store);
        let logged = record.clone();
        blocking(move || store.append(&logged)).await?;

        metrics::counter!("fishai_classifications_total").increment(1);
        info!(id = %record.id, "{}", record.description);
        Ok(record)
    }

    /// Most recent records; `limit` defaults to 12 and is clamped to `[1, 50]`
    pub async fn recent(&self, limit: Option<i64>) -> Result<Vec<ClassificationRecord>> {
        let limit = clamp_limit(limit);
        let store = Arc::clone(&self.store);
        blocking(move || store.list_recent(limit)).await
    }

    /// Number of retained records
    pub async fn count(&self) -> Result<usize> {
        let store = Arc::clone(&self.store);
        blocking(move || store.count()).await
    }
}

pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_RECENT_LIMIT,
        Some(n) => n.clamp(1, MAX_RECENT_LIMIT as i64) as usize,
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {}", e)))?
}
