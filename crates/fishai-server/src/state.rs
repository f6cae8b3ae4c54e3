use crate::config::Settings;
use crate::service::ClassificationService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<ClassificationService>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        settings: Settings,
        service: ClassificationService,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            service: Arc::new(service),
            metrics_handle,
        }
    }
}
