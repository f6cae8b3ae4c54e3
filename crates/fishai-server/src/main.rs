//! FishAI Server
//!
//! Classifies uploaded fish images and keeps a bounded provenance log of
//! the results.

use anyhow::{Context, Result};
use clap::Parser;
use fishai_classifiers::{ImageClassifier, LinearProbeClassifier};
use fishai_server::{create_router, AppState, ClassificationService, Cli, Settings};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let settings = Settings::load(&cli)?;
    if cli.print_config {
        print!("{}", serde_yaml::to_string(&settings)?);
        return Ok(());
    }

    info!("Starting FishAI server");
    info!("Model: {:?}", settings.model_config().source);
    info!("Uploads: {}", settings.upload_dir.display());
    info!("Provenance log: {}", settings.metadata_path.display());

    let metrics_handle = init_metrics()?;

    std::fs::create_dir_all(&settings.upload_dir)
        .with_context(|| format!("creating {}", settings.upload_dir.display()))?;
    if let Some(parent) = settings.metadata_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    // Refuse to serve without a model.
    let model_config = settings.model_config();
    let classifier = tokio::task::spawn_blocking(move || LinearProbeClassifier::load(&model_config))
        .await?
        .context("failed to load classifier")?;
    info!(
        "Serving '{}' over {} species",
        classifier.name(),
        classifier.labels().len()
    );

    let service = ClassificationService::from_settings(&settings, Arc::new(classifier));
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let state = AppState::new(settings, service, metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("fishai=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("fishai=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("fishai_requests_total", "Total number of requests by endpoint");
    metrics::describe_counter!(
        "fishai_rejections_total",
        "Uploads rejected before classification, by reason"
    );
    metrics::describe_counter!(
        "fishai_classifications_total",
        "Classifications stored in the provenance log"
    );
    metrics::describe_histogram!(
        "fishai_inference_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
