//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::BytesMut;
use fishai_core::{ClassificationRecord, Error, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::Settings;
use crate::state::AppState;
use crate::validation::{rejection_reason, validate_content_type, Upload, UploadLimits};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();
    let body_limit = state
        .service
        .limits()
        .max_bytes()
        .saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route(
            "/classify",
            post(classify).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/recent", get(recent))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(&settings.upload_dir));

    let router = Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics));

    let router = match settings.api_base() {
        "" => router.merge(api_routes),
        prefix => router.nest(prefix, api_routes),
    };

    router
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings))
        .with_state(state)
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if settings.cors_allow_any {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "FishAI classifier service" }))
}

async fn health() -> Json<serde_json::Value> {
    metrics::counter!("fishai_requests_total", "endpoint" => "health").increment(1);
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn classify(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationRecord>, AppError> {
    metrics::counter!("fishai_requests_total", "endpoint" => "classify").increment(1);

    let mut multipart = multipart.map_err(|e| ValidationError::Malformed(e.body_text()))?;
    let upload = read_upload(&mut multipart, state.service.limits()).await?;
    let record = state.service.classify(upload).await?;
    Ok(Json(record))
}

/// Pull the `file` field out of the form, enforcing the size limit per chunk
async fn read_upload(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<Upload, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        validate_content_type(content_type.as_deref())?;
        let file_name = field.file_name().unwrap_or_default().to_string();

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limits))? {
            limits.check_len(buf.len() + chunk.len())?;
            buf.extend_from_slice(&chunk);
        }

        return Ok(Upload {
            file_name,
            content_type,
            bytes: buf.freeze(),
        });
    }

    Err(ValidationError::MissingField(FILE_FIELD).into())
}

fn multipart_error(err: MultipartError, limits: &UploadLimits) -> ValidationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        limits.too_large()
    } else {
        ValidationError::Malformed(err.body_text())
    }
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RecentResponse {
    items: Vec<ClassificationRecord>,
}

async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<RecentResponse>, AppError> {
    metrics::counter!("fishai_requests_total", "endpoint" => "recent").increment(1);
    let items = state.service.recent(query.limit).await?;
    Ok(Json(RecentResponse { items }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total_recognitions: usize,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    metrics::counter!("fishai_requests_total", "endpoint" => "stats").increment(1);
    let total_recognitions = state.service.count().await?;
    Ok(Json(StatsResponse { total_recognitions }))
}

async fn fallback() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}

/// Error handling
#[derive(Debug)]
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError(Error::Validation(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self.0 {
            Error::Validation(v) => {
                metrics::counter!("fishai_rejections_total", "reason" => rejection_reason(v))
                    .increment(1);
                warn!("Rejected upload: {}", v);
            }
            Error::Decode(_) => {
                metrics::counter!("fishai_rejections_total", "reason" => "decode").increment(1);
                warn!("Rejected upload: {}", self.0);
            }
            _ => error!("Request failed: {}", self.0),
        }

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error.".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
