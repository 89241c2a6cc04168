use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::{Health, ServiceStatus};
use service::errors::RelayError;
use service::relay::{RelayService, UploadReceipt};
use service::storage::SlotInfo;
use service::tier::Tier;

use crate::auth::provided_upload_key;
use crate::errors::ApiError;
use crate::observability;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
}

/// Router knobs taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_body_bytes: usize,
    pub dashboard_dir: Option<PathBuf>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { max_body_bytes: 1024 * 1024, dashboard_dir: None }
    }
}

impl From<&configs::AppConfig> for RouterOptions {
    fn from(cfg: &configs::AppConfig) -> Self {
        Self {
            max_body_bytes: cfg.server.max_body_bytes,
            dashboard_dir: cfg.storage.dashboard_dir.clone(),
        }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ok",
        time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        message: "PH arbitrage relay live",
        writes_enabled: state.relay.writes_enabled(),
    })
}

async fn metrics() -> (StatusCode, String) {
    observability::encode_metrics()
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadReceipt>, ApiError> {
    match state.relay.upload(provided_upload_key(&headers), &body).await {
        Ok(receipt) => {
            observability::record_upload(receipt.tier.as_str(), "ok");
            Ok(Json(receipt))
        }
        Err(e) => {
            observability::record_upload("unknown", e.code());
            Err(e.into())
        }
    }
}

/// Snapshot response. Dashboards poll these, so nothing may be cached.
fn snapshot_response(
    tier: &str,
    res: Result<Value, RelayError>,
) -> Result<impl IntoResponse, ApiError> {
    match res {
        Ok(doc) => {
            observability::record_fetch(tier, "ok");
            Ok(([(header::CACHE_CONTROL, "no-store")], Json(doc)))
        }
        Err(e) => {
            observability::record_fetch(tier, e.code());
            Err(e.into())
        }
    }
}

async fn free_snapshot(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    snapshot_response("free", state.relay.fetch(Tier::Free).await)
}

async fn pro_snapshot(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    snapshot_response("pro", state.relay.fetch(Tier::Pro).await)
}

async fn snapshot_by_tier(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.relay.fetch_named(&tier).await;
    let label = tier.parse::<Tier>().map(|t| t.as_str()).unwrap_or("unknown");
    snapshot_response(label, res)
}

async fn snapshot_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let label = Tier::from_file_name(&file).map(|t| t.as_str()).unwrap_or("unknown");
    snapshot_response(label, state.relay.fetch_file(&file).await)
}

async fn list_snapshots(State(state): State<AppState>) -> Result<Json<Vec<SlotInfo>>, ApiError> {
    Ok(Json(state.relay.list_available().await?))
}

/// Build the full application router: upload, snapshot reads, introspection,
/// health/metrics, and the optional dashboard fallback.
pub fn build_router(state: AppState, cors: CorsLayer, options: RouterOptions) -> Router {
    let snapshots = Router::new()
        .route("/free_data.json", get(free_snapshot))
        .route("/pro_data.json", get(pro_snapshot))
        .route("/free", get(free_snapshot))
        .route("/pro", get(pro_snapshot))
        .route("/data/:file", get(snapshot_file))
        .route("/api/snapshots", get(list_snapshots))
        .route("/api/snapshots/:tier", get(snapshot_by_tier));

    let write = Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(options.max_body_bytes));

    let ops = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics));

    let router = snapshots.merge(write).merge(ops);

    // 配置了 dashboard 目录时由静态文件服务接管 `/`，否则 `/` 返回状态信息
    let router = match options.dashboard_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(status)),
    };

    router
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
