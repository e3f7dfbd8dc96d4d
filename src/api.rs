// src/api.rs
//! HTTP surface: public read paths, the moderation/promotion admin actions and the
//! crawl trigger. Admin writes require the `x-moderator-id` header.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::config::Settings;
use crate::error::{RunError, StoreError, WorkflowError};
use crate::ingest::config::SourceCatalogue;
use crate::ingest::providers::build_http_client;
use crate::ingest::{run_once, RunSummary};
use crate::listing::{BannerLocation, ListingItem, ListingType, RunLog};
use crate::moderation::{self, ModeratorId};
use crate::promotion::{self, Direction};
use crate::store::Repository;

pub const MODERATOR_HEADER: &str = "x-moderator-id";
const DEFAULT_RUNS_LIMIT: usize = 20;
const MAX_RUNS_LIMIT: usize = 200;

/// Everything the crawl trigger needs; one run at a time per process.
pub struct Crawler {
    catalogue: SourceCatalogue,
    settings: Settings,
    client: reqwest::Client,
    running: Mutex<()>,
}

impl Crawler {
    pub fn new(catalogue: SourceCatalogue, settings: Settings) -> anyhow::Result<Self> {
        catalogue.validate()?;
        let client = build_http_client(settings.fetch_timeout)?;
        Ok(Self {
            catalogue,
            settings,
            client,
            running: Mutex::new(()),
        })
    }

    /// Run the orchestrator once over every group, or only `group`.
    pub async fn crawl(
        &self,
        repo: &dyn Repository,
        group: Option<&str>,
    ) -> Result<RunSummary, ApiError> {
        let _guard = self.running.lock().await;
        let groups = self
            .catalogue
            .build_groups(group, &self.settings, &self.client)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(run_once(repo, &groups, &self.settings.run_options()).await?)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub crawler: Arc<Crawler>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, crawler: Crawler) -> Self {
        Self {
            repo,
            crawler: Arc::new(crawler),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/listings", get(list_published))
        .route("/banners", get(list_banners))
        .route("/admin/queue", get(admin_queue))
        .route("/admin/listings/{id}", delete(admin_delete))
        .route("/admin/listings/{id}/approve", post(admin_approve))
        .route("/admin/listings/{id}/reject", post(admin_reject))
        .route("/admin/listings/{id}/promote", post(admin_promote))
        .route("/admin/listings/{id}/demote", post(admin_demote))
        .route("/admin/listings/{id}/reorder", post(admin_reorder))
        .route("/admin/crawl", post(admin_crawl))
        .route("/admin/runs", get(admin_runs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Workflow(WorkflowError),
    Run(RunError),
    BadRequest(String),
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError::Workflow(e)
    }
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        ApiError::Run(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Workflow(WorkflowError::Store(e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Workflow(e) => {
                let status = match e {
                    WorkflowError::MissingModerator => StatusCode::UNAUTHORIZED,
                    WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                    WorkflowError::InvalidTransition { .. } | WorkflowError::Inconsistent(_) => {
                        StatusCode::CONFLICT
                    }
                    WorkflowError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.to_string())
            }
            ApiError::Run(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
        };
        if status.is_server_error() {
            tracing::error!(target: "api", %status, error = %msg, "request failed");
        } else {
            tracing::debug!(target: "api", %status, error = %msg, "request refused");
        }
        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

fn moderator(headers: &HeaderMap) -> Result<ModeratorId, ApiError> {
    let raw = headers
        .get(MODERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Ok(ModeratorId::new(raw)?)
}

#[derive(Deserialize)]
struct ListingsQuery {
    #[serde(rename = "type", default)]
    item_type: Option<String>,
}

async fn list_published(
    State(state): State<AppState>,
    Query(q): Query<ListingsQuery>,
) -> Result<Json<Vec<ListingItem>>, ApiError> {
    let ty = q
        .item_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<ListingType>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(moderation::published(state.repo.as_ref(), ty)?))
}

#[derive(Deserialize)]
struct BannersQuery {
    #[serde(default)]
    location: Option<String>,
}

async fn list_banners(
    State(state): State<AppState>,
    Query(q): Query<BannersQuery>,
) -> Result<Json<Vec<ListingItem>>, ApiError> {
    let page = q
        .location
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<BannerLocation>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(promotion::banners(state.repo.as_ref(), page)?))
}

async fn admin_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ListingItem>>, ApiError> {
    moderator(&headers)?;
    Ok(Json(moderation::pending_queue(state.repo.as_ref())?))
}

async fn admin_approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ListingItem>, ApiError> {
    let by = moderator(&headers)?;
    Ok(Json(moderation::approve(
        state.repo.as_ref(),
        &id,
        &by,
        Utc::now(),
    )?))
}

async fn admin_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let by = moderator(&headers)?;
    moderation::reject(state.repo.as_ref(), &id, &by)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let by = moderator(&headers)?;
    moderation::delete(state.repo.as_ref(), &id, &by)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct PromoteReq {
    location: BannerLocation,
}

async fn admin_promote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<PromoteReq>,
) -> Result<Json<ListingItem>, ApiError> {
    let by = moderator(&headers)?;
    Ok(Json(promotion::promote(
        state.repo.as_ref(),
        &id,
        body.location,
        &by,
    )?))
}

async fn admin_demote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ListingItem>, ApiError> {
    let by = moderator(&headers)?;
    Ok(Json(promotion::demote(state.repo.as_ref(), &id, &by)?))
}

#[derive(Deserialize)]
struct ReorderReq {
    direction: Direction,
}

async fn admin_reorder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReorderReq>,
) -> Result<Json<ListingItem>, ApiError> {
    let by = moderator(&headers)?;
    Ok(Json(promotion::reorder(
        state.repo.as_ref(),
        &id,
        body.direction,
        &by,
    )?))
}

#[derive(Deserialize)]
struct CrawlQuery {
    #[serde(default)]
    group: Option<String>,
}

async fn admin_crawl(
    State(state): State<AppState>,
    Query(q): Query<CrawlQuery>,
    headers: HeaderMap,
) -> Result<Json<RunSummary>, ApiError> {
    let by = moderator(&headers)?;
    let group = q.group.as_deref().filter(|s| !s.trim().is_empty());
    tracing::info!(target: "api", moderator = by.as_str(), group = ?group, "crawl requested");
    let summary = state.crawler.crawl(state.repo.as_ref(), group).await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
struct RunsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn admin_runs(
    State(state): State<AppState>,
    Query(q): Query<RunsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<RunLog>>, ApiError> {
    moderator(&headers)?;
    let limit = q.limit.unwrap_or(DEFAULT_RUNS_LIMIT).min(MAX_RUNS_LIMIT);
    Ok(Json(state.repo.list_run_logs(limit)?))
}
