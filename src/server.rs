//! HTTP server exposing the work-item tree over a small REST API.

use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::TreeConfig;
use crate::db::Database;
use crate::engine::sort_tree;
use crate::error::{ApiError, ApiResult, EngineResult, ErrorCode};
use crate::types::{ItemId, ItemPatch, ItemPayload, ProjectId, TaskNode, WorkItem};

/// Seconds a client should wait before retrying after a store failure.
const RETRY_AFTER_SECS: &str = "1";

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    tree_config: Arc<TreeConfig>,
}

impl AppState {
    pub fn new(db: Arc<Database>, tree_config: TreeConfig) -> Self {
        Self {
            db,
            tree_config: Arc::new(tree_config),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::NotFound | ErrorCode::ParentNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidDepth | ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = ?self.code, message = %self.message, details = ?self.details, "request failed");
        }
        if self.is_retryable() {
            return (status, [(RETRY_AFTER, RETRY_AFTER_SECS)], Json(self)).into_response();
        }
        (status, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_value("body", &rejection.body_text())
    }
}

/// Run a database call off the async runtime.
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || f(db.as_ref()))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Body of `POST /api/items`.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub project_id: ProjectId,
    /// Parent item id; ignored for tasks.
    #[serde(default)]
    pub parent_id: ItemId,
    pub depth: i64,
    #[serde(flatten)]
    pub payload: ItemPayload,
}

async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<CreateItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WorkItem>)> {
    let Json(request) = body?;
    if request.payload.title.trim().is_empty() {
        return Err(ApiError::invalid_value("title", "title must not be empty"));
    }

    let item = blocking(&state, move |db| {
        db.create_item(
            request.project_id,
            request.parent_id,
            request.depth,
            request.payload,
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> ApiResult<Json<WorkItem>> {
    blocking(&state, move |db| db.get_item(item_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, format!("item not found: {item_id}")))
}

async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    body: Result<Json<ItemPatch>, JsonRejection>,
) -> ApiResult<Json<WorkItem>> {
    let Json(patch) = body?;
    if matches!(patch.title.as_deref(), Some(t) if t.trim().is_empty()) {
        return Err(ApiError::invalid_value("title", "title must not be empty"));
    }

    let item = blocking(&state, move |db| db.update_item(item_id, &patch)).await?;
    Ok(Json(item))
}

/// Response of `DELETE /api/items/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stray_ids: Vec<ItemId>,
}

async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> ApiResult<Json<DeleteResponse>> {
    let report = blocking(&state, move |db| db.delete_subtree(item_id)).await?;
    Ok(Json(DeleteResponse {
        success: true,
        deleted_count: report.deleted_count,
        stray_ids: report.stray_ids,
    }))
}

async fn list_items(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Json<Vec<WorkItem>>> {
    let items = blocking(&state, move |db| db.list_items(project_id)).await?;
    Ok(Json(items))
}

/// Query parameters for the tree endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Response of `GET /api/projects/{project_id}/tree`.
#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub project_id: ProjectId,
    pub tasks: Vec<TaskNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<ItemId>,
}

async fn project_tree(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<TreeResponse>> {
    let report = blocking(&state, move |db| db.project_tree(project_id)).await?;
    let mut tasks = report.roots;

    if let Some((key, order)) = state
        .tree_config
        .resolve_sort(query.sort.as_deref(), query.order.as_deref())
    {
        sort_tree(&mut tasks, key, order);
    }

    Ok(Json(TreeResponse {
        project_id,
        tasks,
        orphans: report.orphans,
    }))
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/items", post(create_item))
        .route(
            "/api/items/{item_id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/api/projects/{project_id}/items", get(list_items))
        .route("/api/projects/{project_id}/tree", get(project_tree))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("server task failed: {}", e);
        }
    }
}

/// Bind and serve in the background.
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<ServerHandle> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;

    info!("task-tree API listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("task-tree API shutting down");
            })
            .await
        {
            error!("server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx,
        task,
    })
}
