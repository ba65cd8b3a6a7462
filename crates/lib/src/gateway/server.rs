//! Gateway HTTP server (single port, JSON API).
//!
//! Routes cover the command catalog, the execute pipeline, execution history,
//! and the activity log. Authentication is resolved from config (an operator
//! bearer token, or the local operator on loopback); the execution core only
//! ever sees an already-resolved operator id.

use crate::audit::{ActivityStore, Auditor, ExecutionStore};
use crate::catalog::{CatalogError, CatalogStore, CommandDraft, CommandUpdate};
use crate::config::{self, Config, GatewayAuthMode, Operator};
use crate::gateway::protocol::{
    ActivityQuery, Envelope, ExecuteParams, ExecuteResult, ListQuery, PageMeta, PageQuery,
};
use crate::init;
use crate::pipeline::{self, ExecuteError, RequestOrigin};
use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state for the gateway (config and stores).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogStore>,
    pub executions: Arc<ExecutionStore>,
    pub activities: Arc<ActivityStore>,
    pub auditor: Arc<Auditor>,
}

type ApiReply = (StatusCode, Json<Envelope>);

pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path, &config)?;
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind)
        && (config.gateway.auth.mode != GatewayAuthMode::Token || !config::has_any_token(&config))
    {
        anyhow::bail!(
            "refusing to bind gateway to {} without auth (set gateway.auth.mode to \"token\" and an operator token or RUNBOOK_GATEWAY_TOKEN)",
            bind
        );
    }

    let data_dir = config::resolve_data_dir(&config, &config_path);
    let catalog = Arc::new(CatalogStore::load(data_dir.join("catalog.json")).await);
    let executions = Arc::new(ExecutionStore::load(data_dir.join("executions.json")).await);
    let activities = Arc::new(ActivityStore::load(data_dir.join("activities.json")).await);
    let auditor = Arc::new(Auditor::new(executions.clone(), activities.clone()));

    let state = GatewayState {
        config: Arc::new(config.clone()),
        catalog,
        executions,
        activities,
        auditor,
    };

    let app = router(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/commands", get(list_commands).post(create_command))
        .route(
            "/api/commands/:id",
            get(get_command).put(update_command).delete(delete_command),
        )
        .route("/api/commands/:id/execute", axum::routing::post(execute_command))
        .route("/api/commands/:id/executions", get(command_executions))
        .route("/api/operators/:id/executions", get(operator_executions))
        .route("/api/activities", get(list_activities))
        .with_state(state)
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "runbook",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.config.gateway.port,
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn unauthorized() -> ApiReply {
    (
        StatusCode::UNAUTHORIZED,
        Json(Envelope::err("missing or invalid bearer token")),
    )
}

/// Resolve the acting operator for a request. Mode none maps every request to
/// the local operator; mode token requires a matching bearer.
fn resolve_operator(config: &Config, headers: &HeaderMap) -> Result<Operator, ApiReply> {
    match config.gateway.auth.mode {
        GatewayAuthMode::None => Ok(config::local_operator(config)),
        GatewayAuthMode::Token => {
            let bearer = bearer_token(headers).ok_or_else(unauthorized)?;
            config::operator_for_token(config, bearer).ok_or_else(unauthorized)
        }
    }
}

fn catalog_error_reply(err: CatalogError) -> ApiReply {
    let status = match &err {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::NameTaken => StatusCode::CONFLICT,
        CatalogError::EmptyName
        | CatalogError::EmptyTemplate
        | CatalogError::InvalidKind(_)
        | CatalogError::ParameterNotFound => StatusCode::BAD_REQUEST,
        CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(Envelope::err(err.to_string())))
}

fn execute_error_reply(err: ExecuteError) -> ApiReply {
    match &err {
        ExecuteError::Disabled => (StatusCode::FORBIDDEN, Json(Envelope::err(err.to_string()))),
        ExecuteError::Validation(e) => (StatusCode::BAD_REQUEST, Json(Envelope::err(e.to_string()))),
        ExecuteError::AuditWrite(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::err(err.to_string())),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::err(format!("command execution failed: {}", err))),
        ),
    }
}

/// GET /api/commands — list the catalog, optionally filtered.
async fn list_commands(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiReply {
    if let Err(reply) = resolve_operator(&state.config, &headers) {
        return reply;
    }
    let commands = state
        .catalog
        .list(query.category.as_deref(), query.enabled)
        .await;
    (
        StatusCode::OK,
        Json(Envelope::ok("commands retrieved", json!(commands))),
    )
}

/// POST /api/commands — create a command with its parameters.
async fn create_command(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(draft): Json<CommandDraft>,
) -> ApiReply {
    let operator = match resolve_operator(&state.config, &headers) {
        Ok(op) => op,
        Err(reply) => return reply,
    };
    match state.catalog.create(draft).await {
        Ok(command) => {
            state
                .auditor
                .record_activity(
                    operator.id,
                    "command_create",
                    &format!("Command created: {}", command.name),
                    &addr.ip().to_string(),
                    &user_agent(&headers),
                )
                .await;
            (
                StatusCode::CREATED,
                Json(Envelope::ok("command created", json!(command))),
            )
        }
        Err(err) => catalog_error_reply(err),
    }
}

/// GET /api/commands/:id — fetch one command with its parameters.
async fn get_command(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> ApiReply {
    if let Err(reply) = resolve_operator(&state.config, &headers) {
        return reply;
    }
    match state.catalog.get(id).await {
        Some(command) => (
            StatusCode::OK,
            Json(Envelope::ok("command retrieved", json!(command))),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(Envelope::err("command not found")),
        ),
    }
}

/// PUT /api/commands/:id — update fields and parameters.
async fn update_command(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(update): Json<CommandUpdate>,
) -> ApiReply {
    let operator = match resolve_operator(&state.config, &headers) {
        Ok(op) => op,
        Err(reply) => return reply,
    };
    match state.catalog.update(id, update).await {
        Ok(command) => {
            state
                .auditor
                .record_activity(
                    operator.id,
                    "command_update",
                    &format!("Command updated: {}", command.name),
                    &addr.ip().to_string(),
                    &user_agent(&headers),
                )
                .await;
            (
                StatusCode::OK,
                Json(Envelope::ok("command updated", json!(command))),
            )
        }
        Err(err) => catalog_error_reply(err),
    }
}

/// DELETE /api/commands/:id — delete a command; history is retained.
async fn delete_command(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> ApiReply {
    let operator = match resolve_operator(&state.config, &headers) {
        Ok(op) => op,
        Err(reply) => return reply,
    };
    match state.catalog.delete(id).await {
        Ok(command) => {
            state
                .auditor
                .record_activity(
                    operator.id,
                    "command_delete",
                    &format!("Command deleted: {}", command.name),
                    &addr.ip().to_string(),
                    &user_agent(&headers),
                )
                .await;
            (
                StatusCode::OK,
                Json(Envelope::ok("command deleted", json!({ "id": command.id }))),
            )
        }
        Err(err) => catalog_error_reply(err),
    }
}

/// POST /api/commands/:id/execute — run the pipeline for one command.
async fn execute_command(
    State(state): State<GatewayState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(params): Json<ExecuteParams>,
) -> ApiReply {
    let operator = match resolve_operator(&state.config, &headers) {
        Ok(op) => op,
        Err(reply) => return reply,
    };
    // Snapshot read: concurrent catalog edits do not affect this invocation.
    let Some(command) = state.catalog.get(id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(Envelope::err("command not found")),
        );
    };

    let origin = RequestOrigin {
        operator_id: operator.id,
        ip_address: addr.ip().to_string(),
        user_agent: user_agent(&headers),
    };

    match pipeline::execute(&command, &params.parameters, &origin, &state.auditor).await {
        Ok(record) => {
            let result = ExecuteResult {
                execution_id: record.id,
                command: command.name,
                result: record.result,
                duration_ms: record.duration_ms,
                status: record.status.as_str().to_string(),
            };
            (
                StatusCode::OK,
                Json(Envelope::ok("command executed", json!(result))),
            )
        }
        Err(err) => execute_error_reply(err),
    }
}

/// GET /api/commands/:id/executions — execution history for a command.
async fn command_executions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(page): Query<PageQuery>,
) -> ApiReply {
    if let Err(reply) = resolve_operator(&state.config, &headers) {
        return reply;
    }
    let (records, total) = state
        .executions
        .list_for_command(id, page.limit(), page.offset())
        .await;
    (
        StatusCode::OK,
        Json(Envelope::ok_paged(
            "executions retrieved",
            json!(records),
            PageMeta {
                total,
                limit: page.limit(),
                offset: page.offset(),
            },
        )),
    )
}

/// GET /api/operators/:id/executions — execution history for an operator.
async fn operator_executions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(page): Query<PageQuery>,
) -> ApiReply {
    if let Err(reply) = resolve_operator(&state.config, &headers) {
        return reply;
    }
    let (records, total) = state
        .executions
        .list_for_operator(id, page.limit(), page.offset())
        .await;
    (
        StatusCode::OK,
        Json(Envelope::ok_paged(
            "executions retrieved",
            json!(records),
            PageMeta {
                total,
                limit: page.limit(),
                offset: page.offset(),
            },
        )),
    )
}

/// GET /api/activities — activity log, newest first.
async fn list_activities(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> ApiReply {
    if let Err(reply) = resolve_operator(&state.config, &headers) {
        return reply;
    }
    let page = query.page();
    let (records, total) = state
        .activities
        .list(query.activity_type.as_deref(), page.limit(), page.offset())
        .await;
    (
        StatusCode::OK,
        Json(Envelope::ok_paged(
            "activities retrieved",
            json!(records),
            PageMeta {
                total,
                limit: page.limit(),
                offset: page.offset(),
            },
        )),
    )
}
