use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{Method, StatusCode, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use vhadmin_process::{ActionOutcome, ActionRequest, ServerAction, ServerName, StatusResponse};

use crate::{
    dispatch::dispatch,
    error::ApiError,
    reconcile::{reconcile, reconcile_all},
    request_meta::{self, RequestMeta},
    state::AppState,
};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// `/healthz` and `/actions`, with everything else falling through to the
/// status endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/actions", get(recent_actions))
        .fallback(status_endpoint)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_meta::request_id))
        .with_state(state)
}

/// True for `api_path` itself and every path below it.
pub fn within_api_path(api_path: &str, path: &str) -> bool {
    if api_path == "/" {
        return true;
    }
    match path.strip_prefix(api_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// GET reads, POST writes. HEAD is refused too so it cannot trigger probes.
async fn status_endpoint(
    State(state): State<AppState>,
    meta: Option<Extension<RequestMeta>>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if !within_api_path(&state.config.api_path, uri.path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    if method == Method::GET {
        list_status(State(state)).await.into_response()
    } else if method == Method::POST {
        apply_action(State(state), meta, body).await.into_response()
    } else {
        (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, POST")]).into_response()
    }
}

pub async fn list_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        servers: reconcile_all(&state).await,
    })
}

/// Validates server then action, dispatches, and answers with a fresh status
/// map where the target carries its optimistic state.
pub async fn apply_action(
    State(state): State<AppState>,
    meta: Option<Extension<RequestMeta>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::info!(%rejection, "request body over limit");
            ApiError::BodyTooLarge
        } else {
            tracing::warn!(%rejection, "failed to read request body");
            ApiError::BodyUnreadable
        }
    })?;
    let req: ActionRequest = serde_json::from_slice(&bytes).map_err(|err| {
        tracing::info!(%err, "malformed action request");
        ApiError::MalformedBody
    })?;

    let name = ServerName(req.server);
    let Some(physical) = state.config.physical_id(&name).cloned() else {
        tracing::info!(server = %name, "rejecting action for unknown server");
        return Err(ApiError::UnknownServer);
    };
    let action = req.action.parse::<ServerAction>().map_err(|err| {
        tracing::info!(server = %name, %err, "rejecting unknown action");
        ApiError::UnknownAction
    })?;

    let request_id = meta.map(|Extension(m)| m.request_id).unwrap_or_default();
    let optimistic = dispatch(&state, &name, &physical, action, &request_id);

    // The target's entry is overridden anyway, so only the others are probed.
    let mut servers = reconcile(&state, Some(&name)).await;
    servers.insert(name, optimistic);
    Ok(Json(StatusResponse { servers }))
}

#[derive(Debug, Serialize)]
pub struct HealthzResponse {
    status: &'static str,
    version: &'static str,
    servers: usize,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthzResponse> {
    Json(HealthzResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        servers: state.config.servers.len(),
    })
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    actions: Vec<ActionOutcome>,
}

async fn recent_actions(State(state): State<AppState>) -> Json<ActionsResponse> {
    Json(ActionsResponse {
        actions: state.outcomes.recent(),
    })
}
