use std::{sync::Arc, time::{Duration, Instant}};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Json as BodyJson, Router,
};
use http_body_util::BodyExt;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::{
    dns::{Changes, Endpoint},
    error::ProviderError,
    provider::{Cancel, Provider},
};

// Content-Type required by the external-dns webhook protocol
const WEBHOOK_CT: &str = "application/external.dns.webhook+json;version=1";

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    /// Flips to `true` when the process is shutting down.
    pub shutdown: watch::Receiver<bool>,
    /// Budget for a single provider operation.
    pub request_timeout: Duration,
}

impl AppState {
    fn cancel(&self) -> Cancel {
        Cancel::on_shutdown(self.shutdown.clone()).with_deadline(Instant::now() + self.request_timeout)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/",                get(negotiate))
        .route("/records",         get(get_records))
        .route("/records",         post(apply_changes))
        .route("/adjustendpoints", post(adjust_endpoints))
        // log_request_body runs before handlers; only logs at DEBUG level
        .layer(middleware::from_fn(log_request_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request body logging middleware
//
// Only active at DEBUG level or below. Reads the full body into memory,
// logs it, then puts it back so the actual handler can still deserialise it.
// ─────────────────────────────────────────────────────────────────────────────

async fn log_request_body(req: Request, next: Next) -> Response {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("failed to read request body: {e}");
            return next.run(Request::from_parts(parts, Body::empty())).await;
        }
    };

    let body_str = std::str::from_utf8(&bytes)
        .map(|s| {
            // Pretty-print if it's valid JSON, otherwise show raw
            serde_json::from_str::<serde_json::Value>(s)
                .map(|v| serde_json::to_string_pretty(&v).unwrap_or_else(|_| s.to_string()))
                .unwrap_or_else(|_| s.to_string())
        })
        .unwrap_or_else(|_| format!("<{} binary bytes>", bytes.len()));

    debug!(
        method = %parts.method,
        path   = %parts.uri.path(),
        body   = %body_str,
        "← request body"
    );

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn webhook_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert("Content-Type", HeaderValue::from_static(WEBHOOK_CT));
    h
}

// ── GET / ─────────────────────────────────────────────────────────────────────
// Domain-filter negotiation.

async fn negotiate(State(state): State<AppState>) -> impl IntoResponse {
    (webhook_headers(), Json(state.provider.domain_filter()))
}

// ── GET /records ──────────────────────────────────────────────────────────────

async fn get_records(State(state): State<AppState>) -> Response {
    match state.provider.records(&state.cancel()).await {
        Ok(eps) => {
            info!("GET /records → {} endpoint(s)", eps.len());
            (webhook_headers(), Json(eps)).into_response()
        }
        Err(e) => {
            error!("GET /records error: {e}");
            error_response(&e)
        }
    }
}

// ── POST /records ─────────────────────────────────────────────────────────────
//
// Per-record failures are logged by the provider and do not fail the request;
// external-dns picks up any drift on its next pass.

async fn apply_changes(
    State(state): State<AppState>,
    BodyJson(changes): BodyJson<Changes>,
) -> Response {
    match state.provider.apply_changes(&state.cancel(), changes).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("POST /records error: {e}");
            error_response(&e)
        }
    }
}

// ── POST /adjustendpoints ─────────────────────────────────────────────────────

async fn adjust_endpoints(
    State(state): State<AppState>,
    BodyJson(endpoints): BodyJson<Vec<Endpoint>>,
) -> Response {
    match state.provider.adjust_endpoints(&state.cancel(), endpoints).await {
        Ok(eps) => (webhook_headers(), Json(eps)).into_response(),
        Err(e) => {
            error!("POST /adjustendpoints error: {e}");
            error_response(&e)
        }
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn error_response(e: &ProviderError) -> Response {
    let status = match e {
        ProviderError::UnpairedUpdate { .. } => StatusCode::BAD_REQUEST,
        ProviderError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
}
