use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

/// Liveness and readiness flags shared between `main` and the health server.
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    healthy: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
}

impl HealthStatus {
    pub fn set_healthy(&self, value: bool) {
        self.healthy.store(value, Ordering::SeqCst);
    }

    pub fn set_ready(&self, value: bool) {
        self.ready.store(value, Ordering::SeqCst);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

pub fn router(status: HealthStatus) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(status)
}

// ── GET /healthz ──────────────────────────────────────────────────────────────

async fn healthz(State(status): State<HealthStatus>) -> impl IntoResponse {
    probe(status.is_healthy())
}

// ── GET /readyz ───────────────────────────────────────────────────────────────

async fn readyz(State(status): State<HealthStatus>) -> impl IntoResponse {
    probe(status.is_ready())
}

fn probe(ok: bool) -> impl IntoResponse {
    if ok {
        (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unavailable"})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn probes_follow_flags() {
        let status = HealthStatus::default();
        let app = router(status.clone());

        assert_eq!(status_of(app.clone(), "/healthz").await, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(app.clone(), "/readyz").await, StatusCode::SERVICE_UNAVAILABLE);

        status.set_healthy(true);
        assert_eq!(status_of(app.clone(), "/healthz").await, StatusCode::OK);
        assert_eq!(status_of(app.clone(), "/readyz").await, StatusCode::SERVICE_UNAVAILABLE);

        status.set_ready(true);
        assert_eq!(status_of(app.clone(), "/readyz").await, StatusCode::OK);

        status.set_healthy(false);
        status.set_ready(false);
        assert_eq!(status_of(app, "/healthz").await, StatusCode::SERVICE_UNAVAILABLE);
    }
}
