//! HTTP adapter: axum routes around the intake pipeline.

pub mod cors;
pub mod response;

use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::context::ClientContext;
use crate::pipeline::{IntakeDeps, process_lead_submission};

pub use cors::CorsPolicy;
pub use response::LeadResponse;

/// Largest accepted request body. Enforced in the handler so oversized
/// requests still get a JSON answer with CORS headers.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Paths the form has posted to over time. All run the same pipeline.
pub const LEAD_PATHS: [&str; 3] = ["/api/lead", "/api/submit-lead", "/.netlify/functions/lead"];

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub deps: IntakeDeps,
    pub cors: CorsPolicy,
}

/// Build the router: lead endpoints plus health.
pub fn lead_routes(deps: IntakeDeps, cors: CorsPolicy) -> Router {
    let state = ApiState { deps, cors };

    let mut router = Router::new().route("/health", get(health));
    for path in LEAD_PATHS {
        router = router.route(path, any(lead_handler));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "lead-intake"
    }))
}

// ── Lead endpoint ───────────────────────────────────────────────────────

async fn lead_handler(State(state): State<ApiState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let mut resp = if parts.method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ctx = ClientContext::from_request(parts.method.clone(), &parts.headers, peer);

        match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => match process_lead_submission(&bytes, &ctx, &state.deps).await {
                Ok(accepted) => accepted.into_response(),
                Err(e) => e.into_response(),
            },
            Err(e) => {
                warn!(client = %ctx.client_id, error = %e, "Request body rejected");
                LeadResponse::failure("Request body too large")
                    .with_status(StatusCode::PAYLOAD_TOO_LARGE)
            }
        }
    };

    state.cors.apply(&parts.headers, resp.headers_mut());
    resp
}
