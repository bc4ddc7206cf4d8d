//! Carebot web front-end.
//!
//! A server-rendered UI for the assistant service: login and signup, the
//! streaming chat screen, self-service account management, and the admin
//! user grid. All business logic lives behind two remote backends; this
//! process owns only per-browser session state.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod components;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::Span;

pub use config::WebConfig;
pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    routes::routes()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(middleware::create_session_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
                    },
                ),
        )
        .with_state(state)
}

/// Bind and run the server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: WebConfig) -> Result<(), AppError> {
    let addr = config.bind_addr();
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "Web front-end listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("server error: {e}")))
}

/// Liveness probe.
async fn health() -> &'static str {
    "OK"
}

/// Readiness probe: checks the chat backend.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.backend().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "chat backend unreachable")
        }
    }
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
