//! HTTP control surface.
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Starting a repost session for a keyword
//! - Stopping the running session
//! - Querying session state

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::browser::{BrowserLauncher, Credential};
use crate::config::AgentConfig;
use crate::supervisor::{SessionParams, SessionState, Supervisor};

/// Server state shared across handlers.
pub struct ControlState {
    config: AgentConfig,
    launcher: Arc<dyn BrowserLauncher>,
    /// Supervisor of the most recent session, kept after it stops so its
    /// state stays observable until a replacement starts.
    active: Mutex<Option<Arc<Supervisor>>>,
}

impl ControlState {
    #[must_use]
    pub fn new(config: AgentConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config,
            launcher,
            active: Mutex::new(None),
        }
    }

    async fn current(&self) -> Option<Arc<Supervisor>> {
        self.active.lock().await.clone()
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ControlState>) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/start_bot", post(start_handler))
        .route("/api/stop_bot", post(stop_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(&state.config.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.with_state(state)
}

/// Start the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the address.
pub async fn run_server(state: Arc<ControlState>, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Reposter control server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();
    info!(origins = ?origins, "CORS enabled");

    Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .allow_origin(allowed),
    )
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Session start request. Every field is required and must be non-empty.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub access_token: String,
    pub keyword: String,
    pub email: String,
    pub password: String,
}

impl StartRequest {
    fn is_complete(&self) -> bool {
        [&self.access_token, &self.keyword, &self.email, &self.password]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    fn into_params(self) -> SessionParams {
        SessionParams {
            access_token: self.access_token,
            search_keyword: self.keyword,
            credential: Some(Credential::new(self.email, self.password)),
        }
    }
}

#[derive(Debug, Serialize)]
struct StartResponse {
    started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StopResponse {
    stopped: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    state: SessionState,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn start_handler(
    State(state): State<Arc<ControlState>>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> axum::response::Response {
    let request = match body {
        Ok(Json(request)) if request.is_complete() => request,
        Ok(_) => {
            return bad_request("Missing access_token, keyword, email, or password".to_string())
        }
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    // Held across the replace so concurrent starts serialize.
    let mut active = state.active.lock().await;
    if let Some(current) = active.as_ref() {
        let current_state = current.state();
        if current_state != SessionState::Idle {
            warn!(state = ?current_state, "Refusing to start while a session is active");
            return (
                StatusCode::CONFLICT,
                Json(StartResponse {
                    started: false,
                    error: Some(format!("Session is {current_state:?}, stop it first")),
                }),
            )
                .into_response();
        }
    }

    let keyword = request.keyword.clone();
    let supervisor = match Supervisor::new(
        request.into_params(),
        state.config.clone(),
        Arc::clone(&state.launcher),
    ) {
        Ok(supervisor) => Arc::new(supervisor),
        Err(e) => {
            error!(error = %e, "Failed to create supervisor");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StartResponse {
                    started: false,
                    error: Some(e.to_string()),
                }),
            )
                .into_response();
        }
    };

    let started = supervisor.start().await;
    *active = Some(supervisor);
    info!(keyword = %keyword, started, "Start requested");

    let status = if started {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    (
        status,
        Json(StartResponse {
            started,
            error: None,
        }),
    )
        .into_response()
}

async fn stop_handler(State(state): State<Arc<ControlState>>) -> impl IntoResponse {
    let stopped = match state.current().await {
        Some(supervisor) => supervisor.stop().await,
        None => false,
    };
    info!(stopped, "Stop requested");

    let status = if stopped {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    (status, Json(StopResponse { stopped }))
}

async fn status_handler(State(state): State<Arc<ControlState>>) -> impl IntoResponse {
    let session_state = state
        .current()
        .await
        .map_or(SessionState::Idle, |supervisor| supervisor.state());
    Json(StatusResponse {
        state: session_state,
    })
}

fn bad_request(error: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}
