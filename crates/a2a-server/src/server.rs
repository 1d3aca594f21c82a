use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use a2a_core::ids::SessionToken;
use a2a_engine::{AgentCard, LookupAgent};
use a2a_store::{Clock, ConversationStore, LoginRegistry, SessionRegistry, SystemClock};

use crate::config::ServerConfig;
use crate::event_bridge;
use crate::handlers::{self, HandlerState, Reply};
use crate::orchestrator::StreamingTaskOrchestrator;
use crate::rpc::{RpcRequest, RpcResponse};

/// Header carrying the session token issued by `initialize`.
pub const SESSION_HEADER: &str = "agent-session-id";

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
    pub keep_alive: Duration,
}

/// Wire the production orchestrator and registries around `agent`.
pub fn build_state(config: &ServerConfig, agent: Arc<dyn LookupAgent>) -> Arc<HandlerState> {
    build_state_with_clock(config, agent, Arc::new(SystemClock))
}

/// Like [`build_state`], with every registry reading time from `clock`.
pub fn build_state_with_clock(
    config: &ServerConfig,
    agent: Arc<dyn LookupAgent>,
    clock: Arc<dyn Clock>,
) -> Arc<HandlerState> {
    let orchestrator = Arc::new(StreamingTaskOrchestrator::new(agent, config.orchestrator()));
    Arc::new(HandlerState::new(
        Arc::new(SessionRegistry::with_clock(Arc::clone(&clock))),
        Arc::new(LoginRegistry::with_clock(clock)),
        Arc::new(ConversationStore::new()),
        orchestrator,
        AgentCard::weather(config.public_url()),
    ))
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/agent/message", post(message_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind, serve and start the session sweep. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, handler_state: Arc<HandlerState>) -> Result<ServerHandle, std::io::Error> {
    let shutdown = CancellationToken::new();

    let sweep = config
        .cleanup_interval()
        .map(|every| start_session_sweep(Arc::clone(&handler_state.sessions), every, shutdown.clone()));

    let app_state = AppState {
        handler_state: Arc::clone(&handler_state),
        keep_alive: config.keep_alive(),
    };
    let router = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, "A2A server started");

    let signal = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        handler_state,
        shutdown,
        server,
        sweep,
    })
}

/// Handle returned by `start()`; keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    handler_state: Arc<HandlerState>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
    sweep: Option<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    pub fn state(&self) -> &Arc<HandlerState> {
        &self.handler_state
    }

    /// Cancel live tasks, stop accepting connections and wait for the server
    /// loop to exit.
    pub async fn shutdown(self) {
        let aborted = self.handler_state.orchestrator.abort_all();
        tracing::info!(aborted, "shutting down");
        self.shutdown.cancel();
        if let Err(e) = self.server.await {
            tracing::warn!(error = %e, "server task did not exit cleanly");
        }
        if let Some(sweep) = self.sweep {
            sweep.abort();
        }
    }
}

/// Periodically evict expired sessions until `shutdown` fires.
pub fn start_session_sweep(
    sessions: Arc<SessionRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = sessions.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "session sweep");
                    }
                }
            }
        }
    })
}

/// `POST /agent/message`: one JSON-RPC request in, a JSON envelope or an SSE
/// stream out.
async fn message_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable request body");
            return (StatusCode::BAD_REQUEST, Json(RpcResponse::parse_error())).into_response();
        }
    };

    let id = raw.get("id").cloned();
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(req) => req,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(RpcResponse::invalid_request(id))).into_response(),
    };
    if !request.is_v2() {
        return (StatusCode::BAD_REQUEST, Json(RpcResponse::invalid_request(request.id))).into_response();
    }

    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(SessionToken::from_raw);

    match handlers::dispatch(
        &state.handler_state,
        &request.method,
        request.params.as_ref(),
        request.id,
        session.as_ref(),
    ) {
        Reply::Json(resp) => Json(resp).into_response(),
        Reply::Stream(source) => event_bridge::into_sse(source, state.keep_alive).into_response(),
    }
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.handler_state.health())
}
