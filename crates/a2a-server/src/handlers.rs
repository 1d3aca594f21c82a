//! RPC method handlers for `/agent/message`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use a2a_core::ids::{LoginToken, SessionToken, TaskId};
use a2a_core::messages::AgentMessage;
use a2a_engine::AgentCard;
use a2a_store::{ConversationStore, LoginRegistry, SessionRegistry};

use crate::orchestrator::{EventSource, StreamRequest, TaskOrchestrator};
use crate::rpc::{self, RpcError, RpcResponse};

/// Shared state available to all RPC handlers.
pub struct HandlerState {
    pub sessions: Arc<SessionRegistry>,
    pub logins: Arc<LoginRegistry>,
    pub conversations: Arc<ConversationStore>,
    pub orchestrator: Arc<dyn TaskOrchestrator>,
    pub card: AgentCard,
}

impl HandlerState {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        logins: Arc<LoginRegistry>,
        conversations: Arc<ConversationStore>,
        orchestrator: Arc<dyn TaskOrchestrator>,
        card: AgentCard,
    ) -> Self {
        Self {
            sessions,
            logins,
            conversations,
            orchestrator,
            card,
        }
    }

    /// Snapshot served by `GET /health`.
    pub fn health(&self) -> Value {
        json!({
            "status": "healthy",
            "activeTasks": self.orchestrator.active_count(),
            "sessions": self.sessions.len(),
        })
    }
}

/// What a dispatched request produces: a single JSON envelope, or an event
/// stream for `message/stream`.
pub enum Reply {
    Json(RpcResponse),
    Stream(EventSource),
}

impl Reply {
    pub fn error(id: Option<Value>, err: &RpcError) -> Self {
        Self::Json(RpcResponse::from_error(id, err))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStreamParams {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    agent_login_session_id: Option<String>,
    #[serde(default)]
    message: Option<AgentMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskCancelParams {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearContextParams {
    #[serde(default)]
    session_id: Option<String>,
}

/// `authorize` / `deauthorize` carry their fields in `data` parts.
#[derive(Debug, Default, Deserialize)]
struct MessageParams {
    #[serde(default)]
    message: Option<AgentMessage>,
}

impl MessageParams {
    fn data_field(&self, field: &str) -> Option<String> {
        self.message.as_ref().and_then(|m| m.data_field(field))
    }
}

/// Dispatch an RPC method to the appropriate handler. `session` is the
/// `agent-session-id` header, if any.
pub fn dispatch(
    state: &Arc<HandlerState>,
    method: &str,
    params: Option<&Value>,
    id: Option<Value>,
    session: Option<&SessionToken>,
) -> Reply {
    tracing::debug!(method, request_id = %rpc::display_id(id.as_ref()), "dispatching");

    let result = match method {
        "initialize" => Ok(initialize(state)),
        "notifications/initialized" => initialized(state, session),
        "message/stream" => return message_stream(state, params, id, session),
        "tasks/cancel" => tasks_cancel(state, params, session),
        "clearContext" => clear_context(state, params, session),
        "authorize" => authorize(state, params, session),
        "deauthorize" => deauthorize(state, params, session),
        "agent_card" => serde_json::to_value(&state.card).map_err(|e| RpcError::Internal(e.to_string())),
        _ => Err(RpcError::MethodNotFound(method.to_string())),
    };

    match result {
        Ok(value) => Reply::Json(RpcResponse::success(id, value)),
        Err(err) => {
            log_failure(method, &err);
            Reply::error(id, &err)
        }
    }
}

fn log_failure(method: &str, err: &RpcError) {
    if err.category().exposes_detail() {
        tracing::debug!(method, category = %err.category(), error = %err, "request rejected");
    } else {
        tracing::error!(method, error = %err, "request failed");
    }
}

fn initialize(state: &HandlerState) -> Value {
    let session = state.sessions.create();
    json!({
        "version": "1.0",
        "agentSessionId": session.token,
        "agentSessionTtl": state.sessions.ttl_seconds(),
    })
}

fn initialized(state: &HandlerState, session: Option<&SessionToken>) -> Result<Value, RpcError> {
    state.sessions.mark_initialized(session)?;
    Ok(json!({"status": "ok"}))
}

fn message_stream(
    state: &HandlerState,
    params: Option<&Value>,
    id: Option<Value>,
    session: Option<&SessionToken>,
) -> Reply {
    match start_stream(state, params, id.as_ref(), session) {
        Ok(source) => Reply::Stream(source),
        Err(err) => {
            log_failure("message/stream", &err);
            Reply::error(id, &err)
        }
    }
}

fn start_stream(
    state: &HandlerState,
    params: Option<&Value>,
    id: Option<&Value>,
    session: Option<&SessionToken>,
) -> Result<EventSource, RpcError> {
    let session = state.sessions.require(session)?;
    let params: MessageStreamParams = rpc::parse_params(params)?;
    let message = params
        .message
        .as_ref()
        .filter(|m| !m.parts.is_empty())
        .ok_or_else(|| RpcError::invalid_params("message with parts required"))?;

    let query = message.first_text().unwrap_or_default().to_string();
    let summary = build_summary(id, &params, &session.token);

    let source = state.orchestrator.start_stream(StreamRequest {
        correlation_id: id.cloned(),
        task_id: params.id.as_deref().map(TaskId::from_raw),
        session_id: params.session_id.clone(),
        login_session_id: params.agent_login_session_id.clone(),
        summary,
        query: query.clone(),
    })?;

    if let Some(conversation) = params.session_id.as_deref() {
        state.conversations.append(&session.token, conversation, query);
    }
    Ok(source)
}

/// `message/stream requestId=… taskId=…` plus each non-blank context id.
fn build_summary(id: Option<&Value>, params: &MessageStreamParams, session: &SessionToken) -> String {
    let mut summary = format!(
        "message/stream requestId={} taskId={}",
        rpc::display_id(id),
        params.id.as_deref().unwrap_or("<unknown>"),
    );
    if let Some(s) = rpc::non_blank(params.session_id.as_deref()) {
        summary.push_str(&format!(" sessionId={s}"));
    }
    if let Some(s) = rpc::non_blank(params.agent_login_session_id.as_deref()) {
        summary.push_str(&format!(" agentLoginSessionId={s}"));
    }
    if !session.is_blank() {
        summary.push_str(&format!(" agentSessionId={session}"));
    }
    summary
}

fn tasks_cancel(
    state: &HandlerState,
    params: Option<&Value>,
    session: Option<&SessionToken>,
) -> Result<Value, RpcError> {
    state.sessions.require(session)?;
    let params: TaskCancelParams = rpc::parse_params(params)?;
    let task_id = rpc::non_blank(params.id.as_deref())
        .map(TaskId::from_raw)
        .ok_or_else(|| RpcError::invalid_params("id required"))?;

    let result = state.orchestrator.cancel_task(&task_id)?;
    serde_json::to_value(result).map_err(|e| RpcError::Internal(e.to_string()))
}

fn clear_context(
    state: &HandlerState,
    params: Option<&Value>,
    session: Option<&SessionToken>,
) -> Result<Value, RpcError> {
    let session = state.sessions.require(session)?;
    let params: ClearContextParams = rpc::parse_params(params)?;
    state
        .conversations
        .clear(&session.token, params.session_id.as_deref());
    Ok(json!({"status": {"state": "cleared"}}))
}

fn authorize(
    state: &HandlerState,
    params: Option<&Value>,
    session: Option<&SessionToken>,
) -> Result<Value, RpcError> {
    let session = state.sessions.require(session)?;
    let params: MessageParams = rpc::parse_params(params)?;
    let auth_code = params
        .data_field("authCode")
        .ok_or_else(|| RpcError::invalid_params("authCode required"))?;

    let record = state.logins.create(&session.token, &auth_code);
    Ok(json!({
        "version": "1.0",
        "agentLoginSessionId": record.token,
    }))
}

fn deauthorize(
    state: &HandlerState,
    params: Option<&Value>,
    session: Option<&SessionToken>,
) -> Result<Value, RpcError> {
    state.sessions.require(session)?;
    let params: MessageParams = rpc::parse_params(params)?;
    let login = params
        .data_field("agentLoginSessionId")
        .map(LoginToken::from_raw)
        .ok_or_else(|| RpcError::invalid_params("agentLoginSessionId required"))?;

    if !state.logins.revoke(&login) {
        return Err(RpcError::LoginNotFound);
    }
    Ok(json!({"version": "1.0"}))
}
