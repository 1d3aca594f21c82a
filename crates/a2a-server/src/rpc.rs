use serde::{Deserialize, Serialize};
use serde_json::Value;

use a2a_core::ids::TaskId;
use a2a_core::ErrorCategory;
use a2a_store::{LoginError, SessionError};

use crate::orchestrator::OrchestratorError;

/// JSON-RPC 2.0 request as posted to `/agent/message`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcRequest {
    pub fn is_v2(&self) -> bool {
        self.jsonrpc.as_deref() == Some("2.0")
    }
}

/// JSON-RPC 2.0 response envelope. Also the payload of every SSE frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T = Value> {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
// Server-defined range
pub const SESSION_ERROR: i32 = -32001;
pub const TASK_NOT_FOUND: i32 = -32004;
pub const LOGIN_NOT_FOUND: i32 = -32005;
pub const TASK_CONFLICT: i32 = -32009;

impl<T> RpcResponse<T> {
    pub fn success(id: Option<Value>, result: T) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }
}

impl RpcResponse {
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn from_error(id: Option<Value>, err: &RpcError) -> Self {
        Self::error(id, err.code(), err.wire_message())
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, INVALID_REQUEST, "Invalid Request: jsonrpc must be '2.0'")
    }
}

/// Every failure a handler can report. The only place categories become
/// wire codes.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Task not found")]
    TaskNotFound(TaskId),

    #[error("Task already active: {0}")]
    TaskConflict(TaskId),

    #[error("agentLoginSessionId not found")]
    LoginNotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Session(_) => ErrorCategory::Session,
            Self::InvalidParams(_) | Self::MethodNotFound(_) => ErrorCategory::Validation,
            Self::TaskNotFound(_) | Self::LoginNotFound => ErrorCategory::NotFound,
            Self::TaskConflict(_) => ErrorCategory::Conflict,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Session(_) => SESSION_ERROR,
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::TaskNotFound(_) => TASK_NOT_FOUND,
            Self::TaskConflict(_) => TASK_CONFLICT,
            Self::LoginNotFound => LOGIN_NOT_FOUND,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Message safe to put on the wire. Internal detail stays in the logs.
    pub fn wire_message(&self) -> String {
        if self.category().exposes_detail() {
            self.to_string()
        } else {
            "Internal error".into()
        }
    }
}

impl From<LoginError> for RpcError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::UnknownLogin => Self::LoginNotFound,
        }
    }
}

impl From<OrchestratorError> for RpcError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::TaskNotFound(id) => Self::TaskNotFound(id),
            OrchestratorError::TaskConflict(id) => Self::TaskConflict(id),
            other @ OrchestratorError::Encoding(_) => Self::Internal(other.to_string()),
        }
    }
}

/// Deserialize an optional params object into `T`; absent or null params
/// become `T::default()`.
pub fn parse_params<T>(params: Option<&Value>) -> Result<T, RpcError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| RpcError::InvalidParams(e.to_string())),
    }
}

/// Non-blank string view of an optional field.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Render a request id for log lines and task summaries.
pub fn display_id(id: Option<&Value>) -> String {
    match id {
        None | Some(Value::Null) => "<unknown>".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
