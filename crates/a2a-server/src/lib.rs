pub mod config;
pub mod event_bridge;
pub mod handlers;
pub mod orchestrator;
pub mod rpc;
pub mod server;

pub use config::ServerConfig;
pub use orchestrator::{
    CancelResult, EventSource, OrchestratorConfig, OrchestratorError, StreamFrame, StreamRequest,
    StreamingTaskOrchestrator, TaskOrchestrator,
};
pub use server::{build_router, build_state, build_state_with_clock, start, AppState, ServerHandle, SESSION_HEADER};
