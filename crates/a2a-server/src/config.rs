use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::OrchestratorConfig;

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// 0 picks a free port.
    pub port: u16,
    /// Pause between pipeline stages of a streamed task.
    pub stream_delay_ms: u64,
    /// Fail a stream that makes no progress for this long. 0 disables.
    pub stream_idle_timeout_secs: u64,
    /// How often expired sessions are swept. 0 disables the sweep.
    pub cleanup_interval_secs: u64,
    /// SSE keep-alive comment interval.
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 10001,
            stream_delay_ms: 150,
            stream_idle_timeout_secs: 0,
            cleanup_interval_secs: 300,
            keep_alive_secs: 15,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL advertised in the agent card.
    pub fn public_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            stream_delay: Duration::from_millis(self.stream_delay_ms),
            idle_timeout: (self.stream_idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.stream_idle_timeout_secs)),
        }
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs.max(1))
    }
}
