use std::sync::Arc;

use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "a2a_server" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

/// Handle to the installed subscriber. Keep it alive for the process lifetime.
pub struct TelemetryGuard {
    base_level: Level,
    level_filter: Arc<RwLock<Vec<(String, Level)>>>,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl TelemetryGuard {
    /// Change the log level for a specific module at runtime.
    ///
    /// Has no effect on output when RUST_LOG was set at startup.
    pub fn set_module_level(&self, module: &str, level: Level) {
        let directive = {
            let mut levels = self.level_filter.write();
            if let Some(entry) = levels.iter_mut().find(|(m, _)| m == module) {
                entry.1 = level;
            } else {
                levels.push((module.to_string(), level));
            }
            filter_directive(self.base_level, &levels)
        };

        if let Some(handle) = &self.reload {
            if let Err(e) = handle.reload(EnvFilter::new(&directive)) {
                tracing::warn!(error = %e, "failed to reload log filter");
            }
        }
    }

    /// Get current per-module log level overrides.
    pub fn module_levels(&self) -> Vec<(String, Level)> {
        self.level_filter.read().clone()
    }
}

/// Build an `EnvFilter` directive such as `info,a2a_server=debug`.
pub fn filter_directive(base: Level, module_levels: &[(String, Level)]) -> String {
    let mut directive = base.to_string().to_lowercase();
    for (module, level) in module_levels {
        directive.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    directive
}

/// Initialize the telemetry subsystem. Call once at startup.
///
/// A second call leaves the first subscriber in place and returns a guard
/// whose runtime level changes are no-ops.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let level_filter = Arc::new(RwLock::new(config.module_levels.clone()));

    let from_env = std::env::var_os("RUST_LOG").is_some();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.log_level, &config.module_levels)));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true).with_span_list(true));
    let text_layer = (!config.json).then(|| tracing_subscriber::fmt::layer().with_target(true));

    let installed = tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok();

    if !installed {
        eprintln!("a2a-telemetry: a global subscriber is already installed");
    }

    TelemetryGuard {
        base_level: config.log_level,
        level_filter,
        reload: (installed && !from_env).then_some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_without_overrides() {
        assert_eq!(filter_directive(Level::INFO, &[]), "info");
    }

    #[test]
    fn directive_with_overrides() {
        let levels = vec![
            ("a2a_server".to_string(), Level::DEBUG),
            ("tower_http".to_string(), Level::WARN),
        ];
        assert_eq!(
            filter_directive(Level::INFO, &levels),
            "info,a2a_server=debug,tower_http=warn"
        );
    }

    #[test]
    fn default_config() {
        let cfg = TelemetryConfig::default();
        assert_eq!(cfg.log_level, Level::INFO);
        assert!(cfg.module_levels.is_empty());
        assert!(!cfg.json);
    }

    #[test]
    fn guard_tracks_module_overrides() {
        let guard = init_telemetry(TelemetryConfig {
            module_levels: vec![("a2a_store".into(), Level::WARN)],
            ..Default::default()
        });
        guard.set_module_level("a2a_server", Level::DEBUG);
        guard.set_module_level("a2a_store", Level::TRACE);

        let levels = guard.module_levels();
        assert_eq!(levels.len(), 2);
        assert!(levels.contains(&("a2a_store".to_string(), Level::TRACE)));
        assert!(levels.contains(&("a2a_server".to_string(), Level::DEBUG)));
    }
}
