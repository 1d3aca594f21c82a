#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("lookup panicked: {0}")]
    Panicked(String),
}
