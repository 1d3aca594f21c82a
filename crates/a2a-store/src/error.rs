#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Missing agent-session-id header")]
    MissingToken,

    #[error("Unknown agentSessionId")]
    UnknownToken,

    #[error("agentSessionId expired")]
    ExpiredToken,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Unknown agentLoginSessionId")]
    UnknownLogin,
}
