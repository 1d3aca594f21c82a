/// Coarse failure classes shared by every layer. Only the RPC boundary turns
/// these into wire codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing, unknown or expired session token. Caller re-initializes.
    Session,
    /// Malformed or missing parameters. Caller fixes the request.
    Validation,
    /// Unknown task or login id. Treat as already terminal / already revoked.
    NotFound,
    /// Id already in use by a live task.
    Conflict,
    /// Unexpected failure. Generic message only on the wire.
    Internal,
}

impl ErrorCategory {
    /// Short classification string for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }

    /// Whether the error detail may be shown to the caller verbatim.
    pub fn exposes_detail(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_hides_detail() {
        assert!(ErrorCategory::Session.exposes_detail());
        assert!(ErrorCategory::Validation.exposes_detail());
        assert!(ErrorCategory::NotFound.exposes_detail());
        assert!(ErrorCategory::Conflict.exposes_detail());
        assert!(!ErrorCategory::Internal.exposes_detail());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCategory::Internal.to_string(), "internal");
    }
}
