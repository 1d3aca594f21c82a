use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque string identifier. `$generate` produces a fresh value for `new()`.
macro_rules! opaque_id {
    ($name:ident, $generate:expr) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self($generate)
            }

            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// 128 random bits, lowercase hex, no separators.
fn hex_token() -> String {
    Uuid::new_v4().simple().to_string()
}

opaque_id!(SessionToken, hex_token());
opaque_id!(LoginToken, hex_token());
opaque_id!(TaskId, Uuid::new_v4().to_string());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_is_32_hex_chars() {
        let token = SessionToken::new();
        assert_eq!(token.as_str().len(), 32, "got: {token}");
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!token.as_str().contains('-'));
    }

    #[test]
    fn login_token_is_hex() {
        let token = LoginToken::new();
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn task_id_is_hyphenated_uuid() {
        let id = TaskId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok(), "got: {id}");
    }

    #[test]
    fn ids_are_unique() {
        let a = SessionToken::new();
        let b = SessionToken::new();
        assert_ne!(a, b);
    }

    #[test]
    fn blank_detection() {
        assert!(TaskId::from_raw("").is_blank());
        assert!(TaskId::from_raw("   ").is_blank());
        assert!(!TaskId::from_raw("task-1").is_blank());
    }

    #[test]
    fn serde_is_transparent() {
        let id = TaskId::from_raw("task-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-42\"");
        let parsed: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn from_raw_preserves_value() {
        let token = SessionToken::from_raw("custom-token");
        assert_eq!(token.as_str(), "custom-token");
        let parsed: SessionToken = "custom-token".parse().unwrap();
        assert_eq!(parsed, token);
    }
}
