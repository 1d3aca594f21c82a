use serde::{Deserialize, Serialize};

/// Inbound message submitted by a client (`message/stream`, `authorize`, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FilePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub bytes: Option<String>,
    pub uri: Option<String>,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".into()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn data(data: serde_json::Value) -> Self {
        Self {
            kind: Some("data".into()),
            data: Some(data),
            ..Default::default()
        }
    }

    fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

impl AgentMessage {
    pub fn user(parts: Vec<MessagePart>) -> Self {
        Self {
            role: Some("user".into()),
            parts,
        }
    }

    /// First non-blank `text` part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts
            .iter()
            .filter(|p| p.is_kind("text"))
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.trim().is_empty())
    }

    /// First non-blank string value of `field` across `data` parts.
    pub fn data_field(&self, field: &str) -> Option<String> {
        self.parts
            .iter()
            .filter(|p| p.is_kind("data"))
            .filter_map(|p| p.data.as_ref()?.get(field))
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .find(|s| !s.trim().is_empty())
    }
}
