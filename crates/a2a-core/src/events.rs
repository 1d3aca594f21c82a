use serde::{Deserialize, Serialize};

use crate::ids::TaskId;
use crate::state::TaskState;

/// One frame of a task's event stream. Wire shape:
///
/// `{kind: "status-update", taskId, terminal, status: {state, message}}` or
/// `{kind: "artifact-update", taskId, terminal, append, lastChunk, artifact}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaskEvent {
    #[serde(rename = "status-update", rename_all = "camelCase")]
    StatusUpdate {
        task_id: TaskId,
        #[serde(alias = "final")]
        terminal: bool,
        status: TaskStatus,
    },

    #[serde(rename = "artifact-update", rename_all = "camelCase")]
    ArtifactUpdate {
        task_id: TaskId,
        #[serde(alias = "final")]
        terminal: bool,
        append: bool,
        last_chunk: bool,
        artifact: Artifact,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub message: StatusMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub role: String,
    pub parts: Vec<ArtifactPart>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub parts: Vec<ArtifactPart>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ArtifactPart {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "reasoningText", rename_all = "camelCase")]
    Reasoning { reasoning_text: String },
}

impl TaskEvent {
    /// Status update from the agent carrying a single text part.
    pub fn status(task_id: &TaskId, state: TaskState, text: impl Into<String>, terminal: bool) -> Self {
        Self::StatusUpdate {
            task_id: task_id.clone(),
            terminal,
            status: TaskStatus {
                state,
                message: StatusMessage {
                    role: "agent".into(),
                    parts: vec![ArtifactPart::Text { text: text.into() }],
                },
            },
        }
    }

    /// Non-final artifact chunk carrying only reasoning text.
    pub fn reasoning(task_id: &TaskId, reasoning_text: impl Into<String>) -> Self {
        Self::ArtifactUpdate {
            task_id: task_id.clone(),
            terminal: false,
            append: false,
            last_chunk: false,
            artifact: Artifact {
                artifact_id: artifact_id(task_id),
                parts: vec![ArtifactPart::Reasoning {
                    reasoning_text: reasoning_text.into(),
                }],
            },
        }
    }

    /// Final artifact chunk; closes the stream.
    pub fn final_text(task_id: &TaskId, text: impl Into<String>) -> Self {
        Self::ArtifactUpdate {
            task_id: task_id.clone(),
            terminal: true,
            append: true,
            last_chunk: true,
            artifact: Artifact {
                artifact_id: artifact_id(task_id),
                parts: vec![ArtifactPart::Text { text: text.into() }],
            },
        }
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::StatusUpdate { task_id, .. } | Self::ArtifactUpdate { task_id, .. } => task_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::StatusUpdate { terminal, .. } | Self::ArtifactUpdate { terminal, .. } => *terminal,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "status-update",
            Self::ArtifactUpdate { .. } => "artifact-update",
        }
    }

    /// State carried by a status update; `None` for artifact chunks.
    pub fn state(&self) -> Option<TaskState> {
        match self {
            Self::StatusUpdate { status, .. } => Some(status.state),
            Self::ArtifactUpdate { .. } => None,
        }
    }

    /// Concatenated text of every part, reasoning included.
    pub fn text(&self) -> String {
        let parts = match self {
            Self::StatusUpdate { status, .. } => &status.message.parts,
            Self::ArtifactUpdate { artifact, .. } => &artifact.parts,
        };
        parts
            .iter()
            .map(|p| match p {
                ArtifactPart::Text { text } => text.as_str(),
                ArtifactPart::Reasoning { reasoning_text } => reasoning_text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn artifact_id(task_id: &TaskId) -> String {
    format!("{task_id}-artifact")
}
