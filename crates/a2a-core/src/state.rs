use serde::{Deserialize, Serialize};

/// Lifecycle of a streamed task.
///
/// `Submitted → Working → ArtifactPartial* → Completed`, with `Canceled` and
/// `Failed` reachable from any non-terminal state. Terminal states never move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum TaskState {
    Submitted = 0,
    Working = 1,
    ArtifactPartial = 2,
    Completed = 3,
    Canceled = 4,
    Failed = 5,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Submitted => false,
            Self::Working => self == Self::Submitted,
            Self::ArtifactPartial | Self::Completed => {
                matches!(self, Self::Working | Self::ArtifactPartial)
            }
            Self::Canceled | Self::Failed => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::ArtifactPartial => "artifact-partial",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }

    /// Inverse of `as u8`, for states kept in an atomic.
    pub fn from_repr(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Submitted),
            1 => Some(Self::Working),
            2 => Some(Self::ArtifactPartial),
            3 => Some(Self::Completed),
            4 => Some(Self::Canceled),
            5 => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 6] = [
        TaskState::Submitted,
        TaskState::Working,
        TaskState::ArtifactPartial,
        TaskState::Completed,
        TaskState::Canceled,
        TaskState::Failed,
    ];

    #[test]
    fn terminal_classification() {
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::ArtifactPartial.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn happy_path_transitions() {
        assert!(TaskState::Submitted.can_transition_to(TaskState::Working));
        assert!(TaskState::Working.can_transition_to(TaskState::ArtifactPartial));
        assert!(TaskState::ArtifactPartial.can_transition_to(TaskState::ArtifactPartial));
        assert!(TaskState::ArtifactPartial.can_transition_to(TaskState::Completed));
        assert!(TaskState::Working.can_transition_to(TaskState::Completed));
    }

    #[test]
    fn no_skipping_working() {
        assert!(!TaskState::Submitted.can_transition_to(TaskState::ArtifactPartial));
        assert!(!TaskState::Submitted.can_transition_to(TaskState::Completed));
    }

    #[test]
    fn cancel_and_fail_from_any_live_state() {
        for from in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(TaskState::Canceled), "{from}");
            assert!(from.can_transition_to(TaskState::Failed), "{from}");
        }
    }

    #[test]
    fn terminal_states_are_sticky() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn repr_roundtrip() {
        for state in ALL {
            assert_eq!(TaskState::from_repr(state as u8), Some(state));
        }
        assert_eq!(TaskState::from_repr(42), None);
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&TaskState::Canceled).unwrap(), "\"canceled\"");
        assert_eq!(
            serde_json::to_string(&TaskState::ArtifactPartial).unwrap(),
            "\"artifact-partial\""
        );
        assert_eq!(TaskState::Working.to_string(), "working");
    }
}
