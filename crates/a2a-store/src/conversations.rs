use dashmap::DashMap;
use serde::Serialize;

use a2a_core::ids::SessionToken;

/// Ordered message history for one conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversationContext {
    pub messages: Vec<String>,
}

/// Per-(session, conversation) short-term history.
#[derive(Default)]
pub struct ConversationStore {
    contexts: DashMap<(SessionToken, String), ConversationContext>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to a conversation, creating it on first use. Blank ids are ignored.
    pub fn append(&self, session: &SessionToken, conversation_id: &str, message: impl Into<String>) {
        if conversation_id.trim().is_empty() {
            return;
        }
        self.contexts
            .entry((session.clone(), conversation_id.to_string()))
            .or_default()
            .messages
            .push(message.into());
    }

    /// Clear one conversation, or every conversation of `session` when
    /// `conversation_id` is `None`. Returns how many were removed.
    pub fn clear(&self, session: &SessionToken, conversation_id: Option<&str>) -> usize {
        let removed = match conversation_id {
            Some(id) => usize::from(
                self.contexts
                    .remove(&(session.clone(), id.to_string()))
                    .is_some(),
            ),
            None => {
                let before = self.contexts.len();
                self.contexts.retain(|(owner, _), _| owner != session);
                before.saturating_sub(self.contexts.len())
            }
        };
        tracing::debug!(session = %session, conversation = ?conversation_id, removed, "conversation context cleared");
        removed
    }

    pub fn get(&self, session: &SessionToken, conversation_id: &str) -> Option<ConversationContext> {
        self.contexts
            .get(&(session.clone(), conversation_id.to_string()))
            .map(|c| c.value().clone())
    }

    /// Number of live conversations across all sessions.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let store = ConversationStore::new();
        let s = SessionToken::new();
        store.append(&s, "c1", "first");
        store.append(&s, "c1", "second");
        store.append(&s, "c1", "third");
        let ctx = store.get(&s, "c1").unwrap();
        assert_eq!(ctx.messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn blank_conversation_id_is_noop() {
        let store = ConversationStore::new();
        let s = SessionToken::new();
        store.append(&s, "", "ignored");
        store.append(&s, "  ", "ignored");
        assert!(store.is_empty());
    }

    #[test]
    fn clear_single_conversation() {
        let store = ConversationStore::new();
        let s = SessionToken::new();
        for i in 0..5 {
            store.append(&s, "c1", format!("m{i}"));
        }
        store.append(&s, "c2", "keep");

        assert_eq!(store.clear(&s, Some("c1")), 1);
        assert!(store.get(&s, "c1").is_none());
        assert!(store.get(&s, "c2").is_some());
    }

    #[test]
    fn clear_all_only_touches_own_session() {
        let store = ConversationStore::new();
        let mine = SessionToken::new();
        let other = SessionToken::new();
        store.append(&mine, "c1", "a");
        store.append(&mine, "c2", "b");
        store.append(&other, "c1", "c");

        assert_eq!(store.clear(&mine, None), 2);
        assert!(store.get(&mine, "c1").is_none());
        assert!(store.get(&mine, "c2").is_none());
        assert_eq!(store.get(&other, "c1").unwrap().messages, vec!["c"]);
    }

    #[test]
    fn clear_unknown_is_harmless() {
        let store = ConversationStore::new();
        let s = SessionToken::new();
        assert_eq!(store.clear(&s, Some("missing")), 0);
        assert_eq!(store.clear(&s, None), 0);
    }

    #[test]
    fn same_conversation_id_isolated_per_session() {
        let store = ConversationStore::new();
        let a = SessionToken::new();
        let b = SessionToken::new();
        store.append(&a, "shared", "from a");
        store.append(&b, "shared", "from b");
        assert_eq!(store.get(&a, "shared").unwrap().messages, vec!["from a"]);
        assert_eq!(store.get(&b, "shared").unwrap().messages, vec!["from b"]);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = std::sync::Arc::new(ConversationStore::new());
        let s = SessionToken::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                let s = s.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append(&s, "c", format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.get(&s, "c").unwrap().messages.len(), 400);
    }
}
