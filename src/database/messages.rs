// In-memory chat message log

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender: String,
    pub recipient_id: Uuid,
    pub recipient: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: Message) {
        self.messages.write().push(message);
    }

    /// Every message the user sent or received, oldest first
    pub fn for_user(&self, user_id: &Uuid) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .filter(|m| &m.sender_id == user_id || &m.recipient_id == user_id)
            .cloned()
            .collect()
    }

    /// Messages exchanged between two users in either direction, oldest first
    pub fn conversation(&self, a: &Uuid, b: &Uuid) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .filter(|m| {
                (&m.sender_id == a && &m.recipient_id == b)
                    || (&m.sender_id == b && &m.recipient_id == a)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: Uuid, to: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: from,
            sender: "s".into(),
            recipient_id: to,
            recipient: "r".into(),
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn conversation_covers_both_directions_only() {
        let store = MessageStore::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.push(message(a, b, "one"));
        store.push(message(b, a, "two"));
        store.push(message(a, c, "elsewhere"));

        let between: Vec<String> = store.conversation(&a, &b).into_iter().map(|m| m.content).collect();
        assert_eq!(between, vec!["one", "two"]);
        assert_eq!(store.for_user(&a).len(), 3);
        assert_eq!(store.for_user(&c).len(), 1);
    }
}
