// In-memory user accounts, keyed by lower-cased username

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UserStore {
    inner: Arc<RwLock<UserTables>>,
}

#[derive(Debug, Default)]
struct UserTables {
    by_id: HashMap<Uuid, User>,
    id_by_name: HashMap<String, Uuid>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new user. Returns `None` when the username is already taken.
    pub fn create(&self, username: &str, password_hash: String) -> Option<User> {
        let key: String = username.to_lowercase();
        let mut tables = self.inner.write();

        if tables.id_by_name.contains_key(&key) {
            return None;
        }

        let user: User = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        tables.id_by_name.insert(key, user.id);
        tables.by_id.insert(user.id, user.clone());
        Some(user)
    }

    pub fn find_by_username(&self, username: &str) -> Option<User> {
        let tables = self.inner.read();
        tables
            .id_by_name
            .get(&username.to_lowercase())
            .and_then(|id| tables.by_id.get(id))
            .cloned()
    }

    pub fn find_by_id(&self, id: &Uuid) -> Option<User> {
        self.inner.read().by_id.get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.read().by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_unique_ignoring_case() {
        let store = UserStore::new();

        let alice = store.create("Alice", "hash".into()).unwrap();
        assert!(store.create("alice", "other".into()).is_none());

        let found = store.find_by_username("ALICE").unwrap();
        assert_eq!(found.id, alice.id);
        assert_eq!(found.username, "Alice");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let store = UserStore::new();
        let user = store.create("bob", "secret-hash".into()).unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "bob");
    }
}
