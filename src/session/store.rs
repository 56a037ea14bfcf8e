use super::storage::KeyValueStorage;
use crate::error::StorageError;
use crate::types::{CurrentUser, LoginSession};
use std::sync::Arc;

pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_USER: &str = "user";

/// Typed view of the three persisted credential fields.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn read(&self, key: &'static str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(KEY_REFRESH_TOKEN)
    }

    /// A stored record that no longer parses counts as absent.
    pub fn current_user(&self) -> Option<CurrentUser> {
        let raw = self.read(KEY_USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user record is corrupt");
                None
            }
        }
    }

    pub fn set_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(KEY_ACCESS_TOKEN, token)
    }

    pub fn save(&self, session: &LoginSession) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.user)
            .map_err(|_| StorageError::Corrupt { key: KEY_USER })?;
        self.storage.set(KEY_ACCESS_TOKEN, &session.access_token)?;
        self.storage.set(KEY_REFRESH_TOKEN, &session.refresh_token)?;
        self.storage.set(KEY_USER, &user)?;
        Ok(())
    }

    /// Removes every field, even if an earlier removal fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in [KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session field");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use crate::types::AccountId;

    fn login_session() -> LoginSession {
        LoginSession {
            access_token: "a-1".to_string(),
            refresh_token: "r-1".to_string(),
            user: CurrentUser::new(AccountId::Number(7), "student"),
        }
    }

    #[test]
    fn save_then_clear_round_trips_all_fields() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(Arc::new(storage.clone()));

        store.save(&login_session()).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r-1"));
        assert_eq!(store.current_user().unwrap().account_id, AccountId::Number(7));

        store.clear().unwrap();
        assert!(!storage.contains(KEY_ACCESS_TOKEN));
        assert!(!storage.contains(KEY_REFRESH_TOKEN));
        assert!(!storage.contains(KEY_USER));
    }

    #[test]
    fn corrupt_user_record_reads_as_absent() {
        let storage = MemoryStorage::new();
        storage.set(KEY_USER, "{not json").unwrap();
        let store = SessionStore::new(Arc::new(storage));
        assert!(store.current_user().is_none());
    }

    #[test]
    fn blank_tokens_read_as_absent() {
        let storage = MemoryStorage::new();
        storage.set(KEY_ACCESS_TOKEN, "   ").unwrap();
        let store = SessionStore::new(Arc::new(storage));
        assert!(store.access_token().is_none());
    }
}
