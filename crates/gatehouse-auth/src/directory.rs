//! User lookup.

use async_trait::async_trait;
use gatehouse_core::{AuthError, UserRecord};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Where the authentication service finds user records.
///
/// Implementations may be backed by a database or a remote service; lookup
/// failures unrelated to the user's existence should be reported as
/// [`AuthError::Internal`].
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Finds a user by identification.
    async fn find_user(&self, identification: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Finds the user an API key was issued to.
    async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<UserRecord>, AuthError> {
        let _ = api_key;
        Err(AuthError::Unsupported {
            scheme: "ApiKey".to_string(),
        })
    }
}

/// A directory held in memory.
///
/// ```
/// use gatehouse_auth::InMemoryUserDirectory;
/// use gatehouse_core::fixtures;
///
/// let directory = InMemoryUserDirectory::new()
///     .with_user(fixtures::alice())
///     .with_api_key("k-123", "alice");
/// assert_eq!(directory.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    api_keys: RwLock<HashMap<String, String>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding `users`.
    #[must_use]
    pub fn from_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    /// Adds a user. Chainable.
    #[must_use]
    pub fn with_user(self, user: UserRecord) -> Self {
        self.insert(user);
        self
    }

    /// Registers an API key for a user. Chainable.
    #[must_use]
    pub fn with_api_key(self, api_key: impl Into<String>, identification: impl Into<String>) -> Self {
        self.register_api_key(api_key, identification);
        self
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserRecord) {
        self.users
            .write()
            .insert(user.identification.clone(), user);
    }

    /// Maps an API key to a user's identification.
    pub fn register_api_key(&self, api_key: impl Into<String>, identification: impl Into<String>) {
        self.api_keys
            .write()
            .insert(api_key.into(), identification.into());
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether there are no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, identification: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.read().get(identification).cloned())
    }

    async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<UserRecord>, AuthError> {
        let Some(identification) = self.api_keys.read().get(api_key).cloned() else {
            return Ok(None);
        };
        Ok(self.users.read().get(&identification).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::fixtures;

    struct PasswordsOnly;

    #[async_trait]
    impl UserDirectory for PasswordsOnly {
        async fn find_user(&self, _identification: &str) -> Result<Option<UserRecord>, AuthError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_find_user() {
        let directory = InMemoryUserDirectory::from_users(fixtures::all_users());
        let bob = directory.find_user("bob").await.unwrap().unwrap();
        assert_eq!(bob.display_name.as_deref(), Some("Bob Builder"));
        assert!(directory.find_user("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_key_lookup() {
        let directory = InMemoryUserDirectory::new()
            .with_user(fixtures::alice())
            .with_api_key("k-1", "alice")
            .with_api_key("k-dangling", "nobody");

        let alice = directory.find_user_by_api_key("k-1").await.unwrap();
        assert_eq!(alice.map(|u| u.identification), Some("alice".to_string()));
        assert!(directory.find_user_by_api_key("k-2").await.unwrap().is_none());
        assert!(directory
            .find_user_by_api_key("k-dangling")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_api_keys_unsupported_by_default() {
        let err = PasswordsOnly.find_user_by_api_key("k").await.unwrap_err();
        assert!(matches!(err, AuthError::Unsupported { .. }));
    }
}
