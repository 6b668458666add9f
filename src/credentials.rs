//! Archive credentials and session-token resolution
//!
//! A successful login stores the user's credentials under a random token. Item
//! tasks resolve that token back to credentials on their own, so no archive
//! session is ever shared between tasks.

use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Username and password for the archive
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Archive username (empty for anonymous access)
    pub username: String,
    /// Archive password
    pub password: String,
}

impl Credentials {
    /// Create credentials from a username and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials for unauthenticated access to public projects
    pub fn anonymous() -> Self {
        Self::new("", "")
    }

    /// Whether these are anonymous credentials
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// Basic-auth pair, or `None` for anonymous access
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        if self.is_anonymous() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves an opaque session token to archive credentials
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Look up the credentials behind `token`
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingToken`] for an empty token and
    /// [`AuthError::UnknownSession`] for a token nobody logged in with.
    async fn resolve_credentials(&self, token: &str) -> Result<Arc<Credentials>, AuthError>;
}

/// In-memory token → credentials table filled by login
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Credentials>>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials under a fresh random token and return the token
    pub async fn insert(&self, credentials: Credentials) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), Arc::new(credentials));
        token
    }

    /// Forget a token; returns whether it existed
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Number of active sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is active
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialResolver for SessionStore {
    async fn resolve_credentials(&self, token: &str) -> Result<Arc<Credentials>, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::UnknownSession)
    }
}
