//! Signed-in state
//!
//! One `SessionStore` is created at startup and handed by reference to
//! whatever needs the current user. The user and token are persisted
//! through a `SessionStorage` so a later run can restore them.

use crate::api::{ProfileUpdate, RegisterRequest, RemoteApi};
use crate::error::ApiError;
use crate::models::User;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Local storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// What survives between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<PersistedSession>>;
    async fn save(&self, session: &PersistedSession) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// JSON file on disk
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding unreadable session file: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Keeps the session in memory only
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
        Ok(self.snapshot())
    }

    async fn save(&self, session: &PersistedSession) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage poisoned"))?;
        *guard = None;
        Ok(())
    }
}

pub struct SessionStore {
    api: Arc<dyn RemoteApi>,
    storage: Arc<dyn SessionStorage>,
    current: Option<PersistedSession>,
    loading: bool,
}

impl SessionStore {
    pub fn new(api: Arc<dyn RemoteApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            api,
            storage,
            current: None,
            loading: false,
        }
    }

    /// Load the persisted session and check it is still valid
    ///
    /// A rejected token clears local storage. Any other failure keeps the
    /// cached user so the app still renders.
    pub async fn restore(&mut self) -> Result<Option<&User>, SessionError> {
        self.loading = true;
        let result = self.restore_inner().await;
        self.loading = false;
        result?;
        Ok(self.current_user())
    }

    async fn restore_inner(&mut self) -> Result<(), SessionError> {
        let Some(saved) = self.storage.load().await? else {
            debug!("No saved session");
            return Ok(());
        };

        match self.api.me(&saved.token).await {
            Ok(user) => {
                info!("Restored session for {}", user.email);
                self.set_session(PersistedSession {
                    user,
                    token: saved.token,
                })
                .await?;
            }
            Err(ApiError::Unauthorized) => {
                info!("Saved session expired, signing out");
                self.storage.clear().await?;
                self.current = None;
            }
            Err(e) => {
                warn!("Could not verify saved session: {}", e);
                self.current = Some(saved);
            }
        }
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User, SessionError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        self.loading = true;
        let result = self.api.login(email.trim(), password).await;
        self.loading = false;

        let auth = result?;
        self.set_session(PersistedSession {
            user: auth.user,
            token: auth.token,
        })
        .await?;
        self.current_user().ok_or(SessionError::NotSignedIn)
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<&User, SessionError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        self.loading = true;
        let result = self.api.register(request).await;
        self.loading = false;

        let auth = result?;
        info!("Registered {}", auth.user.email);
        self.set_session(PersistedSession {
            user: auth.user,
            token: auth.token,
        })
        .await?;
        self.current_user().ok_or(SessionError::NotSignedIn)
    }

    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(session) = self.current.take() {
            info!("Signed out {}", session.user.email);
        }
        self.storage.clear().await?;
        Ok(())
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&User, SessionError> {
        let token = self.token().ok_or(SessionError::NotSignedIn)?.to_string();
        let user = self.api.update_profile(&token, update).await?;
        self.set_session(PersistedSession { user, token }).await?;
        self.current_user().ok_or(SessionError::NotSignedIn)
    }

    /// Delete the account remotely, then forget it locally
    pub async fn delete_account(&mut self) -> Result<(), SessionError> {
        let token = self.token().ok_or(SessionError::NotSignedIn)?.to_string();
        self.api.delete_account(&token).await?;
        self.current = None;
        self.storage.clear().await?;
        info!("Account deleted");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        Ok(self.api.forgot_password(email.trim()).await?)
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), SessionError> {
        Ok(self.api.reset_password(reset_token, new_password).await?)
    }

    /// Write the in-memory session back to storage
    pub async fn persist(&self) -> Result<(), SessionError> {
        if let Some(session) = &self.current {
            self.storage.save(session).await?;
        }
        Ok(())
    }

    async fn set_session(&mut self, session: PersistedSession) -> Result<(), SessionError> {
        self.storage.save(&session).await?;
        self.current = Some(session);
        Ok(())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub(crate) fn current_user_mut(&mut self) -> Option<&mut User> {
        self.current.as_mut().map(|s| &mut s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the signed-in user is the given owner account
    pub fn is_owner(&self, owner_user_id: Option<&str>) -> bool {
        match (self.current_user(), owner_user_id) {
            (Some(user), Some(owner)) => user.id == owner,
            _ => false,
        }
    }

    pub fn api(&self) -> &Arc<dyn RemoteApi> {
        &self.api
    }
}
