//! Authentication and the persisted session.
//!
//! [`AuthProvider`] signs users in against the backend and keeps the
//! `{user, token}` pair in a [`SessionStorage`] so the session survives a
//! restart. On success the bearer token is handed to the shared [`ApiClient`].

mod error;
mod storage;

pub use error::AuthError;
pub use storage::{
    FileSessionStorage, MemorySessionStorage, SessionStorage, StorageError, TOKEN_KEY, USER_KEY,
};

use std::sync::{Arc, RwLock};

use campus_print_core::{Email, Role, User};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::sync::{read, write};
use crate::telemetry;

/// A signed-in user and their bearer token.
#[derive(Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: SecretString,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Signs users in and out and owns the current session.
#[derive(Clone)]
pub struct AuthProvider {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    session: RwLock<Option<AuthSession>>,
}

impl std::fmt::Debug for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProvider")
            .field("session", &*read(&self.inner.session))
            .finish_non_exhaustive()
    }
}

impl AuthProvider {
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                api,
                storage,
                session: RwLock::new(None),
            }),
        }
    }

    /// Restore the session saved by a previous run.
    ///
    /// A stored user that no longer parses, or a user without a token, is
    /// treated as signed out and the leftovers are removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the storage backend cannot be read.
    pub fn hydrate(&self) -> Result<Option<User>, AuthError> {
        let storage = &self.inner.storage;
        let (Some(raw_user), Some(token)) = (storage.get(USER_KEY)?, storage.get(TOKEN_KEY)?)
        else {
            self.clear_storage()?;
            return Ok(None);
        };

        let user: User = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored session");
                self.clear_storage()?;
                return Ok(None);
            }
        };

        debug!(user_id = %user.id, "Restored session");
        self.activate(AuthSession {
            user: user.clone(),
            token: SecretString::from(token),
        });
        Ok(Some(user))
    }

    /// Log in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingField` before
    /// contacting the backend, `AuthError::Api` if the backend rejects the
    /// credentials, and `AuthError::Storage` if the session cannot be saved.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        require_password(password)?;

        let (user, token) = self.inner.api.login(&email, password, role).await?;
        self.establish(user, token)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Same as [`AuthProvider::login`]; a blank name is `AuthError::MissingField`.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<AuthSession, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let email = Email::parse(email)?;
        require_password(password)?;

        let (user, token) = self
            .inner
            .api
            .register(name, &email, password, role)
            .await?;
        self.establish(user, token)
    }

    /// Forget the session in memory, in the API client and in storage.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the stored session could not be removed.
    /// The in-memory session is cleared regardless.
    pub fn logout(&self) -> Result<(), AuthError> {
        let was_signed_in = write(&self.inner.session).take().is_some();
        self.inner.api.clear_token();
        telemetry::clear_user();
        if was_signed_in {
            info!("Signed out");
        }
        self.clear_storage()
    }

    /// Current session, if signed in.
    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        read(&self.inner.session).clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        read(&self.inner.session)
            .as_ref()
            .map(|session| session.user.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        read(&self.inner.session).is_some()
    }

    fn establish(&self, user: User, token: SecretString) -> Result<AuthSession, AuthError> {
        let serialized = serde_json::to_string(&user)?;
        self.inner.storage.set(USER_KEY, &serialized)?;
        self.inner.storage.set(TOKEN_KEY, token.expose_secret())?;

        info!(user_id = %user.id, role = %user.role, "Signed in");
        let session = AuthSession { user, token };
        self.activate(session.clone());
        Ok(session)
    }

    fn activate(&self, session: AuthSession) {
        self.inner.api.set_token(session.token.clone());
        telemetry::set_user(&session.user);
        *write(&self.inner.session) = Some(session);
    }

    fn clear_storage(&self) -> Result<(), AuthError> {
        self.inner.storage.remove(USER_KEY)?;
        self.inner.storage.remove(TOKEN_KEY)?;
        Ok(())
    }
}

fn require_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    Ok(())
}
