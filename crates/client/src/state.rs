//! Client state shared across views.

use std::sync::Arc;

use campus_print_core::{Role, User};
use secrecy::SecretString;
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthProvider, AuthSession, FileSessionStorage, SessionStorage};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::{OrderStore, PlacedOrder};

/// Everything a signed-in session needs, wired from one [`ClientConfig`].
///
/// This struct is cheaply cloneable via `Arc`. Call [`PrintClient::init`] once
/// at startup to restore a saved session and [`PrintClient::logout`] to tear
/// it down.
#[derive(Clone)]
pub struct PrintClient {
    inner: Arc<PrintClientInner>,
}

struct PrintClientInner {
    config: ClientConfig,
    api: ApiClient,
    auth: AuthProvider,
    orders: OrderStore,
}

impl std::fmt::Debug for PrintClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintClient")
            .field("api", &self.inner.api)
            .field("auth", &self.inner.auth)
            .field("orders", &self.inner.orders)
            .finish_non_exhaustive()
    }
}

impl PrintClient {
    /// Create a client that keeps its session in `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config)?;
        let auth = AuthProvider::new(api.clone(), storage);
        let orders = OrderStore::new(api.clone(), config.limits.clone());

        Ok(Self {
            inner: Arc::new(PrintClientInner {
                config,
                api,
                auth,
                orders,
            }),
        })
    }

    /// Create a client that keeps its session under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileSessionStorage::new(config.state_dir.clone()));
        Self::new(config, storage)
    }

    /// Restore the saved session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session storage cannot be read.
    pub fn init(&self) -> Result<Option<User>, ClientError> {
        let user = self.inner.auth.hydrate()?;
        if let Some(user) = &user {
            info!(user_id = %user.id, "Session restored");
        }
        Ok(user)
    }

    /// Sign in. Switching to a different user drops the previous user's cart
    /// and cached orders.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` from [`AuthProvider::login`]. The store is left
    /// untouched on failure.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<AuthSession, ClientError> {
        let previous = self.inner.auth.user();
        let session = self.inner.auth.login(email, password, role).await?;
        self.switch_user(previous.as_ref(), &session);
        Ok(session)
    }

    /// Create an account and sign in as it, with the same user-switch
    /// handling as [`PrintClient::login`].
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` from [`AuthProvider::register`].
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<AuthSession, ClientError> {
        let previous = self.inner.auth.user();
        let session = self
            .inner
            .auth
            .register(name, email, password, role)
            .await?;
        self.switch_user(previous.as_ref(), &session);
        Ok(session)
    }

    /// Sign out and drop the cart and cached orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session could not be removed. The
    /// in-memory state is cleared regardless.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.inner.orders.clear();
        self.inner.auth.logout()?;
        Ok(())
    }

    /// Wait for page counts, then submit the cart at its current total.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a session, otherwise the
    /// store's `OrderError`.
    pub async fn checkout(&self) -> Result<PlacedOrder, ClientError> {
        let session = self.require_session()?;
        let orders = &self.inner.orders;
        orders.settle().await;
        let total = orders.calculate_total();
        Ok(orders.place_order(&session, total).await?)
    }

    /// Re-fetch the order list for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a session, otherwise the
    /// store's `OrderError`.
    pub async fn refresh_orders(&self) -> Result<(), ClientError> {
        let session = self.require_session()?;
        self.inner.orders.refresh_orders(&session).await?;
        Ok(())
    }

    /// All registered users (admin view).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a session, otherwise the
    /// backend error.
    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        self.require_session()?;
        Ok(self.inner.api.list_users().await?)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn auth(&self) -> &AuthProvider {
        &self.inner.auth
    }

    #[must_use]
    pub fn orders(&self) -> &OrderStore {
        &self.inner.orders
    }

    fn require_session(&self) -> Result<AuthSession, ClientError> {
        self.inner.auth.session().ok_or(ClientError::NotSignedIn)
    }

    fn switch_user(&self, previous: Option<&User>, session: &AuthSession) {
        if let Some(previous) = previous.filter(|user| user.id != session.user.id) {
            info!(from = %previous.id, to = %session.user.id, "Signed in as another user");
            self.inner.orders.clear();
        }
    }
}
