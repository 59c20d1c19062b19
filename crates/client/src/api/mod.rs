//! Print-shop backend client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`; every request carries the configured
//!   timeout, and an elapsed timeout surfaces as [`ApiError::Timeout`]
//! - The bearer token is held by the client once a session exists, so order
//!   calls don't need it threaded through
//! - The admin user list is cached with `moka` for the configured TTL
//!
//! # Endpoints
//!
//! - `POST /api/login`, `POST /api/register`
//! - `GET /api/users`, `GET /api/orders`
//! - `POST /api/orders`
//! - `PATCH /api/orders/{id}/status`

mod types;

pub use types::{NewOrder, OrderReceipt};

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use campus_print_core::{Email, OrderId, OrderStatus, Role, SubmittedOrder, User};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::sync::{read, write};
use types::{
    AuthResponse, ErrorBody, LoginRequest, PlaceOrderResponse, RegisterRequest,
    StatusUpdateRequest, StatusUpdateResponse,
};

const USERS_CACHE_KEY: &str = "users";

/// Longest slice of a response body included in logs and errors.
const BODY_SNIPPET_LEN: usize = 200;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed.
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Non-2xx response.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response reporting `success: false`.
    #[error("{0}")]
    Api(String),

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A call that needs a bearer token was made without a session.
    #[error("Not signed in")]
    Unauthenticated,
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Backend operations the order store depends on.
///
/// [`ApiClient`] is the production implementation; tests substitute their own.
pub trait OrderService: Send + Sync + 'static {
    /// Submit an order and return its pickup code.
    fn place_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<OrderReceipt, ApiError>> + Send;

    /// Move an order to `status`. Returns the stored order if the backend
    /// echoes it.
    fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Option<SubmittedOrder>, ApiError>> + Send;

    /// Fetch every order visible to the current session.
    fn list_orders(&self) -> impl Future<Output = Result<Vec<SubmittedOrder>, ApiError>> + Send;
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the print-shop REST backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: RwLock<Option<SecretString>>,
    users: Cache<&'static str, Vec<User>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Request` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Request)?;

        let users = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.users_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                timeout: config.timeout,
                token: RwLock::new(None),
                users,
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Use `token` for authenticated calls.
    pub fn set_token(&self, token: SecretString) {
        *write(&self.inner.token) = Some(token);
    }

    /// Forget the bearer token and drop cached data from the old session.
    pub fn clear_token(&self) {
        *write(&self.inner.token) = None;
        self.inner.users.invalidate_all();
    }

    /// Returns true if a bearer token is set.
    #[must_use]
    pub fn has_token(&self) -> bool {
        read(&self.inner.token).is_some()
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the backend's message on rejection.
    #[instrument(skip_all, fields(email = %email, role = %role))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<(User, SecretString), ApiError> {
        let body = LoginRequest {
            email,
            password: password.expose_secret(),
            role,
        };
        let response: AuthResponse = self
            .send(self.request(Method::POST, self.endpoint("api/login")?, false)?.json(&body))
            .await?;
        debug!(user_id = %response.user.id, "Logged in");
        Ok((response.user, SecretString::from(response.token)))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the backend's message on rejection
    /// (e.g. the email is taken).
    #[instrument(skip_all, fields(email = %email, role = %role))]
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<(User, SecretString), ApiError> {
        let body = RegisterRequest {
            name,
            email,
            password: password.expose_secret(),
            role,
        };
        let response: AuthResponse = self
            .send(self.request(Method::POST, self.endpoint("api/register")?, false)?.json(&body))
            .await?;
        debug!(user_id = %response.user.id, "Registered");
        Ok((response.user, SecretString::from(response.token)))
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// List all users (admin view). Cached for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is missing.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        if let Some(users) = self.inner.users.get(USERS_CACHE_KEY).await {
            debug!("Cache hit for users");
            return Ok(users);
        }

        let users: Vec<User> = self
            .send(self.request(Method::GET, self.endpoint("api/users")?, true)?)
            .await?;
        self.inner
            .users
            .insert(USERS_CACHE_KEY, users.clone())
            .await;
        Ok(users)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// `api/orders/{id}/status`, with `id` percent-encoded as one segment.
    fn status_endpoint(&self, id: &OrderId) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/orders")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id.as_str())
            .push("status");
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        authenticated: bool,
    ) -> Result<RequestBuilder, ApiError> {
        let builder = self.inner.client.request(method, url);
        if !authenticated {
            return Ok(builder);
        }
        let token = read(&self.inner.token);
        let token = token.as_ref().ok_or(ApiError::Unauthenticated)?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.inner.timeout)
        } else {
            ApiError::Request(error)
        }
    }

    /// Send a request and decode a JSON response body.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let url = response.url().path().to_string();

        // Get response body as text first for better error diagnostics
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(status, &text);
            tracing::error!(
                status = %status,
                path = %url,
                body = %snippet(&text),
                "Backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %url,
                body = %snippet(&text),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(method, url, true)?.json(body)).await
    }
}

impl OrderService for ApiClient {
    #[instrument(skip_all, fields(user_id = %order.user_id, files = order.files.len(), total = %order.total_amount))]
    async fn place_order(&self, order: &NewOrder) -> Result<OrderReceipt, ApiError> {
        let response: PlaceOrderResponse =
            self.send_json(Method::POST, self.endpoint("api/orders")?, order).await?;

        if !response.success {
            return Err(ApiError::Api(
                response
                    .error
                    .unwrap_or_else(|| "Order was not accepted".to_string()),
            ));
        }

        let otp = response
            .otp
            .or_else(|| response.order.as_ref().map(|o| o.otp.clone()))
            .ok_or_else(|| ApiError::Api("Response is missing the pickup code".to_string()))?;

        debug!(order_id = ?response.order_id, "Order accepted");
        Ok(OrderReceipt {
            otp,
            order_id: response.order_id,
            order: response.order,
        })
    }

    #[instrument(skip_all, fields(order_id = %id, status = %status))]
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Option<SubmittedOrder>, ApiError> {
        let url = self.status_endpoint(id)?;
        let response: StatusUpdateResponse = self
            .send_json(Method::PATCH, url, &StatusUpdateRequest { status })
            .await?;

        if !response.success {
            return Err(ApiError::Api(
                response
                    .error
                    .unwrap_or_else(|| "Status change was rejected".to_string()),
            ));
        }
        Ok(response.order)
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<SubmittedOrder>, ApiError> {
        self.send(self.request(Method::GET, self.endpoint("api/orders")?, true)?)
            .await
    }
}

/// Message for a failed response: the backend's `{error}` if present,
/// otherwise a slice of the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| {
            let raw = snippet(body);
            if raw.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                raw
            }
        },
        |parsed| parsed.error,
    )
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ClientConfig::new(Url::parse("http://localhost:5000/").unwrap());
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_error_message_prefers_backend_error() {
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn test_error_message_truncates_body() {
        let body = "x".repeat(1000);
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, &body).len(),
            BODY_SNIPPET_LEN
        );
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 409,
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 409: Email already registered");
        assert_eq!(err.status(), Some(409));
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(30)).to_string(),
            "Request timed out after 30s"
        );
    }

    #[test]
    fn test_authenticated_request_requires_token() {
        let client = client();
        let url = client.endpoint("api/orders").unwrap();
        assert!(matches!(
            client.request(Method::GET, url.clone(), true),
            Err(ApiError::Unauthenticated)
        ));
        client.set_token(SecretString::from("abc"));
        assert!(client.has_token());
        assert!(client.request(Method::GET, url, true).is_ok());
        client.clear_token();
        assert!(!client.has_token());
    }

    #[test]
    fn test_endpoint_joins_base() {
        assert_eq!(
            client().endpoint("api/orders/o1/status").unwrap().as_str(),
            "http://localhost:5000/api/orders/o1/status"
        );
    }

    #[test]
    fn test_status_endpoint_escapes_order_id() {
        let client = client();
        assert_eq!(
            client.status_endpoint(&OrderId::new("o1")).unwrap().as_str(),
            "http://localhost:5000/api/orders/o1/status"
        );

        let url = client
            .status_endpoint(&OrderId::new("a/b?c#d"))
            .unwrap();
        assert_eq!(url.path(), "/api/orders/a%2Fb%3Fc%23d/status");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = client();
        client.set_token(SecretString::from("super-secret"));
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
