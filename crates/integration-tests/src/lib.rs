//! Integration tests for Campus Print.
//!
//! The tests run the real [`PrintClient`] against [`FakeBackend`], an
//! in-process axum server bound to an ephemeral port that speaks the same JSON
//! as the print-shop backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p campus-print-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use campus_print_client::{ClientConfig, MemorySessionStorage, PrintClient, SessionStorage};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

// =============================================================================
// Backend state
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: String,
    role: String,
}

impl Account {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
        })
    }
}

#[derive(Debug, Default)]
struct Records {
    accounts: Vec<Account>,
    /// Bearer token to account ID.
    tokens: HashMap<String, String>,
    orders: Vec<Value>,
}

#[derive(Debug, Default)]
struct Knobs {
    reject_orders: AtomicBool,
    order_delay_ms: AtomicU64,
    users_requests: AtomicUsize,
    order_requests: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
struct BackendState {
    records: Arc<Mutex<Records>>,
    knobs: Arc<Knobs>,
}

impl BackendState {
    fn records(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<Account, Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Missing token"))?;

        let records = self.records();
        records
            .tokens
            .get(token)
            .and_then(|id| records.accounts.iter().find(|a| &a.id == id))
            .cloned()
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }

    fn issue_token(&self, account_id: &str) -> String {
        let token = format!("tok-{}", uuid::Uuid::new_v4());
        self.records()
            .tokens
            .insert(token.clone(), account_id.to_string());
        token
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: String,
    password: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

async fn login(State(state): State<BackendState>, Json(body): Json<LoginBody>) -> Response {
    let account = state
        .records()
        .accounts
        .iter()
        .find(|a| a.email == body.email && a.password == body.password && a.role == body.role)
        .cloned();
    let Some(account) = account else {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    };

    let token = state.issue_token(&account.id);
    Json(json!({ "user": account.to_json(), "token": token })).into_response()
}

async fn register(State(state): State<BackendState>, Json(body): Json<RegisterBody>) -> Response {
    let account = {
        let mut records = state.records();
        if records.accounts.iter().any(|a| a.email == body.email) {
            return error(StatusCode::CONFLICT, "Email already registered");
        }
        let account = Account {
            id: format!("u{}", records.accounts.len() + 1),
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
        };
        records.accounts.push(account.clone());
        account
    };

    let token = state.issue_token(&account.id);
    (
        StatusCode::CREATED,
        Json(json!({ "user": account.to_json(), "token": token })),
    )
        .into_response()
}

async fn list_users(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    state.knobs.users_requests.fetch_add(1, Ordering::SeqCst);
    let users: Vec<Value> = state.records().accounts.iter().map(Account::to_json).collect();
    Json(users).into_response()
}

async fn list_orders(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    Json(state.records().orders.clone()).into_response()
}

async fn create_order(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(mut order): Json<Value>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers) {
        return rejection;
    }
    state.knobs.order_requests.fetch_add(1, Ordering::SeqCst);

    let delay = state.knobs.order_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.knobs.reject_orders.load(Ordering::SeqCst) {
        return Json(json!({ "success": false, "error": "Payment declined" })).into_response();
    }

    let otp = format!("{:04}", rand::rng().random_range(0..10_000));
    let id = format!("o{}", uuid::Uuid::new_v4().simple());
    if let Some(fields) = order.as_object_mut() {
        fields.insert("_id".to_string(), json!(id));
        fields.insert("otp".to_string(), json!(otp));
        fields.insert("status".to_string(), json!("paid"));
        fields.insert(
            "createdAt".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
    }
    state.records().orders.push(order.clone());

    Json(json!({ "success": true, "otp": otp, "order": order })).into_response()
}

async fn update_status(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<StatusBody>,
) -> Response {
    match state.authorize(&headers) {
        Ok(account) if account.role == "student" => {
            return error(StatusCode::FORBIDDEN, "Vendors only");
        }
        Ok(_) => {}
        Err(rejection) => return rejection,
    }

    let mut records = state.records();
    let Some(order) = records
        .orders
        .iter_mut()
        .find(|order| order["_id"].as_str() == Some(id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    order["status"] = json!(body.status);
    let order = order.clone();
    drop(records);

    Json(json!({ "success": true, "order": order })).into_response()
}

fn base_url(addr: SocketAddr) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://{addr}/"))
}

fn router(state: BackendState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/register", post(register))
        .route("/api/users", get(list_users))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}/status", patch(update_status))
        .with_state(state)
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-process print-shop backend.
///
/// Shuts down when dropped.
#[derive(Debug)]
pub struct FakeBackend {
    url: Url,
    state: BackendState,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start the backend on an ephemeral local port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = base_url(addr).map_err(std::io::Error::other)?;
        let state = BackendState::default();
        let app = router(state.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });

        Ok(Self {
            url,
            state,
            server,
        })
    }

    /// Base URL with a trailing slash.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Create an account directly, bypassing `/api/register`.
    pub fn seed_account(&self, name: &str, email: &str, password: &str, role: &str) {
        let mut records = self.state.records();
        let id = format!("u{}", records.accounts.len() + 1);
        records.accounts.push(Account {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        });
    }

    /// Make `POST /api/orders` answer `{success: false}`.
    pub fn reject_orders(&self, reject: bool) {
        self.state.knobs.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Delay every `POST /api/orders` response.
    pub fn delay_orders(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.knobs.order_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Orders stored so far, as raw JSON.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state.records().orders.clone()
    }

    /// Number of `GET /api/users` calls that reached the backend.
    #[must_use]
    pub fn users_requests(&self) -> usize {
        self.state.knobs.users_requests.load(Ordering::SeqCst)
    }

    /// Number of authenticated `POST /api/orders` calls received.
    #[must_use]
    pub fn order_requests(&self) -> usize {
        self.state.knobs.order_requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// TestContext
// =============================================================================

/// A fake backend plus a client pointed at it.
pub struct TestContext {
    pub backend: FakeBackend,
    pub storage: Arc<MemorySessionStorage>,
    pub client: PrintClient,
}

impl TestContext {
    /// Start a backend and a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start or the client cannot be
    /// built.
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestContext::new`], letting `configure` adjust the client
    /// configuration first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start or the client cannot be
    /// built.
    pub async fn with_config(
        configure: impl FnOnce(&mut ClientConfig),
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let backend = FakeBackend::start().await?;
        let mut config = ClientConfig::new(backend.url().clone());
        configure(&mut config);

        let storage = Arc::new(MemorySessionStorage::new());
        let client = PrintClient::new(config, Arc::clone(&storage) as Arc<dyn SessionStorage>)?;
        Ok(Self {
            backend,
            storage,
            client,
        })
    }

    /// A second client sharing this context's backend and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn another_client(&self) -> Result<PrintClient, Box<dyn std::error::Error>> {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemorySessionStorage::new());
        Ok(PrintClient::new(self.client.config().clone(), storage)?)
    }
}
