//! Integration tests for login, registration and the persisted session.

use std::sync::Arc;

use campus_print_client::auth::{TOKEN_KEY, USER_KEY};
use campus_print_client::{ApiError, AuthError, ClientError, PrintClient, SessionStorage};
use campus_print_core::{Amount, Role};
use campus_print_integration_tests::TestContext;
use secrecy::SecretString;

fn password(value: &str) -> SecretString {
    SecretString::from(value)
}

#[tokio::test]
async fn test_register_persists_session() {
    let ctx = TestContext::new().await.expect("Failed to start test context");

    let session = ctx
        .client
        .auth()
        .register("Asha", "Asha@Campus.edu", &password("pw-1"), Role::Student)
        .await
        .expect("Registration failed");

    assert_eq!(session.user.email.as_str(), "asha@campus.edu");
    assert_eq!(session.user.role, Role::Student);
    assert!(ctx.client.api().has_token());
    assert!(ctx.storage.get(USER_KEY).expect("read user").is_some());
    assert!(ctx.storage.get(TOKEN_KEY).expect("read token").is_some());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.backend
        .seed_account("Vee", "vendor@campus.edu", "pw", "vendor");
    ctx.client
        .auth()
        .login("vendor@campus.edu", &password("pw"), Role::Vendor)
        .await
        .expect("Login failed");

    // Same storage, fresh process
    let restarted = PrintClient::new(
        ctx.client.config().clone(),
        Arc::clone(&ctx.storage) as Arc<dyn SessionStorage>,
    )
    .expect("Failed to build client");
    let user = restarted
        .init()
        .expect("Hydrate failed")
        .expect("Session was not restored");

    assert_eq!(user.email.as_str(), "vendor@campus.edu");
    assert_eq!(user.role, Role::Vendor);

    // The restored token works against the backend
    restarted.refresh_orders().await.expect("Refresh failed");
}

#[tokio::test]
async fn test_duplicate_registration_surfaces_backend_message() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.backend
        .seed_account("Asha", "asha@campus.edu", "pw", "student");

    let result = ctx
        .client
        .auth()
        .register("Asha", "asha@campus.edu", &password("pw"), Role::Student)
        .await;

    match result {
        Err(AuthError::Api(ApiError::Status { status, message })) => {
            assert_eq!(status, 409);
            assert_eq!(message, "Email already registered");
        }
        other => panic!("expected 409, got {other:?}"),
    }
    assert!(!ctx.client.auth().is_authenticated());
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.backend
        .seed_account("Asha", "asha@campus.edu", "right", "student");

    let err = ctx
        .client
        .auth()
        .login("asha@campus.edu", &password("wrong"), Role::Student)
        .await
        .expect_err("Login should fail");

    assert!(err.is_invalid_credentials());
    assert!(ctx.storage.get(TOKEN_KEY).expect("read token").is_none());
}

#[tokio::test]
async fn test_logout_clears_storage_and_token() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.client
        .auth()
        .register("Asha", "asha@campus.edu", &password("pw"), Role::Student)
        .await
        .expect("Registration failed");

    ctx.client.logout().expect("Logout failed");

    assert!(ctx.client.auth().session().is_none());
    assert!(!ctx.client.api().has_token());
    assert!(ctx.storage.get(USER_KEY).expect("read user").is_none());
    assert!(ctx.storage.get(TOKEN_KEY).expect("read token").is_none());
    assert!(ctx.client.init().expect("Hydrate failed").is_none());
}

#[tokio::test]
async fn test_user_list_is_cached_per_session() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.backend
        .seed_account("Root", "admin@campus.edu", "pw", "admin");
    ctx.backend
        .seed_account("Asha", "asha@campus.edu", "pw", "student");
    let auth = ctx.client.auth();
    auth.login("admin@campus.edu", &password("pw"), Role::Admin)
        .await
        .expect("Login failed");

    let users = ctx.client.users().await.expect("List users failed");
    assert_eq!(users.len(), 2);
    ctx.client.users().await.expect("List users failed");
    assert_eq!(ctx.backend.users_requests(), 1);

    ctx.client.logout().expect("Logout failed");
    auth.login("admin@campus.edu", &password("pw"), Role::Admin)
        .await
        .expect("Login failed");
    ctx.client.users().await.expect("List users failed");
    assert_eq!(ctx.backend.users_requests(), 2);
}

#[tokio::test]
async fn test_switching_user_drops_previous_cart_and_orders() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    ctx.backend
        .seed_account("Asha", "asha@campus.edu", "pw", "student");
    ctx.client
        .login("asha@campus.edu", &password("pw"), Role::Student)
        .await
        .expect("Login failed");
    let orders = ctx.client.orders();
    orders
        .add_stationery_item("Lab manual", Amount::from_units(60))
        .expect("Failed to add stationery");
    ctx.client.checkout().await.expect("Checkout failed");
    orders
        .add_stationery_item("Highlighter", Amount::from_units(15))
        .expect("Failed to add stationery");

    // Same account again keeps everything
    ctx.client
        .login("asha@campus.edu", &password("pw"), Role::Student)
        .await
        .expect("Login failed");
    assert_eq!(orders.orders().len(), 1);
    assert_eq!(orders.files().len(), 1);

    // No logout in between
    let session = ctx
        .client
        .register("Bo", "bo@campus.edu", &password("pw"), Role::Student)
        .await
        .expect("Registration failed");

    assert_eq!(session.user.email.as_str(), "bo@campus.edu");
    assert!(orders.orders().is_empty());
    assert!(orders.draft().is_empty());
    assert!(matches!(
        ctx.client.login("nobody@campus.edu", &password("pw"), Role::Student).await,
        Err(ClientError::Auth(_))
    ));
    assert_eq!(ctx.client.auth().user().map(|user| user.id), Some(session.user.id));
}
