//! Integration tests for building a cart and placing an order.

use std::time::Duration;

use campus_print_client::{ApiError, ClientError, FileUpload, OrderError};
use campus_print_core::{Amount, OrderStatus, Role, SettingUpdate};
use campus_print_integration_tests::TestContext;
use secrecy::SecretString;

/// PNG signature; images print as one page.
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

async fn signed_in_student(ctx: &TestContext, email: &str) {
    ctx.client
        .auth()
        .register("Student", email, &SecretString::from("pw"), Role::Student)
        .await
        .expect("Registration failed");
}

fn fill_cart(ctx: &TestContext) {
    let orders = ctx.client.orders();
    orders
        .add_file(FileUpload::new("poster.png", "", PNG.to_vec()))
        .expect("Failed to add file");
    orders
        .add_stationery_item("Spiral notebook", Amount::from_units(20))
        .expect("Failed to add stationery");
    orders.update_setting(SettingUpdate::Color(true));
    orders.update_setting(SettingUpdate::Copies(2));
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    signed_in_student(&ctx, "s1@campus.edu").await;
    fill_cart(&ctx);

    let placed = ctx.client.checkout().await.expect("Checkout failed");

    assert_eq!(placed.otp.as_str().len(), 4);
    assert!(placed.otp.as_str().chars().all(|c| c.is_ascii_digit()));
    assert_eq!(placed.order.total_amount, Amount::from_units(40));
    assert_eq!(placed.order.status, OrderStatus::Paid);

    let orders = ctx.client.orders();
    assert!(orders.draft().is_empty());
    assert_eq!(orders.settings().copies(), 1);
    assert_eq!(orders.orders().len(), 1);
    assert_eq!(orders.orders()[0].otp, placed.otp);

    let stored = ctx.backend.orders();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["totalAmount"], 40);
    assert_eq!(stored[0]["userEmail"], "s1@campus.edu");
    assert_eq!(stored[0]["settings"]["copies"], 2);
    assert_eq!(stored[0]["files"][0]["type"], "image/png");
    assert_eq!(stored[0]["files"][0]["pages"], 1);
    assert_eq!(stored[0]["files"][1]["kind"], "stationery");
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    signed_in_student(&ctx, "s1@campus.edu").await;
    fill_cart(&ctx);
    ctx.backend.reject_orders(true);
    ctx.client.orders().settle().await;

    let before = ctx.client.orders().draft();
    let result = ctx.client.checkout().await;

    match result {
        Err(ClientError::Order(OrderError::Api(ApiError::Api(message)))) => {
            assert_eq!(message, "Payment declined");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(ctx.client.orders().draft(), before);
    assert!(ctx.client.orders().orders().is_empty());

    // The same cart goes through once the backend accepts it
    ctx.backend.reject_orders(false);
    ctx.client.checkout().await.expect("Retry failed");
    assert!(ctx.client.orders().draft().is_empty());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let ctx = TestContext::with_config(|config| config.timeout = Duration::from_millis(200))
        .await
        .expect("Failed to start test context");
    signed_in_student(&ctx, "s1@campus.edu").await;
    fill_cart(&ctx);
    ctx.backend.delay_orders(Duration::from_secs(2));

    let result = ctx.client.checkout().await;

    assert!(
        matches!(
            result,
            Err(ClientError::Order(OrderError::Api(ApiError::Timeout(_))))
        ),
        "expected timeout, got {result:?}"
    );
    assert_eq!(ctx.client.orders().files().len(), 2);
    assert!(!ctx.client.orders().is_submitting());
}

#[tokio::test]
async fn test_empty_cart_is_not_sent() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    signed_in_student(&ctx, "s1@campus.edu").await;

    let result = ctx.client.checkout().await;

    assert!(matches!(
        result,
        Err(ClientError::Order(OrderError::EmptyCart))
    ));
    assert_eq!(ctx.backend.order_requests(), 0);
}

#[tokio::test]
async fn test_students_only_see_their_own_orders() {
    let ctx = TestContext::new().await.expect("Failed to start test context");
    signed_in_student(&ctx, "s1@campus.edu").await;
    fill_cart(&ctx);
    ctx.client.checkout().await.expect("Checkout failed");

    let other = ctx.another_client().expect("Failed to build client");
    other
        .auth()
        .register("Other", "s2@campus.edu", &SecretString::from("pw"), Role::Student)
        .await
        .expect("Registration failed");
    other
        .orders()
        .add_stationery_item("Pencil", Amount::from_units(5))
        .expect("Failed to add stationery");
    other.checkout().await.expect("Checkout failed");

    ctx.client.refresh_orders().await.expect("Refresh failed");
    other.refresh_orders().await.expect("Refresh failed");

    assert_eq!(ctx.backend.orders().len(), 2);
    let mine = ctx.client.orders().orders();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].total_amount, Amount::from_units(40));
    let theirs = other.orders().orders();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].total_amount, Amount::from_units(5));
}
