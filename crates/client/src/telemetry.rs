//! Logging and error tracking.
//!
//! [`init`] installs the tracing subscriber (and Sentry, when a DSN is
//! configured). The remaining helpers attach user context and breadcrumbs; they
//! are no-ops when Sentry was never initialized.

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_print_core::User;

use crate::config::ClientConfig;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "campus_print_client=info";

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the global tracing subscriber.
///
/// Uses `RUST_LOG` when set, otherwise `campus_print_client=info`. Returns the
/// Sentry guard when a DSN is configured; keep it alive for the lifetime of
/// the process. Calling this twice leaves the first subscriber in place.
#[must_use]
pub fn init(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    // Sentry must be initialized before the tracing subscriber
    let guard = init_sentry(config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }

    guard
}

/// Associate subsequent errors with the signed-in user.
pub fn set_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Stop associating errors with a user.
pub fn clear_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_sentry_are_noops() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": "s@campus.edu"
        }))
        .unwrap_or_else(|e| panic!("invalid fixture: {e}"));
        set_user(&user);
        add_breadcrumb("order", "Placed order", &[("order_id", "o1")]);
        clear_user();
    }
}
