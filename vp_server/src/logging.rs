//! Structured logging configuration.
//!
//! The server logs through `tracing`; records emitted by the `vpoker` core
//! through the `log` facade are forwarded into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var, defaulting to
/// `info` with noisy transport crates turned down.
///
/// # Example
///
/// ```no_run
/// use vp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log one table action with structured fields
pub fn log_table_action(action: &str, table_id: &uuid::Uuid, user: Option<&uuid::Uuid>, outcome: &str) {
    tracing::info!(
        action = action,
        table_id = %table_id,
        user_id = user.map(|u| u.to_string()),
        outcome = outcome,
        "Table action"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_table_action() {
        // Just ensure it doesn't panic without a subscriber
        let table = uuid::Uuid::new_v4();
        log_table_action("shuffle", &table, Some(&uuid::Uuid::new_v4()), "ok");
        log_table_action("kick", &table, None, "not found");
    }
}
