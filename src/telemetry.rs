use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging. `RUST_LOG` wins over the configured level.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!("memoflow telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one approval workflow operation
pub fn create_workflow_span(
    operation: &str,
    memo_id: Option<&str>,
    actor: Option<&str>,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "memo_workflow",
        operation = operation,
        memo.id = memo_id,
        actor.id = actor,
        correlation.id = correlation_id,
    )
}

/// Span wrapping the lifetime of one notification sync session
pub fn create_sync_span(user_id: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "notification_sync",
        user.id = user_id,
        correlation.id = correlation_id,
    )
}
