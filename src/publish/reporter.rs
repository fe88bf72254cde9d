//! Observability sink for terminal publish failures.

use teloxide::types::ChatId;
use tracing::error;

use crate::error::PublishError;

/// Receives every publish failure before it is returned to the caller.
pub trait FailureReporter: Send + Sync {
    fn report(&self, chat_id: ChatId, attempts: u32, error: &PublishError);
}

/// Reports failures as `error!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, chat_id: ChatId, attempts: u32, err: &PublishError) {
        let cause = std::error::Error::source(err)
            .map(|s| s.to_string())
            .unwrap_or_default();
        error!(
            chat_id = chat_id.0,
            attempts,
            cause = %cause,
            "Publish failed: {}",
            err
        );
    }
}
