//! Error types shared by the transport-facing components.

use std::time::Duration;

use thiserror::Error;

/// Wait used when a rate-limit response carries no usable retry hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Failure reported by the destination/channel API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Flood control: the API asked us to slow down.
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// The user is not (or no longer) a member of the chat.
    #[error("user is not a member of the chat")]
    NotMember,

    /// Any other API or network failure. Never retried.
    #[error("api request failed: {0}")]
    Request(String),
}

impl ApiError {
    /// Build a rate-limit error from a raw API description.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Wait advised by a rate-limit response.
    ///
    /// Uses the structured hint when present, then tries to read
    /// "retry after N" out of the message, then falls back to
    /// [`DEFAULT_RETRY_AFTER`]. Returns `None` for other errors.
    pub fn advised_wait(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after,
                message,
            } => Some(
                retry_after
                    .or_else(|| parse_retry_after(message))
                    .unwrap_or(DEFAULT_RETRY_AFTER),
            ),
            _ => None,
        }
    }
}

/// Extract the number of seconds from "... retry after 17" style messages.
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();
    let idx = lower.find("retry after")?;
    let digits: String = lower[idx + "retry after".len()..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<u64>().ok().map(Duration::from_secs)
}

/// Terminal failure of a reliable publish.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The caller's cancellation token fired.
    #[error("publish cancelled")]
    Cancelled,

    /// Every attempt was rate limited.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetries {
        attempts: u32,
        #[source]
        last: ApiError,
    },

    /// A non rate-limit failure; not retried.
    #[error("publish failed")]
    Api(#[source] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(
            parse_retry_after("Too Many Requests: retry after 17"),
            Some(Duration::from_secs(17))
        );
        assert_eq!(parse_retry_after("Retry After  3 seconds"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after("Too Many Requests"), None);
        assert_eq!(parse_retry_after("retry after soon"), None);
    }

    #[test]
    fn test_advised_wait_precedence() {
        let structured = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
            message: "retry after 40".into(),
        };
        assert_eq!(structured.advised_wait(), Some(Duration::from_secs(2)));

        let parsed = ApiError::rate_limited("Too Many Requests: retry after 40");
        assert_eq!(parsed.advised_wait(), Some(Duration::from_secs(40)));

        let fallback = ApiError::rate_limited("flood");
        assert_eq!(fallback.advised_wait(), Some(DEFAULT_RETRY_AFTER));

        assert_eq!(ApiError::NotMember.advised_wait(), None);
    }
}
