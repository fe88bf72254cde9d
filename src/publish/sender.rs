//! Media batch publishing with rate-limit backoff.

use std::sync::Arc;

use teloxide::types::{ChatId, MessageId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::reporter::FailureReporter;
use crate::channel::ChannelApi;
use crate::database::MediaRef;
use crate::error::PublishError;

/// Publishes media batches, retrying only when rate limited.
///
/// The backoff sleep is the only intentional wait and it is cancellable.
#[derive(Clone)]
pub struct ReliableBatchSender {
    channel: Arc<dyn ChannelApi>,
    reporter: Arc<dyn FailureReporter>,
}

impl ReliableBatchSender {
    pub fn new(channel: Arc<dyn ChannelApi>, reporter: Arc<dyn FailureReporter>) -> Self {
        Self { channel, reporter }
    }

    /// Send `media` to `chat_id`, making at most `max_attempts` attempts.
    ///
    /// - rate limited: wait the advised time and try again
    /// - any other error: fail immediately with [`PublishError::Api`]
    /// - out of attempts: [`PublishError::MaxRetries`] with the last error
    /// - `cancel` fired: [`PublishError::Cancelled`]
    pub async fn send(
        &self,
        chat_id: ChatId,
        media: &[MediaRef],
        caption: Option<&str>,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<MessageId>, PublishError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.fail(chat_id, attempt, PublishError::Cancelled));
                }
                result = self.channel.send_media(chat_id, media, caption) => result,
            };

            let err = match result {
                Ok(ids) => {
                    debug!(
                        "Published {} items to {} on attempt {}",
                        media.len(),
                        chat_id,
                        attempt
                    );
                    return Ok(ids);
                }
                Err(err) => err,
            };

            let Some(wait) = err.advised_wait() else {
                return Err(self.fail(chat_id, attempt, PublishError::Api(err)));
            };

            if attempt >= max_attempts {
                return Err(self.fail(
                    chat_id,
                    attempt,
                    PublishError::MaxRetries {
                        attempts: attempt,
                        last: err,
                    },
                ));
            }

            warn!(
                "Rate limited publishing to {} (attempt {}/{}), waiting {:?}",
                chat_id, attempt, max_attempts, wait
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.fail(chat_id, attempt, PublishError::Cancelled));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn fail(&self, chat_id: ChatId, attempts: u32, err: PublishError) -> PublishError {
        self.reporter.report(chat_id, attempts, &err);
        err
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::error::ApiError;
    use crate::testing::FakeChannel;

    const DEST: ChatId = ChatId(-100);

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<String>>,
    }

    impl FailureReporter for RecordingReporter {
        fn report(&self, _chat_id: ChatId, _attempts: u32, err: &PublishError) {
            self.reports.lock().push(err.to_string());
        }
    }

    fn limited(secs: u64) -> ApiError {
        ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(secs)),
            message: format!("retry after {}", secs),
        }
    }

    fn sender(fake: &Arc<FakeChannel>) -> (ReliableBatchSender, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        (ReliableBatchSender::new(fake.clone(), reporter.clone()), reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_rate_limits() {
        let fake = Arc::new(FakeChannel::new());
        fake.fail_media(DEST, vec![limited(2), limited(3)]);
        let (sender, reporter) = sender(&fake);
        let media = vec![MediaRef::photo("a"), MediaRef::photo("b")];

        let start = Instant::now();
        let ids = sender
            .send(DEST, &media, None, 5, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(fake.media_attempts(), 3);
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(reporter.reports.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exceeded() {
        let fake = Arc::new(FakeChannel::new());
        fake.fail_media(DEST, vec![limited(1), limited(1), limited(1)]);
        let (sender, reporter) = sender(&fake);

        let err = sender
            .send(DEST, &[MediaRef::photo("a")], None, 3, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::MaxRetries { attempts: 3, last: ApiError::RateLimited { .. } }
        ));
        assert_eq!(fake.media_attempts(), 3);
        assert_eq!(reporter.reports.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let fake = Arc::new(FakeChannel::new());
        fake.fail_media(DEST, vec![ApiError::Request("bad request".into())]);
        let (sender, reporter) = sender(&fake);

        let err = sender
            .send(DEST, &[MediaRef::photo("a")], None, 5, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Api(ApiError::Request(_))));
        assert_eq!(fake.media_attempts(), 1);
        assert_eq!(reporter.reports.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let fake = Arc::new(FakeChannel::new());
        fake.fail_media(DEST, vec![limited(60)]);
        let (sender, reporter) = sender(&fake);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = sender
            .send(DEST, &[MediaRef::photo("a")], None, 5, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(fake.media_attempts(), 1);
        assert_eq!(reporter.reports.lock().len(), 1);
    }
}
