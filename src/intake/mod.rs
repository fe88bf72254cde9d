//! Submission intake.
//!
//! Turns private messages into suggestions or feedback depending on what the
//! user asked to do:
//!
//! - `/suggest` → `AwaitingSuggestion`: one photo or one album becomes a
//!   pending [`Submission`]
//! - `/feedback` → `AwaitingFeedback`: text, photos and videos become a
//!   [`Feedback`] record
//!
//! Users in `Idle` are never intercepted. Albums go through a
//! [`BatchCollector`] and are stored once the debounce window closes.

mod message;
mod state;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use teloxide::types::{ChatId, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::batch::{BatchCollector, FinalizeHandler};
use crate::channel::ChannelApi;
use crate::database::{Author, Feedback, FeedbackStore, MediaRef, Submission, SubmissionStore};
use crate::error::ApiError;
use crate::i18n::{format_text, get_text};
use crate::permissions::AdminAuthority;

#[cfg(test)]
pub(crate) use message::fixtures;
pub use message::{IncomingMessage, PhotoVariant};
pub use state::{UserInteractionState, UserStates};

/// Tunables for the intake.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    /// Channel users must belong to before suggesting.
    pub destination: ChatId,
    pub debounce: Duration,
    pub max_fragments: usize,
}

/// State and stores shared with the album finalize handlers.
struct IntakeCore {
    channel: Arc<dyn ChannelApi>,
    submissions: Arc<dyn SubmissionStore>,
    feedback: Arc<dyn FeedbackStore>,
    states: UserStates,
}

/// Per-user intake state machine.
pub struct SubmissionIntake {
    core: Arc<IntakeCore>,
    authority: Arc<AdminAuthority>,
    destination: ChatId,
    suggestion_albums: BatchCollector<IncomingMessage>,
    feedback_albums: BatchCollector<IncomingMessage>,
}

impl SubmissionIntake {
    pub fn new(
        channel: Arc<dyn ChannelApi>,
        submissions: Arc<dyn SubmissionStore>,
        feedback: Arc<dyn FeedbackStore>,
        authority: Arc<AdminAuthority>,
        settings: IntakeSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let core = Arc::new(IntakeCore {
            channel,
            submissions,
            feedback,
            states: UserStates::new(),
        });

        let suggestion_albums = BatchCollector::new(
            "suggestions",
            settings.debounce,
            settings.max_fragments,
            album_handler(&core, UserInteractionState::AwaitingSuggestion),
            shutdown.clone(),
        );
        let feedback_albums = BatchCollector::new(
            "feedback",
            settings.debounce,
            settings.max_fragments,
            album_handler(&core, UserInteractionState::AwaitingFeedback),
            shutdown,
        );

        Self {
            core,
            authority,
            destination: settings.destination,
            suggestion_albums,
            feedback_albums,
        }
    }

    /// Handle `/suggest`.
    ///
    /// Membership is checked live on every attempt.
    pub async fn begin_suggestion(&self, author: &Author, chat_id: ChatId) -> anyhow::Result<()> {
        let slot = self.core.states.slot(author.user_id);
        let mut state = slot.lock().await;

        if *state == UserInteractionState::AwaitingSuggestion {
            self.core
                .notify(chat_id, &get_text("intake.suggest_already_waiting"))
                .await;
            return Ok(());
        }

        let status = self
            .core
            .channel
            .member_status(self.destination, UserId(author.user_id))
            .await;

        match status {
            Ok(s) if s.is_member() => {}
            Ok(_) | Err(ApiError::NotMember) => {
                self.core
                    .notify(chat_id, &get_text("intake.suggest_not_member"))
                    .await;
                return Ok(());
            }
            Err(e) => {
                error!("Membership check failed for {}: {}", author.user_id, e);
                self.core
                    .notify(chat_id, &get_text("common.generic_error"))
                    .await;
                return Ok(());
            }
        }

        *state = UserInteractionState::AwaitingSuggestion;
        info!("User {} is now suggesting", author.user_id);
        self.core
            .notify(chat_id, &get_text("intake.suggest_prompt"))
            .await;
        Ok(())
    }

    /// Handle `/feedback`. Administrators are turned away.
    pub async fn begin_feedback(&self, author: &Author, chat_id: ChatId) -> anyhow::Result<()> {
        match self.authority.is_admin(UserId(author.user_id)).await {
            Ok(false) => {}
            Ok(true) => {
                self.core
                    .notify(chat_id, &get_text("intake.feedback_admin"))
                    .await;
                return Ok(());
            }
            Err(e) => {
                error!("Admin check failed for {}: {}", author.user_id, e);
                self.core
                    .notify(chat_id, &get_text("common.generic_error"))
                    .await;
                return Ok(());
            }
        }

        let slot = self.core.states.slot(author.user_id);
        *slot.lock().await = UserInteractionState::AwaitingFeedback;
        info!("User {} is now writing feedback", author.user_id);
        self.core
            .notify(chat_id, &get_text("intake.feedback_prompt"))
            .await;
        Ok(())
    }

    /// Handle `/cancel`.
    pub async fn cancel(&self, author: &Author, chat_id: ChatId) -> anyhow::Result<()> {
        let cancelled = match self.core.states.existing(author.user_id) {
            Some(slot) => {
                let mut state = slot.lock().await;
                let was_busy = *state != UserInteractionState::Idle;
                *state = UserInteractionState::Idle;
                was_busy
            }
            None => false,
        };

        let key = if cancelled {
            "intake.cancelled"
        } else {
            "intake.nothing_to_cancel"
        };
        self.core.notify(chat_id, &get_text(key)).await;
        Ok(())
    }

    /// Entry point for every private message.
    ///
    /// Returns `false` when the user is not in an intake flow and the message
    /// was left alone.
    pub async fn handle_message(&self, msg: IncomingMessage) -> anyhow::Result<bool> {
        let Some(slot) = self.core.states.existing(msg.author.user_id) else {
            return Ok(false);
        };
        let mut state = slot.lock().await;
        let current = *state;

        match current {
            UserInteractionState::Idle => Ok(false),
            UserInteractionState::AwaitingSuggestion => {
                if let Some(group) = msg.media_group_id.clone() {
                    self.suggestion_albums.collect(&group, msg.sequence(), msg);
                } else if msg.best_photo().is_some() {
                    self.core.finish_suggestion(&mut state, &[msg]).await;
                } else {
                    self.core
                        .notify(msg.chat_id, &get_text("intake.suggest_invalid"))
                        .await;
                }
                Ok(true)
            }
            UserInteractionState::AwaitingFeedback => {
                if let Some(group) = msg.media_group_id.clone() {
                    self.feedback_albums.collect(&group, msg.sequence(), msg);
                } else {
                    self.core.finish_feedback(&mut state, &[msg]).await;
                }
                Ok(true)
            }
        }
    }

    /// Current state of a user.
    pub async fn state_of(&self, user_id: u64) -> UserInteractionState {
        self.core.states.current(user_id).await
    }
}

/// Finalize handler storing an album for users still in `expected`.
fn album_handler(
    core: &Arc<IntakeCore>,
    expected: UserInteractionState,
) -> FinalizeHandler<IncomingMessage> {
    let core = Arc::clone(core);
    Arc::new(move |group_id: String, fragments: Vec<IncomingMessage>| {
        let core = Arc::clone(&core);
        async move { core.flush_album(group_id, fragments, expected).await }.boxed()
    })
}

impl IntakeCore {
    async fn flush_album(
        &self,
        group_id: String,
        fragments: Vec<IncomingMessage>,
        expected: UserInteractionState,
    ) -> anyhow::Result<()> {
        let Some(first) = fragments.first() else {
            return Ok(());
        };
        let user_id = first.author.user_id;

        let slot = self.states.slot(user_id);
        let mut state = slot.lock().await;

        // The user may have cancelled or finished while the album was collecting.
        if *state != expected {
            info!(
                "Discarding album {} from {}: state is now {:?}",
                group_id, user_id, *state
            );
            self.notify(first.chat_id, &get_text("intake.album_discarded"))
                .await;
            return Ok(());
        }

        match expected {
            UserInteractionState::AwaitingSuggestion => {
                self.finish_suggestion(&mut state, &fragments).await
            }
            UserInteractionState::AwaitingFeedback => {
                self.finish_feedback(&mut state, &fragments).await
            }
            UserInteractionState::Idle => {}
        }
        Ok(())
    }

    /// Store one suggestion made of `fragments` (in album order).
    async fn finish_suggestion(
        &self,
        state: &mut UserInteractionState,
        fragments: &[IncomingMessage],
    ) {
        let Some(first) = fragments.first() else {
            return;
        };

        let media: Vec<MediaRef> = fragments
            .iter()
            .filter_map(|f| f.best_photo())
            .map(MediaRef::photo)
            .collect();

        if media.is_empty() {
            self.notify(first.chat_id, &get_text("intake.suggest_invalid"))
                .await;
            return;
        }

        let count = media.len();
        let submission = Submission::new(
            first.author.clone(),
            first.chat_id.0,
            first.message_id.0,
            media,
            first.text().map(str::to_string),
        );

        *state = UserInteractionState::Idle;

        if let Err(e) = self.submissions.create_submission(&submission).await {
            error!("Failed to store suggestion from {}: {:#}", first.author.user_id, e);
            self.notify(first.chat_id, &get_text("common.generic_error"))
                .await;
            return;
        }

        info!(
            "Suggestion {} stored for user {} ({} photos)",
            submission.id, first.author.user_id, count
        );
        self.notify(
            first.chat_id,
            &format_text("intake.suggest_received", &[("count", &count.to_string())]),
        )
        .await;
    }

    /// Store one feedback record made of `fragments` (in album order).
    async fn finish_feedback(&self, state: &mut UserInteractionState, fragments: &[IncomingMessage]) {
        let Some(first) = fragments.first() else {
            return;
        };

        let mut feedback = Feedback::new(first.author.clone(), first.chat_id.0, first.message_id.0);
        feedback.media_group_id = first.media_group_id.clone();
        for fragment in fragments {
            if let Some(photo) = fragment.best_photo() {
                feedback.photos.push(photo.to_string());
            }
            if let Some(video) = &fragment.video {
                feedback.videos.push(video.clone());
            }
            if let Some(text) = fragment.text() {
                feedback.push_text(text);
            }
        }

        if feedback.is_empty() {
            self.notify(first.chat_id, &get_text("intake.feedback_invalid"))
                .await;
            return;
        }

        *state = UserInteractionState::Idle;

        if let Err(e) = self.feedback.create_feedback(&feedback).await {
            error!("Failed to store feedback from {}: {:#}", first.author.user_id, e);
            self.notify(first.chat_id, &get_text("common.generic_error"))
                .await;
            return;
        }

        info!("Feedback {} stored for user {}", feedback.id, first.author.user_id);
        self.notify(first.chat_id, &get_text("intake.feedback_received"))
            .await;
    }

    /// Best-effort reply to the user.
    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.channel.send_text(chat_id, text, None).await {
            warn!("Failed to message {}: {}", chat_id, e);
        }
    }
}
