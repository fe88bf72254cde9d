//! Moderation queue.
//!
//! Each administrator gets an independent [`ReviewSession`] over a snapshot
//! of pending submissions. Sessions of different admins may show the same
//! items; a button press is checked against both the local snapshot and the
//! stored status, so whoever decides first wins and the other session expires.
//!
//! Approve claims the item with a conditional status update before publishing,
//! so an item another admin decided in the meantime is never posted. Claiming
//! and publishing are not transactional and every combination of outcomes gets
//! its own reply.

mod callback;
mod session;

use std::sync::Arc;

use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, UserId};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheConfig, TypedCache};
use crate::channel::ChannelApi;
use crate::database::{Submission, SubmissionStatus, SubmissionStore};
use crate::error::ApiError;
use crate::i18n::{format_text, get_text};
use crate::permissions::AdminAuthority;
use crate::publish::ReliableBatchSender;
use crate::utils::{author_mention, html_escape};

pub use callback::{ReviewAction, ReviewCallback};
pub use session::ReviewSession;

type SessionSlot = Arc<Mutex<Option<ReviewSession>>>;

#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// Channel approved submissions are published to.
    pub destination: ChatId,
    /// Pending submissions fetched per session.
    pub batch_size: u32,
    pub max_attempts: u32,
}

/// A button press as the transport delivered it.
#[derive(Debug, Clone)]
pub struct CallbackInput {
    pub id: String,
    pub from: u64,
    pub chat_id: ChatId,
    pub data: String,
}

/// Toast shown in answer to a button press.
struct Reply {
    text: Option<String>,
    alert: bool,
}

impl Reply {
    fn silent() -> Self {
        Self {
            text: None,
            alert: false,
        }
    }

    fn toast(key: &str) -> Self {
        Self {
            text: Some(get_text(key)),
            alert: false,
        }
    }

    fn alert(key: &str) -> Self {
        Self {
            text: Some(get_text(key)),
            alert: true,
        }
    }
}

/// Owns all review sessions.
pub struct ReviewDesk {
    channel: Arc<dyn ChannelApi>,
    submissions: Arc<dyn SubmissionStore>,
    authority: Arc<AdminAuthority>,
    sender: ReliableBatchSender,
    settings: ReviewSettings,
    sessions: TypedCache<u64, SessionSlot>,
    shutdown: CancellationToken,
}

impl ReviewDesk {
    pub fn new(
        channel: Arc<dyn ChannelApi>,
        submissions: Arc<dyn SubmissionStore>,
        authority: Arc<AdminAuthority>,
        sender: ReliableBatchSender,
        settings: ReviewSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            channel,
            submissions,
            authority,
            sender,
            settings,
            sessions: TypedCache::new("review_sessions", CacheConfig::review_session()),
            shutdown,
        }
    }

    /// Handle `/review`: open a fresh session and show its first item.
    pub async fn start(&self, admin_id: u64, chat_id: ChatId) -> anyhow::Result<()> {
        match self.authority.is_admin(UserId(admin_id)).await {
            Ok(true) => {}
            Ok(false) => {
                self.notify(chat_id, &get_text("review.admin_only")).await;
                return Ok(());
            }
            Err(e) => {
                error!("Admin check failed for {}: {}", admin_id, e);
                self.notify(chat_id, &get_text("common.generic_error")).await;
                return Ok(());
            }
        }

        // Retire the previous session, if any.
        if let Some(old) = self.sessions.get(&admin_id) {
            let mut guard = old.lock().await;
            if let Some(mut session) = guard.take() {
                self.clear_display(&mut session).await;
            }
        }

        let items = match self
            .submissions
            .list_pending(self.settings.batch_size, 0)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to load pending submissions: {:#}", e);
                self.notify(chat_id, &get_text("common.generic_error")).await;
                return Ok(());
            }
        };

        if items.is_empty() {
            self.notify(chat_id, &get_text("review.empty")).await;
            return Ok(());
        }

        info!("Admin {} opened review with {} items", admin_id, items.len());
        let mut session = ReviewSession::new(admin_id, chat_id, items);
        let shown = match self.render(&mut session).await {
            Ok(shown) => shown,
            Err(e) => {
                error!("Failed to render review card for {}: {}", admin_id, e);
                self.clear_display(&mut session).await;
                self.notify(chat_id, &get_text("common.generic_error")).await;
                return Ok(());
            }
        };

        if !shown {
            self.notify(chat_id, &get_text("review.empty")).await;
            return Ok(());
        }

        self.sessions
            .insert(admin_id, Arc::new(Mutex::new(Some(session))));
        Ok(())
    }

    /// Handle a button press.
    ///
    /// Returns `false` when the payload is not a review button.
    pub async fn handle_callback(&self, input: CallbackInput) -> anyhow::Result<bool> {
        let Some(callback) = ReviewCallback::parse(&input.data) else {
            return Ok(false);
        };

        let reply = self.dispatch(&input, callback).await;
        if let Err(e) = self
            .channel
            .answer_callback(&input.id, reply.text.as_deref(), reply.alert)
            .await
        {
            warn!("Failed to answer callback {}: {}", input.id, e);
        }
        Ok(true)
    }

    async fn dispatch(&self, input: &CallbackInput, callback: ReviewCallback) -> Reply {
        match self.authority.is_admin(UserId(input.from)).await {
            Ok(true) => {}
            Ok(false) => return Reply::alert("review.admin_only"),
            Err(e) => {
                error!("Admin check failed for {}: {}", input.from, e);
                return Reply::alert("common.generic_error");
            }
        }

        let Some(slot) = self.sessions.get(&input.from) else {
            return Reply::alert("review.session_expired");
        };
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut() else {
            return Reply::alert("review.session_expired");
        };

        if session.review_chat != input.chat_id || !session.matches(&callback) {
            debug!(
                "Stale button from {}: {:?} at {}",
                input.from, callback.submission_id, callback.index
            );
            self.teardown(&mut guard).await;
            return Reply::alert("review.session_expired");
        }

        // Another admin may have decided this item since the snapshot.
        match self.submissions.get_submission(callback.submission_id).await {
            Ok(Some(stored)) if stored.is_pending() => {}
            Ok(_) => {
                info!(
                    "Submission {} already decided, expiring session of {}",
                    callback.submission_id, input.from
                );
                self.teardown(&mut guard).await;
                return Reply::alert("review.session_expired");
            }
            Err(e) => {
                error!("Failed to re-read submission {}: {:#}", callback.submission_id, e);
                return Reply::alert("common.generic_error");
            }
        }

        let Some(session) = guard.as_mut() else {
            return Reply::alert("review.session_expired");
        };
        session.current_index = callback.index;

        let (reply, alive) = match callback.action {
            ReviewAction::Approve => self.approve(session).await,
            ReviewAction::Reject => self.reject(session).await,
            ReviewAction::Next => self.navigate(session, 1).await,
            ReviewAction::Previous => self.navigate(session, -1).await,
        };

        if !alive {
            *guard = None;
        }
        reply
    }

    async fn approve(&self, session: &mut ReviewSession) -> (Reply, bool) {
        let index = session.current_index;
        let Some(item) = session.items.get(index).cloned() else {
            return (Reply::alert("review.session_expired"), false);
        };

        // Claim the item first; a decision made by another admin wins.
        let recorded = match self
            .submissions
            .update_status(item.id, SubmissionStatus::Approved, session.admin_id)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                info!(
                    "Submission {} was decided by another admin, not publishing",
                    item.id
                );
                self.clear_display(session).await;
                return (Reply::alert("review.session_expired"), false);
            }
            Err(e) => {
                error!("Failed to record approval of {}: {:#}", item.id, e);
                false
            }
        };

        // Published even when recording failed; the admin asked for it.
        let published = self
            .sender
            .send(
                self.settings.destination,
                &item.media,
                None,
                self.settings.max_attempts,
                &self.shutdown,
            )
            .await
            .is_ok();

        let reply = match (published, recorded) {
            (true, true) => Reply::toast("review.approved"),
            (true, false) => Reply::alert("review.approved_bookkeeping_failed"),
            (false, true) => Reply::alert("review.publish_failed"),
            (false, false) => Reply::alert("review.publish_failed_unsaved"),
        };
        info!(
            "Admin {} approved {} (published: {}, recorded: {})",
            session.admin_id, item.id, published, recorded
        );

        session.remove(index);
        let alive = self.advance(session).await;
        (reply, alive)
    }

    async fn reject(&self, session: &mut ReviewSession) -> (Reply, bool) {
        let index = session.current_index;
        let Some(id) = session.items.get(index).map(|s| s.id) else {
            return (Reply::alert("review.session_expired"), false);
        };

        match self
            .submissions
            .update_status(id, SubmissionStatus::Rejected, session.admin_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                self.clear_display(session).await;
                return (Reply::alert("review.session_expired"), false);
            }
            Err(e) => {
                error!("Failed to reject {}: {:#}", id, e);
                return (Reply::alert("review.reject_failed"), true);
            }
        }

        info!("Admin {} rejected {}", session.admin_id, id);
        session.remove(index);
        let alive = self.advance(session).await;
        (Reply::toast("review.rejected"), alive)
    }

    async fn navigate(&self, session: &mut ReviewSession, delta: isize) -> (Reply, bool) {
        if !session.step(delta) {
            return (Reply::silent(), true);
        }
        self.clear_display(session).await;
        match self.render(session).await {
            Ok(true) => (Reply::silent(), true),
            Ok(false) => {
                self.notify(session.review_chat, &get_text("review.finished"))
                    .await;
                (Reply::silent(), false)
            }
            Err(e) => {
                self.render_failed(session, e).await;
                (Reply::alert("common.generic_error"), false)
            }
        }
    }

    /// Replace the display after the current item left the session.
    ///
    /// Returns whether the session still has items to show.
    async fn advance(&self, session: &mut ReviewSession) -> bool {
        self.clear_display(session).await;

        let shown = match self.render(session).await {
            Ok(shown) => shown,
            Err(e) => {
                self.render_failed(session, e).await;
                return false;
            }
        };

        if !shown {
            info!("Review queue of {} is empty", session.admin_id);
            self.notify(session.review_chat, &get_text("review.finished"))
                .await;
        }
        shown
    }

    /// End a session whose card could not be shown.
    async fn render_failed(&self, session: &mut ReviewSession, err: ApiError) {
        error!(
            "Failed to render review card for {}: {}",
            session.admin_id, err
        );
        self.clear_display(session).await;
        self.notify(session.review_chat, &get_text("review.render_failed"))
            .await;
    }

    /// Show the current item. Items without media are deleted and skipped.
    ///
    /// Returns `false` if nothing is left to show.
    async fn render(&self, session: &mut ReviewSession) -> Result<bool, ApiError> {
        loop {
            let Some(item) = session.current().cloned() else {
                return Ok(false);
            };

            if item.media.is_empty() {
                warn!("Submission {} has no media, deleting it", item.id);
                if let Err(e) = self.submissions.delete_submission(item.id).await {
                    error!("Failed to delete submission {}: {:#}", item.id, e);
                }
                session.remove(session.current_index);
                continue;
            }

            match self
                .channel
                .send_media(session.review_chat, &item.media, None)
                .await
            {
                Ok(ids) => session.display_messages.extend(ids),
                Err(e) => warn!("Failed to show media of {}: {}", item.id, e),
            }

            let card = self.card_text(session, &item);
            let keyboard = self.card_keyboard(session, &item);
            let card_id = self
                .channel
                .send_text(session.review_chat, &card, Some(keyboard))
                .await?;
            session.display_messages.push(card_id);
            return Ok(true);
        }
    }

    fn card_text(&self, session: &ReviewSession, item: &Submission) -> String {
        let comment = match item.comment.as_deref() {
            Some(c) if !c.trim().is_empty() => html_escape(c),
            _ => get_text("review.no_comment"),
        };
        format_text(
            "review.card",
            &[
                ("author", &author_mention(&item.author)),
                ("comment", &comment),
                ("position", &(session.current_index + 1).to_string()),
                ("total", &session.items.len().to_string()),
            ],
        )
    }

    fn card_keyboard(&self, session: &ReviewSession, item: &Submission) -> InlineKeyboardMarkup {
        let index = session.current_index;
        let button = |key: &str, action: ReviewAction| {
            InlineKeyboardButton::callback(
                get_text(key),
                ReviewCallback::new(action, item.id, index).encode(),
            )
        };

        let mut rows = vec![vec![
            button("review.button_approve", ReviewAction::Approve),
            button("review.button_reject", ReviewAction::Reject),
        ]];

        let mut nav = Vec::new();
        if index > 0 {
            nav.push(button("review.button_previous", ReviewAction::Previous));
        }
        if !session.is_last() {
            nav.push(button("review.button_next", ReviewAction::Next));
        }
        if !nav.is_empty() {
            rows.push(nav);
        }

        InlineKeyboardMarkup::new(rows)
    }

    async fn teardown(&self, slot: &mut Option<ReviewSession>) {
        if let Some(mut session) = slot.take() {
            self.clear_display(&mut session).await;
        }
    }

    /// Best-effort removal of the messages on screen.
    async fn clear_display(&self, session: &mut ReviewSession) {
        for message_id in session.take_display() {
            if let Err(e) = self
                .channel
                .delete_message(session.review_chat, message_id)
                .await
            {
                warn!(
                    "Failed to delete review message {} in {}: {}",
                    message_id.0, session.review_chat, e
                );
            }
        }
    }

    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.channel.send_text(chat_id, text, None).await {
            warn!("Failed to message {}: {}", chat_id, e);
        }
    }
}
