//! In-memory fakes for the channel API and the stores.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use parking_lot::Mutex;
use teloxide::types::{ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, UserId};

use crate::channel::{ChannelApi, MemberStatus};
use crate::database::{Feedback, FeedbackStore, MediaRef, Submission, SubmissionStatus, SubmissionStore};
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct SentText {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub callbacks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SentMedia {
    pub chat_id: ChatId,
    pub message_ids: Vec<MessageId>,
    pub media: Vec<MediaRef>,
    pub caption: Option<String>,
}

/// Records every call; media sends can be scripted to fail per chat.
#[derive(Default)]
pub struct FakeChannel {
    texts: Mutex<Vec<SentText>>,
    media: Mutex<Vec<SentMedia>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    answers: Mutex<Vec<(String, Option<String>)>>,
    media_failures: Mutex<HashMap<ChatId, VecDeque<ApiError>>>,
    text_failures: Mutex<HashMap<ChatId, VecDeque<ApiError>>>,
    media_attempts: AtomicUsize,
    admins: Mutex<Vec<UserId>>,
    admin_error: Mutex<Option<ApiError>>,
    admin_fetches: AtomicUsize,
    members: Mutex<HashSet<UserId>>,
    member_lookups: AtomicUsize,
    next_id: AtomicI32,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            ..Default::default()
        }
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn set_admins(&self, ids: &[u64]) {
        *self.admins.lock() = ids.iter().map(|id| UserId(*id)).collect();
    }

    pub fn fail_admins(&self, err: ApiError) {
        *self.admin_error.lock() = Some(err);
    }

    pub fn add_member(&self, id: u64) {
        self.members.lock().insert(UserId(id));
    }

    /// Queue errors returned by the next media sends to `chat_id`.
    pub fn fail_media(&self, chat_id: ChatId, errors: Vec<ApiError>) {
        self.media_failures
            .lock()
            .entry(chat_id)
            .or_default()
            .extend(errors);
    }

    /// Queue errors returned by the next text sends to `chat_id`.
    pub fn fail_text(&self, chat_id: ChatId, errors: Vec<ApiError>) {
        self.text_failures
            .lock()
            .entry(chat_id)
            .or_default()
            .extend(errors);
    }

    pub fn admin_fetches(&self) -> usize {
        self.admin_fetches.load(Ordering::SeqCst)
    }

    pub fn member_lookups(&self) -> usize {
        self.member_lookups.load(Ordering::SeqCst)
    }

    pub fn media_attempts(&self) -> usize {
        self.media_attempts.load(Ordering::SeqCst)
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<SentText> {
        self.texts
            .lock()
            .iter()
            .filter(|t| t.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn last_text(&self, chat_id: ChatId) -> Option<SentText> {
        self.texts_to(chat_id).pop()
    }

    pub fn media_to(&self, chat_id: ChatId) -> Vec<SentMedia> {
        self.media
            .lock()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().clone()
    }

    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.answers.lock().clone()
    }
}

fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
    markup
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl ChannelApi for FakeChannel {
    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &[MediaRef],
        caption: Option<&str>,
    ) -> Result<Vec<MessageId>, ApiError> {
        self.media_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self
            .media_failures
            .lock()
            .get_mut(&chat_id)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }

        let message_ids: Vec<MessageId> = media.iter().map(|_| self.next_message_id()).collect();
        self.media.lock().push(SentMedia {
            chat_id,
            message_ids: message_ids.clone(),
            media: media.to_vec(),
            caption: caption.map(str::to_string),
        });
        Ok(message_ids)
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, ApiError> {
        if let Some(err) = self
            .text_failures
            .lock()
            .get_mut(&chat_id)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }

        let message_id = self.next_message_id();
        self.texts.lock().push(SentText {
            chat_id,
            message_id,
            text: html.to_string(),
            callbacks: keyboard.as_ref().map(callback_data).unwrap_or_default(),
        });
        Ok(message_id)
    }

    async fn member_status(
        &self,
        _chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, ApiError> {
        self.member_lookups.fetch_add(1, Ordering::SeqCst);
        if self.admins.lock().contains(&user_id) {
            Ok(MemberStatus::Administrator)
        } else if self.members.lock().contains(&user_id) {
            Ok(MemberStatus::Member)
        } else {
            Ok(MemberStatus::NotMember)
        }
    }

    async fn administrators(&self, _chat_id: ChatId) -> Result<Vec<UserId>, ApiError> {
        self.admin_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.admin_error.lock().clone() {
            return Err(err);
        }
        Ok(self.admins.lock().clone())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), ApiError> {
        self.deleted.lock().push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        _show_alert: bool,
    ) -> Result<(), ApiError> {
        self.answers
            .lock()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

/// Submission and feedback store backed by vectors.
#[derive(Default)]
pub struct MemoryStore {
    submissions: Mutex<Vec<Submission>>,
    feedback: Mutex<Vec<Feedback>>,
    pub fail_writes: AtomicBool,
    pub fail_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `count` pending submissions with strictly increasing timestamps.
    pub fn seed_pending(&self, count: usize) -> Vec<Submission> {
        let mut seeded = Vec::with_capacity(count);
        for i in 0..count {
            let mut s = Submission::new(
                crate::database::Author::new(500 + i as u64, format!("User{}", i)),
                500 + i as i64,
                i as i32 + 1,
                vec![MediaRef::photo(format!("photo-{}", i))],
                Some(format!("comment {}", i)),
            );
            s.submitted_at = 1_700_000_000 + i as i64;
            seeded.push(s.clone());
            self.submissions.lock().push(s);
        }
        seeded
    }

    pub fn insert(&self, submission: Submission) {
        self.submissions.lock().push(submission);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    pub fn submission(&self, id: ObjectId) -> Option<Submission> {
        self.submissions.lock().iter().find(|s| s.id == id).cloned()
    }

    pub fn feedback(&self) -> Vec<Feedback> {
        self.feedback.lock().clone()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(&self, submission: &Submission) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("write failed");
        }
        self.submissions.lock().push(submission.clone());
        Ok(())
    }

    async fn list_pending(&self, limit: u32, offset: u64) -> Result<Vec<Submission>> {
        let mut pending: Vec<Submission> = self
            .submissions
            .lock()
            .iter()
            .filter(|s| s.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|s| (s.submitted_at, s.id));
        Ok(pending
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_submission(&self, id: ObjectId) -> Result<Option<Submission>> {
        Ok(self.submission(id))
    }

    async fn update_status(
        &self,
        id: ObjectId,
        status: SubmissionStatus,
        reviewer_id: u64,
    ) -> Result<bool> {
        if self.fail_updates.load(Ordering::SeqCst) {
            anyhow::bail!("update failed");
        }
        let mut all = self.submissions.lock();
        match all.iter_mut().find(|s| s.id == id) {
            Some(s) if s.status.can_transition_to(status) => {
                s.status = status;
                s.reviewer_id = Some(reviewer_id);
                s.reviewed_at = Some(chrono::Utc::now().timestamp());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_submission(&self, id: ObjectId) -> Result<bool> {
        let mut all = self.submissions.lock();
        let before = all.len();
        all.retain(|s| s.id != id);
        Ok(all.len() != before)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("write failed");
        }
        self.feedback.lock().push(feedback.clone());
        Ok(())
    }
}
