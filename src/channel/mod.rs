//! Destination/channel API.
//!
//! Everything the moderation core needs from Telegram goes through
//! [`ChannelApi`], so intake, review and publishing can be driven by an
//! in-memory fake in tests.

mod telegram;

use async_trait::async_trait;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, UserId};

use crate::database::MediaRef;
use crate::error::ApiError;

pub use telegram::TelegramChannel;

/// Membership of a user in the destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    /// Owner or administrator.
    Administrator,
    /// Regular (possibly restricted) member.
    Member,
    /// Left, kicked or never joined.
    NotMember,
}

impl MemberStatus {
    pub fn is_member(self) -> bool {
        !matches!(self, Self::NotMember)
    }
}

/// Calls the core makes against Telegram.
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Send a batch of media to a chat. The caption goes on the first item.
    ///
    /// Returns the ids of the sent messages in order.
    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &[MediaRef],
        caption: Option<&str>,
    ) -> Result<Vec<MessageId>, ApiError>;

    /// Send an HTML text message, optionally with an inline keyboard.
    async fn send_text(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, ApiError>;

    /// Live membership lookup, never cached.
    async fn member_status(&self, chat_id: ChatId, user_id: UserId)
    -> Result<MemberStatus, ApiError>;

    /// Full administrator list of a chat.
    async fn administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>, ApiError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), ApiError>;

    /// Acknowledge a button press, optionally with a short toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), ApiError>;
}
