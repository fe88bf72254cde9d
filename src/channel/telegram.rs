//! Teloxide-backed [`ChannelApi`].

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, InputMediaVideo,
    MessageId, ParseMode, UserId,
};
use teloxide::{ApiError as TelegramApiError, RequestError};
use tracing::debug;

use super::{ChannelApi, MemberStatus};
use crate::bot::dispatcher::ThrottledBot;
use crate::database::{MediaKind, MediaRef};
use crate::error::ApiError;

/// Channel API on top of the throttled bot.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: ThrottledBot,
}

impl TelegramChannel {
    pub fn new(bot: ThrottledBot) -> Self {
        Self { bot }
    }
}

/// Map teloxide errors onto the core's error taxonomy.
fn map_error(err: RequestError) -> ApiError {
    match err {
        RequestError::RetryAfter(secs) => ApiError::RateLimited {
            retry_after: Some(secs.duration()),
            message: format!("Too Many Requests: retry after {}", secs.seconds()),
        },
        RequestError::Api(TelegramApiError::UserNotFound) => ApiError::NotMember,
        RequestError::Api(api) => {
            let text = api.to_string();
            let lower = text.to_lowercase();
            if lower.contains("participant_id_invalid")
                || lower.contains("member not found")
                || lower.contains("user not found")
            {
                ApiError::NotMember
            } else if lower.contains("too many requests") {
                ApiError::rate_limited(text)
            } else {
                ApiError::Request(text)
            }
        }
        other => ApiError::Request(other.to_string()),
    }
}

fn input_media(item: &MediaRef, caption: Option<&str>) -> InputMedia {
    let file = InputFile::file_id(item.file_id.clone());
    match item.kind {
        MediaKind::Photo => {
            let mut photo = InputMediaPhoto::new(file);
            if let Some(c) = caption {
                photo = photo.caption(c);
            }
            InputMedia::Photo(photo)
        }
        MediaKind::Video => {
            let mut video = InputMediaVideo::new(file);
            if let Some(c) = caption {
                video = video.caption(c);
            }
            InputMedia::Video(video)
        }
    }
}

#[async_trait]
impl ChannelApi for TelegramChannel {
    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &[MediaRef],
        caption: Option<&str>,
    ) -> Result<Vec<MessageId>, ApiError> {
        match media {
            [] => Err(ApiError::Request("empty media batch".to_string())),
            [single] => {
                let file = InputFile::file_id(single.file_id.clone());
                let sent = match single.kind {
                    MediaKind::Photo => {
                        let mut req = self.bot.send_photo(chat_id, file);
                        if let Some(c) = caption {
                            req = req.caption(c);
                        }
                        req.await
                    }
                    MediaKind::Video => {
                        let mut req = self.bot.send_video(chat_id, file);
                        if let Some(c) = caption {
                            req = req.caption(c);
                        }
                        req.await
                    }
                }
                .map_err(map_error)?;
                Ok(vec![sent.id])
            }
            items => {
                let group: Vec<InputMedia> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| input_media(item, if i == 0 { caption } else { None }))
                    .collect();
                let sent = self
                    .bot
                    .send_media_group(chat_id, group)
                    .await
                    .map_err(map_error)?;
                debug!("Sent media group of {} to {}", sent.len(), chat_id);
                Ok(sent.into_iter().map(|m| m.id).collect())
            }
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, ApiError> {
        let mut req = self
            .bot
            .send_message(chat_id, html)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard {
            req = req.reply_markup(markup);
        }
        let sent = req.await.map_err(map_error)?;
        Ok(sent.id)
    }

    async fn member_status(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<MemberStatus, ApiError> {
        let member = self
            .bot
            .get_chat_member(chat_id, user_id)
            .await
            .map_err(map_error)?;

        let status = if member.kind.is_privileged() {
            MemberStatus::Administrator
        } else if member.kind.is_present() {
            MemberStatus::Member
        } else {
            MemberStatus::NotMember
        };
        Ok(status)
    }

    async fn administrators(&self, chat_id: ChatId) -> Result<Vec<UserId>, ApiError> {
        let admins = self
            .bot
            .get_chat_administrators(chat_id)
            .await
            .map_err(map_error)?;
        Ok(admins.into_iter().map(|m| m.user.id).collect())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), ApiError> {
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), ApiError> {
        let mut req = self.bot.answer_callback_query(callback_id);
        if let Some(t) = text {
            req = req.text(t).show_alert(show_alert);
        }
        req.await.map_err(map_error)?;
        Ok(())
    }
}
