//! Transport-neutral view of an inbound private message.

use teloxide::types::{ChatId, Message, MessageId};

use crate::database::Author;

/// One size variant of a sent photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// The parts of a message the intake and direct publishing care about.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub author: Author,
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Album id shared by all fragments of one album.
    pub media_group_id: Option<String>,
    /// All sizes Telegram generated for a photo.
    pub photos: Vec<PhotoVariant>,
    pub video: Option<String>,
    /// Body text or media caption.
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Build from a Telegram message. `None` for messages without a sender.
    pub fn from_telegram(msg: &Message) -> Option<Self> {
        let user = msg.from.as_ref()?;

        let photos = msg
            .photo()
            .map(|sizes| {
                sizes
                    .iter()
                    .map(|p| PhotoVariant {
                        file_id: p.file.id.clone(),
                        width: p.width,
                        height: p.height,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            author: Author::from_telegram(user),
            chat_id: msg.chat.id,
            message_id: msg.id,
            media_group_id: msg.media_group_id().map(|g| g.to_string()),
            photos,
            video: msg.video().map(|v| v.file.id.clone()),
            text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        })
    }

    /// Largest variant of the photo, if the message has one.
    pub fn best_photo(&self) -> Option<&str> {
        self.photos
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file_id.as_str())
    }

    /// Non-blank text or caption.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn has_media(&self) -> bool {
        !self.photos.is_empty() || self.video.is_some()
    }

    /// Ordering key of a fragment inside its album.
    pub fn sequence(&self) -> i64 {
        i64::from(self.message_id.0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn text(user_id: u64, message_id: i32, text: &str) -> IncomingMessage {
        IncomingMessage {
            author: Author::new(user_id, format!("User{}", user_id)),
            chat_id: ChatId(user_id as i64),
            message_id: MessageId(message_id),
            media_group_id: None,
            photos: Vec::new(),
            video: None,
            text: Some(text.to_string()),
        }
    }

    pub fn photo(user_id: u64, message_id: i32, file_id: &str) -> IncomingMessage {
        let mut msg = text(user_id, message_id, "");
        msg.text = None;
        msg.photos = vec![
            PhotoVariant {
                file_id: format!("{}-small", file_id),
                width: 90,
                height: 60,
            },
            PhotoVariant {
                file_id: file_id.to_string(),
                width: 1280,
                height: 853,
            },
        ];
        msg
    }

    pub fn in_album(mut msg: IncomingMessage, group: &str) -> IncomingMessage {
        msg.media_group_id = Some(group.to_string());
        msg
    }

    pub fn with_caption(mut msg: IncomingMessage, caption: &str) -> IncomingMessage {
        msg.text = Some(caption.to_string());
        msg
    }
}
