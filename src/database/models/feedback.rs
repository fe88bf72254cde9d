//! Feedback model.
//!
//! Free-form messages for the admins. No review lifecycle.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::common::Author;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub author: Author,
    /// Text and captions of all fragments, blank-line separated.
    #[serde(default)]
    pub text: String,
    /// Photo file_ids in album order.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Video file_ids in album order.
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_group_id: Option<String>,
    pub origin_chat_id: i64,
    pub origin_message_id: i32,
    /// Unix timestamp.
    pub submitted_at: i64,
}

impl Feedback {
    pub fn new(author: Author, origin_chat_id: i64, origin_message_id: i32) -> Self {
        Self {
            id: ObjectId::new(),
            author,
            text: String::new(),
            photos: Vec::new(),
            videos: Vec::new(),
            media_group_id: None,
            origin_chat_id,
            origin_message_id,
            submitted_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Append one fragment's text.
    pub fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.photos.is_empty() && self.videos.is_empty()
    }
}
