//! Common shared models.

use serde::{Deserialize, Serialize};
use teloxide::types::User;

/// Identity of the Telegram user who sent something to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Telegram user ID.
    pub user_id: u64,
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without @, original case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Author {
    pub fn new(user_id: u64, first_name: impl Into<String>) -> Self {
        Self {
            user_id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }

    /// Snapshot the identity of a Telegram user.
    pub fn from_telegram(user: &User) -> Self {
        Self {
            user_id: user.id.0,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }

    /// Full display name ("First Last").
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Kind of a stored media reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Reference to media already uploaded to Telegram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    /// Telegram file_id, reusable for re-sending.
    pub file_id: String,
}

impl MediaRef {
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Photo,
            file_id: file_id.into(),
        }
    }

    pub fn video(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            file_id: file_id.into(),
        }
    }
}
