//! Review button payloads.
//!
//! Format: `rv:<action>:<submission id hex>:<index>`, e.g.
//! `rv:a:65f0c0ffee0000000000beef:0`. Well under Telegram's 64 byte limit.

use mongodb::bson::oid::ObjectId;

const PREFIX: &str = "rv";

/// What a review button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    Next,
    Previous,
}

impl ReviewAction {
    fn code(self) -> &'static str {
        match self {
            Self::Approve => "a",
            Self::Reject => "r",
            Self::Next => "n",
            Self::Previous => "p",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::Approve),
            "r" => Some(Self::Reject),
            "n" => Some(Self::Next),
            "p" => Some(Self::Previous),
            _ => None,
        }
    }
}

/// Decoded review button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCallback {
    pub action: ReviewAction,
    /// Submission the card was rendered for.
    pub submission_id: ObjectId,
    /// Position of that submission when the card was rendered.
    pub index: usize,
}

impl ReviewCallback {
    pub fn new(action: ReviewAction, submission_id: ObjectId, index: usize) -> Self {
        Self {
            action,
            submission_id,
            index,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            PREFIX,
            self.action.code(),
            self.submission_id.to_hex(),
            self.index
        )
    }

    /// Parse callback data. `None` if it is not a review button.
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        if parts.next()? != PREFIX {
            return None;
        }
        let action = ReviewAction::from_code(parts.next()?)?;
        let submission_id = ObjectId::parse_str(parts.next()?).ok()?;
        let index = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(action, submission_id, index))
    }
}
