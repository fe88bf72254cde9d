//! Suggested post models.
//!
//! A submission is created pending and decided exactly once by a reviewer.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::common::{Author, MediaRef};

/// Moderation status of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only pending submissions may be decided, and only once.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        self == Self::Pending && next != Self::Pending
    }
}

/// A user-proposed post awaiting moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub author: Author,
    /// Private chat the suggestion came from.
    pub origin_chat_id: i64,
    /// First message of the suggestion.
    pub origin_message_id: i32,
    /// Media in album order.
    pub media: Vec<MediaRef>,
    /// Caption of the first fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub status: SubmissionStatus,
    /// Unix timestamp.
    pub submitted_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<i64>,
}

impl Submission {
    /// Create a new pending submission stamped with the current time.
    pub fn new(
        author: Author,
        origin_chat_id: i64,
        origin_message_id: i32,
        media: Vec<MediaRef>,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            author,
            origin_chat_id,
            origin_message_id,
            media,
            comment,
            status: SubmissionStatus::Pending,
            submitted_at: chrono::Utc::now().timestamp(),
            reviewer_id: None,
            reviewed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_monotonic() {
        use SubmissionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
    }

    #[test]
    fn test_new_submission_is_pending() {
        let s = Submission::new(
            Author::new(7, "Ann"),
            7,
            100,
            vec![MediaRef::photo("a")],
            Some("hi".into()),
        );
        assert!(s.is_pending());
        assert!(s.reviewer_id.is_none());
        assert_eq!(s.status.as_str(), "pending");
    }
}
