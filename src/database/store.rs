//! Persistence contracts used by intake and review.
//!
//! The MongoDB repositories implement these; tests swap in memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::models::{Feedback, Submission, SubmissionStatus};

/// Storage for suggested posts.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new submission.
    async fn create_submission(&self, submission: &Submission) -> Result<()>;

    /// Pending submissions, oldest submitted first.
    async fn list_pending(&self, limit: u32, offset: u64) -> Result<Vec<Submission>>;

    /// Fetch a submission by id.
    async fn get_submission(&self, id: ObjectId) -> Result<Option<Submission>>;

    /// Decide a pending submission.
    ///
    /// Returns `false` when the submission is missing or was already decided;
    /// a decided submission is never changed again.
    async fn update_status(
        &self,
        id: ObjectId,
        status: SubmissionStatus,
        reviewer_id: u64,
    ) -> Result<bool>;

    /// Remove a submission. Returns `true` if something was deleted.
    async fn delete_submission(&self, id: ObjectId) -> Result<bool>;
}

/// Storage for user feedback.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<()>;
}
