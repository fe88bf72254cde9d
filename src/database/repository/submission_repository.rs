//! Submission repository.
//!
//! No cache: the review queue must see other admins' decisions immediately.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::{Submission, SubmissionStatus};
use crate::database::store::SubmissionStore;
use crate::database::Database;

/// Repository for suggested posts.
#[derive(Clone)]
pub struct SubmissionRepository {
    collection: Collection<Submission>,
}

impl SubmissionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("submissions"),
        }
    }
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn create_submission(&self, submission: &Submission) -> Result<()> {
        self.collection.insert_one(submission).await?;
        debug!(
            "Stored submission {} from user {} ({} media)",
            submission.id,
            submission.author.user_id,
            submission.media.len()
        );
        Ok(())
    }

    async fn list_pending(&self, limit: u32, offset: u64) -> Result<Vec<Submission>> {
        let filter = doc! { "status": SubmissionStatus::Pending.as_str() };
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "submitted_at": 1, "_id": 1 })
            .skip(offset)
            .limit(i64::from(limit))
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn get_submission(&self, id: ObjectId) -> Result<Option<Submission>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn update_status(
        &self,
        id: ObjectId,
        status: SubmissionStatus,
        reviewer_id: u64,
    ) -> Result<bool> {
        if !SubmissionStatus::Pending.can_transition_to(status) {
            anyhow::bail!("invalid status transition to {}", status.as_str());
        }

        // Conditional on pending so a decision is never overwritten.
        let filter = doc! {
            "_id": id,
            "status": SubmissionStatus::Pending.as_str(),
        };
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "reviewer_id": reviewer_id as i64,
                "reviewed_at": chrono::Utc::now().timestamp(),
            }
        };

        let result = self.collection.update_one(filter, update).await?;
        debug!(
            "Submission {} -> {} by {} (matched: {})",
            id,
            status.as_str(),
            reviewer_id,
            result.matched_count
        );

        Ok(result.modified_count == 1)
    }

    async fn delete_submission(&self, id: ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
