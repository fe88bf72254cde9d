//! Feedback repository. Append-only.

use anyhow::Result;
use async_trait::async_trait;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::Feedback;
use crate::database::store::FeedbackStore;
use crate::database::Database;

#[derive(Clone)]
pub struct FeedbackRepository {
    collection: Collection<Feedback>,
}

impl FeedbackRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("feedback"),
        }
    }
}

#[async_trait]
impl FeedbackStore for FeedbackRepository {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<()> {
        self.collection.insert_one(feedback).await?;
        debug!(
            "Stored feedback {} from user {}",
            feedback.id, feedback.author.user_id
        );
        Ok(())
    }
}
