//! Database module exports.

pub mod models;
mod mongo;
mod repository;
pub mod store;

pub use models::*;
pub use mongo::Database;
pub use repository::{FeedbackRepository, SubmissionRepository};
pub use store::{FeedbackStore, SubmissionStore};
