//! Repository module - MongoDB implementations of the store traits.

mod feedback_repository;
mod submission_repository;

pub use feedback_repository::FeedbackRepository;
pub use submission_repository::SubmissionRepository;
