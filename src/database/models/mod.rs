//! Database model exports.

pub mod common;
pub mod feedback;
pub mod submission;

pub use common::{Author, MediaKind, MediaRef};
pub use feedback::Feedback;
pub use submission::{Submission, SubmissionStatus};
