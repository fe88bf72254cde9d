//! Publishing media to the destination channel.

mod direct;
mod reporter;
mod sender;

pub use direct::{DirectPublisher, DirectSettings};
pub use reporter::{FailureReporter, TracingReporter};
pub use sender::ReliableBatchSender;
