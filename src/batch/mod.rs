//! Album batching shared by suggestions, feedback and direct posts.

mod collector;

pub use collector::{BatchCollector, FinalizeHandler};
