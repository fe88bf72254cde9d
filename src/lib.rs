//! Curator - Telegram channel suggestion box.
//!
//! Users suggest photos for a channel, admins review them in a paginated
//! queue and approved items are published.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models, repositories and store traits
//! - `cache` - Moka-backed ephemeral state
//! - `channel` - Telegram calls behind a trait
//! - `permissions` - Admin checking with caching
//! - `batch` - Album fragment aggregation
//! - `publish` - Rate-limit aware publishing
//! - `intake` - Per-user suggestion/feedback state machine
//! - `review` - Per-admin review sessions
//! - `bot` - Dispatcher, commands, polling/webhook runners

pub mod batch;
pub mod bot;
pub mod cache;
pub mod channel;
pub mod config;
pub mod database;
pub mod error;
pub mod i18n;
pub mod intake;
pub mod permissions;
pub mod publish;
pub mod review;
pub mod utils;

#[cfg(test)]
mod testing;
