//! Cache module - typed wrappers around Moka.
//!
//! Backs the ephemeral per-user and per-admin stores. Nothing cached here
//! survives a restart.

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
