//! Bot module - Telegram transport around the moderation core.

mod commands;
pub mod dispatcher;
mod runtime;
mod webhook;

pub use dispatcher::{AppState, ThrottledBot, build_dispatcher};
pub use runtime::run;
