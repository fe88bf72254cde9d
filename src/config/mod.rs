//! Configuration module for Curator.
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use teloxide::types::ChatId;

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

impl FromStr for BotMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "webhook" => Ok(Self::Webhook),
            "polling" => Ok(Self::Polling),
            other => bail!("BOT_MODE must be 'polling' or 'webhook', got '{}'", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Channel suggestions are published to.
    pub channel_id: ChatId,

    /// Owner user IDs (comma-separated).
    /// Owners are administrators everywhere, whatever the channel says.
    pub owner_ids: Vec<u64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    // Moderation tunables
    pub admin_cache_ttl: Duration,
    pub batch_debounce: Duration,
    pub batch_max_fragments: usize,
    pub review_batch_size: u32,
    pub publish_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_mode = match optional("BOT_MODE") {
            Some(raw) => raw.parse()?,
            None => BotMode::default(),
        };

        let webhook_url = optional("WEBHOOK_URL");
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            bail!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let owner_ids = optional("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u64>()
                    .with_context(|| format!("OWNER_IDS contains an invalid user id '{}'", s))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            bot_mode,
            webhook_url,
            webhook_port: parsed("WEBHOOK_PORT", 8443)?,
            webhook_secret: optional("WEBHOOK_SECRET"),
            channel_id: ChatId(
                required("CHANNEL_ID")?
                    .parse()
                    .context("CHANNEL_ID must be a numeric chat id")?,
            ),
            owner_ids,
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: optional("MONGODB_DATABASE")
                .unwrap_or_else(|| "curator".to_string()),
            admin_cache_ttl: Duration::from_secs(parsed("ADMIN_CACHE_TTL_SECS", 300)?),
            batch_debounce: Duration::from_millis(parsed("BATCH_DEBOUNCE_MS", 2500)?),
            batch_max_fragments: parsed("BATCH_MAX_FRAGMENTS", 10)?,
            review_batch_size: parsed("REVIEW_BATCH_SIZE", 20)?,
            publish_max_attempts: parsed("PUBLISH_MAX_ATTEMPTS", 5)?,
        })
    }
}

/// Non-empty variable or `None`.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{} must be set", key))
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
