//! Curator binary.

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use curator::bot::{self, AppState};
use curator::config::Config;
use curator::database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("curator=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Curator bot...");

    let config = Config::from_env()?;
    info!("Configuration loaded, mode: {:?}", config.bot_mode);
    info!("Destination channel: {}", config.channel_id);

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;
    info!("Database connected");

    // Throttle keeps us under Telegram's global and per-chat limits.
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let shutdown = CancellationToken::new();
    let state = AppState::new(bot.clone(), &config, &db, shutdown.clone());
    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    let result = bot::run(&config, bot, dispatcher).await;

    // Drops albums still inside their debounce window.
    shutdown.cancel();
    info!("Shutting down");
    result
}
