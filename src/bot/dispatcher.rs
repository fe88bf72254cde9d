//! Message dispatcher setup.
//!
//! Builds the moderation components and routes updates to them.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::commands;
use crate::channel::{ChannelApi, TelegramChannel};
use crate::config::Config;
use crate::database::{Database, FeedbackRepository, SubmissionRepository};
use crate::intake::{IncomingMessage, IntakeSettings, SubmissionIntake};
use crate::permissions::AdminAuthority;
use crate::publish::{DirectPublisher, DirectSettings, ReliableBatchSender, TracingReporter};
use crate::review::{CallbackInput, ReviewDesk, ReviewSettings};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Suggestion and feedback intake.
    pub intake: Arc<SubmissionIntake>,

    /// Admin posts straight to the channel.
    pub direct: Arc<DirectPublisher>,

    /// Review sessions.
    pub review: Arc<ReviewDesk>,
}

impl AppState {
    /// Wire every component against the bot and the database.
    pub fn new(
        bot: ThrottledBot,
        config: &Config,
        db: &Database,
        shutdown: CancellationToken,
    ) -> Self {
        let channel: Arc<dyn ChannelApi> = Arc::new(TelegramChannel::new(bot));
        let submissions = Arc::new(SubmissionRepository::new(db));
        let feedback = Arc::new(FeedbackRepository::new(db));

        let authority = Arc::new(AdminAuthority::new(
            Arc::clone(&channel),
            config.channel_id,
            config.admin_cache_ttl,
            config.owner_ids.clone(),
        ));
        let sender = ReliableBatchSender::new(Arc::clone(&channel), Arc::new(TracingReporter));

        let intake = SubmissionIntake::new(
            Arc::clone(&channel),
            submissions.clone(),
            feedback,
            Arc::clone(&authority),
            IntakeSettings {
                destination: config.channel_id,
                debounce: config.batch_debounce,
                max_fragments: config.batch_max_fragments,
            },
            shutdown.clone(),
        );

        let direct = DirectPublisher::new(
            Arc::clone(&channel),
            sender.clone(),
            Arc::clone(&authority),
            DirectSettings {
                destination: config.channel_id,
                debounce: config.batch_debounce,
                max_fragments: config.batch_max_fragments,
                max_attempts: config.publish_max_attempts,
            },
            shutdown.clone(),
        );

        let review = ReviewDesk::new(
            channel,
            submissions,
            authority,
            sender,
            ReviewSettings {
                destination: config.channel_id,
                batch_size: config.review_batch_size,
                max_attempts: config.publish_max_attempts,
            },
            shutdown,
        );

        Self {
            intake: Arc::new(intake),
            direct: Arc::new(direct),
            review: Arc::new(review),
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    // Only private chats talk to the bot; commands first, then content.
    let message_handler = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(commands::command_handler())
        .branch(dptree::endpoint(private_message_handler));

    let callback_handler = Update::filter_callback_query().endpoint(callback_handler);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

/// Route a non-command private message: intake first, then direct posting.
async fn private_message_handler(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(incoming) = IncomingMessage::from_telegram(&msg) else {
        return Ok(());
    };

    if state.intake.handle_message(incoming.clone()).await? {
        return Ok(());
    }
    if state.direct.handle_message(incoming).await? {
        return Ok(());
    }

    debug!("Ignoring message {} in {}", msg.id.0, msg.chat.id);
    Ok(())
}

/// Route a button press to the review desk.
async fn callback_handler(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let (Some(data), Some(message)) = (q.data.clone(), q.message.as_ref()) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let input = CallbackInput {
        id: q.id.to_string(),
        from: q.from.id.0,
        chat_id: message.chat().id,
        data,
    };

    match state.review.handle_callback(input).await {
        Ok(true) => {}
        Ok(false) => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(e) => {
            error!("Callback from {} failed: {:#}", q.from.id, e);
        }
    }
    Ok(())
}
