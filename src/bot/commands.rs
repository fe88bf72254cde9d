//! Bot commands.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use super::dispatcher::{AppState, ThrottledBot};
use crate::database::Author;
use crate::i18n::{format_text, get_text};
use crate::utils::html_escape;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show help")]
    Help,

    #[command(description = "Suggest a post for the channel")]
    Suggest,

    #[command(description = "Write to the admins")]
    Feedback,

    #[command(description = "Stop what you started")]
    Cancel,

    #[command(description = "Review pending suggestions (admins)")]
    Review,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;
    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start_command))
        .branch(case![Command::Help].endpoint(help_command))
        .branch(case![Command::Suggest].endpoint(suggest_command))
        .branch(case![Command::Feedback].endpoint(feedback_command))
        .branch(case![Command::Cancel].endpoint(cancel_command))
        .branch(case![Command::Review].endpoint(review_command))
}

fn sender(msg: &Message) -> Option<Author> {
    msg.from.as_ref().map(Author::from_telegram)
}

async fn start_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_default();

    bot.send_message(
        msg.chat.id,
        format_text("start.welcome", &[("name", &html_escape(&name))]),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn help_command(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, get_text("start.help"))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn suggest_command(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(author) = sender(&msg) else {
        return Ok(());
    };
    state.intake.begin_suggestion(&author, msg.chat.id).await
}

async fn feedback_command(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(author) = sender(&msg) else {
        return Ok(());
    };
    state.intake.begin_feedback(&author, msg.chat.id).await
}

async fn cancel_command(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(author) = sender(&msg) else {
        return Ok(());
    };
    state.intake.cancel(&author, msg.chat.id).await
}

async fn review_command(msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    state.review.start(user.id.0, msg.chat.id).await
}
