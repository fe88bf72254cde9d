//! Direct posting by administrators.
//!
//! An administrator who is not in an intake flow can send photos or videos
//! to the bot in private and they go straight to the channel. Albums are
//! collected first so they are posted as one media group.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use teloxide::types::{ChatId, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::sender::ReliableBatchSender;
use crate::batch::BatchCollector;
use crate::channel::ChannelApi;
use crate::database::MediaRef;
use crate::i18n::{format_text, get_text};
use crate::intake::IncomingMessage;
use crate::permissions::AdminAuthority;

#[derive(Debug, Clone)]
pub struct DirectSettings {
    pub destination: ChatId,
    pub debounce: Duration,
    pub max_fragments: usize,
    pub max_attempts: u32,
}

struct DirectCore {
    channel: Arc<dyn ChannelApi>,
    sender: ReliableBatchSender,
    destination: ChatId,
    max_attempts: u32,
    shutdown: CancellationToken,
}

pub struct DirectPublisher {
    core: Arc<DirectCore>,
    authority: Arc<AdminAuthority>,
    albums: BatchCollector<IncomingMessage>,
}

impl DirectPublisher {
    pub fn new(
        channel: Arc<dyn ChannelApi>,
        sender: ReliableBatchSender,
        authority: Arc<AdminAuthority>,
        settings: DirectSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let core = Arc::new(DirectCore {
            channel,
            sender,
            destination: settings.destination,
            max_attempts: settings.max_attempts,
            shutdown: shutdown.clone(),
        });

        let handler_core = Arc::clone(&core);
        let albums = BatchCollector::new(
            "direct_posts",
            settings.debounce,
            settings.max_fragments,
            Arc::new(move |_group_id: String, fragments: Vec<IncomingMessage>| {
                let core = Arc::clone(&handler_core);
                async move {
                    core.publish(&fragments).await;
                    Ok::<(), anyhow::Error>(())
                }
                .boxed()
            }),
            shutdown,
        );

        Self {
            core,
            authority,
            albums,
        }
    }

    /// Post media sent by an administrator.
    ///
    /// Returns `false` for messages without media and for non-admins.
    pub async fn handle_message(&self, msg: IncomingMessage) -> anyhow::Result<bool> {
        if !msg.has_media() {
            return Ok(false);
        }

        match self.authority.is_admin(UserId(msg.author.user_id)).await {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(e) => {
                warn!("Admin check failed for {}: {}", msg.author.user_id, e);
                return Ok(false);
            }
        }

        match msg.media_group_id.clone() {
            Some(group) => self.albums.collect(&group, msg.sequence(), msg),
            None => self.core.publish(std::slice::from_ref(&msg)).await,
        }
        Ok(true)
    }
}

impl DirectCore {
    async fn publish(&self, fragments: &[IncomingMessage]) {
        let Some(first) = fragments.first() else {
            return;
        };

        let media: Vec<MediaRef> = fragments
            .iter()
            .filter_map(|f| match (f.best_photo(), &f.video) {
                (Some(photo), _) => Some(MediaRef::photo(photo)),
                (None, Some(video)) => Some(MediaRef::video(video.clone())),
                (None, None) => None,
            })
            .collect();
        if media.is_empty() {
            return;
        }

        let caption = fragments.iter().find_map(|f| f.text());

        let reply = match self
            .sender
            .send(
                self.destination,
                &media,
                caption,
                self.max_attempts,
                &self.shutdown,
            )
            .await
        {
            Ok(ids) => {
                info!(
                    "Admin {} posted {} items to {}",
                    first.author.user_id,
                    ids.len(),
                    self.destination
                );
                format_text("post.published", &[("count", &media.len().to_string())])
            }
            // Already reported by the sender.
            Err(_) => get_text("post.failed"),
        };

        if let Err(e) = self.channel.send_text(first.chat_id, &reply, None).await {
            warn!("Failed to message {}: {}", first.chat_id, e);
        }
    }
}
