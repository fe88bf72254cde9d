//! Admin checker with a TTL-cached administrator set.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use teloxide::types::{ChatId, UserId};
use tokio::time::Instant;
use tracing::debug;

use crate::channel::ChannelApi;
use crate::error::ApiError;

/// Administrator set as of the last fetch.
struct AdminCache {
    admins: Arc<HashSet<UserId>>,
    fetched_at: Instant,
}

/// Answers "is this user an administrator of the destination".
///
/// The whole admin list is fetched at once and reused for `ttl`. Concurrent
/// refreshes are not serialized; two callers racing past an expired cache
/// may both fetch, and the last write wins.
///
/// Bot owners (from OWNER_IDS) are always administrators.
pub struct AdminAuthority {
    channel: Arc<dyn ChannelApi>,
    chat_id: ChatId,
    ttl: Duration,
    owner_ids: Vec<u64>,
    cache: RwLock<Option<AdminCache>>,
}

impl AdminAuthority {
    pub fn new(
        channel: Arc<dyn ChannelApi>,
        chat_id: ChatId,
        ttl: Duration,
        owner_ids: Vec<u64>,
    ) -> Self {
        Self {
            channel,
            chat_id,
            ttl,
            owner_ids,
            cache: RwLock::new(None),
        }
    }

    /// Check if a user is a bot owner.
    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.0)
    }

    /// Check if a user administers the destination chat.
    ///
    /// A "not a member" response means `false`; any other API failure is
    /// returned to the caller instead of being read as "not admin".
    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, ApiError> {
        if self.is_bot_owner(user_id) {
            return Ok(true);
        }

        if let Some(admins) = self.cached_admins() {
            debug!("Admin cache hit for user {}", user_id);
            return Ok(admins.contains(&user_id));
        }

        debug!("Admin cache miss, fetching administrators of {}", self.chat_id);

        let admins = match self.channel.administrators(self.chat_id).await {
            Ok(list) => list,
            Err(ApiError::NotMember) => return Ok(false),
            Err(e) => return Err(e),
        };

        let admins: Arc<HashSet<UserId>> = Arc::new(admins.into_iter().collect());
        *self.cache.write() = Some(AdminCache {
            admins: Arc::clone(&admins),
            fetched_at: Instant::now(),
        });

        Ok(admins.contains(&user_id))
    }

    fn cached_admins(&self) -> Option<Arc<HashSet<UserId>>> {
        let guard = self.cache.read();
        let cache = guard.as_ref()?;
        if cache.fetched_at.elapsed() < self.ttl {
            Some(Arc::clone(&cache.admins))
        } else {
            None
        }
    }
}
