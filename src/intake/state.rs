//! Per-user intake state.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cache::{CacheConfig, TypedCache};

/// What the bot expects next from a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserInteractionState {
    #[default]
    Idle,
    AwaitingSuggestion,
    AwaitingFeedback,
}

/// Per-user state slots.
///
/// Each user has their own async mutex, so messages from one user are
/// handled one at a time while different users never contend. Slots expire
/// when idle for a while, which drops the user back to `Idle`.
#[derive(Clone)]
pub struct UserStates {
    slots: TypedCache<u64, Arc<Mutex<UserInteractionState>>>,
}

impl UserStates {
    pub fn new() -> Self {
        Self {
            slots: TypedCache::new("intake_states", CacheConfig::intake_state()),
        }
    }

    /// Slot for a user, created on first use.
    pub fn slot(&self, user_id: u64) -> Arc<Mutex<UserInteractionState>> {
        self.slots
            .get_or_insert_with(user_id, || Arc::new(Mutex::new(UserInteractionState::Idle)))
    }

    /// Slot for a user only if one exists; users never seen are idle.
    pub fn existing(&self, user_id: u64) -> Option<Arc<Mutex<UserInteractionState>>> {
        self.slots.get(&user_id)
    }

    /// Current state, waiting for any in-flight handling of this user.
    pub async fn current(&self, user_id: u64) -> UserInteractionState {
        match self.existing(user_id) {
            Some(slot) => *slot.lock().await,
            None => UserInteractionState::Idle,
        }
    }
}

impl Default for UserStates {
    fn default() -> Self {
        Self::new()
    }
}
