//! One administrator's walk through the pending queue.

use teloxide::types::{ChatId, MessageId};

use super::callback::ReviewCallback;
use crate::database::Submission;

/// Snapshot of pending submissions taken when the session started.
///
/// `current_index` always points into `items` while the session is alive;
/// an empty session is torn down by the caller.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub admin_id: u64,
    pub review_chat: ChatId,
    pub items: Vec<Submission>,
    pub current_index: usize,
    /// Media and card messages of the item on screen.
    pub display_messages: Vec<MessageId>,
}

impl ReviewSession {
    pub fn new(admin_id: u64, review_chat: ChatId, items: Vec<Submission>) -> Self {
        Self {
            admin_id,
            review_chat,
            items,
            current_index: 0,
            display_messages: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&Submission> {
        self.items.get(self.current_index)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.items.len()
    }

    /// Whether a button still refers to the item at its encoded index.
    pub fn matches(&self, callback: &ReviewCallback) -> bool {
        self.items
            .get(callback.index)
            .is_some_and(|s| s.id == callback.submission_id)
    }

    /// Drop the item at `index`. The item after it takes its place.
    pub fn remove(&mut self, index: usize) -> Option<Submission> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.current_index = index.min(self.items.len().saturating_sub(1));
        Some(removed)
    }

    /// Move by `delta` within bounds. Returns `false` if the index did not change.
    pub fn step(&mut self, delta: isize) -> bool {
        let Some(last) = self.items.len().checked_sub(1) else {
            return false;
        };
        let target = self.current_index.saturating_add_signed(delta).min(last);
        let moved = target != self.current_index;
        self.current_index = target;
        moved
    }

    pub fn take_display(&mut self) -> Vec<MessageId> {
        std::mem::take(&mut self.display_messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Author, MediaRef};
    use crate::review::callback::ReviewAction;

    fn session(n: usize) -> ReviewSession {
        let items = (0..n)
            .map(|i| {
                Submission::new(
                    Author::new(i as u64, "u"),
                    1,
                    i as i32,
                    vec![MediaRef::photo("p")],
                    None,
                )
            })
            .collect();
        ReviewSession::new(1, ChatId(1), items)
    }

    #[test]
    fn test_step_is_clamped() {
        let mut s = session(3);
        assert!(!s.step(-1));
        assert!(s.step(1));
        assert!(s.step(1));
        assert!(s.is_last());
        assert!(!s.step(1));
        assert_eq!(s.current_index, 2);
    }

    #[test]
    fn test_remove_keeps_index_valid() {
        let mut s = session(3);
        let second = s.items[1].id;
        s.remove(0);
        assert_eq!(s.current().map(|i| i.id), Some(second));

        s.current_index = 1;
        s.remove(1);
        assert_eq!(s.current_index, 0);

        s.remove(0);
        assert!(s.is_empty());
        assert!(s.current().is_none());
    }

    #[test]
    fn test_matches() {
        let s = session(2);
        let id = s.items[1].id;
        assert!(s.matches(&ReviewCallback::new(ReviewAction::Approve, id, 1)));
        assert!(!s.matches(&ReviewCallback::new(ReviewAction::Approve, id, 0)));
        assert!(!s.matches(&ReviewCallback::new(ReviewAction::Approve, id, 5)));
    }
}
