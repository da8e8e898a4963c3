use crate::types::ChatId;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::info;

/// Append-only set of chats receiving urgent notifications.
#[derive(Default)]
pub struct SubscriberRegistry {
    chats: RwLock<HashSet<ChatId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(chats: impl IntoIterator<Item = ChatId>) -> Self {
        Self {
            chats: RwLock::new(chats.into_iter().collect()),
        }
    }

    /// Returns false when the chat was already registered.
    pub fn register(&self, chat_id: ChatId) -> bool {
        let added = self.chats.write().insert(chat_id);
        if added {
            info!("Registered subscriber {}", chat_id);
        }
        added
    }

    pub fn list(&self) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self.chats.read().iter().copied().collect();
        chats.sort_unstable();
        chats
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.chats.read().contains(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.chats.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.read().is_empty()
    }
}
