use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

use crate::defs::ChatId;
use crate::defs::DeliveryError;
use crate::defs::FavoriteRecord;
use crate::defs::ManualEntryRecord;
use crate::defs::OfferNotifier;
use crate::defs::OfferRecord;
use crate::defs::OfferStore;
use crate::defs::StoreError;

/// Store backed by plain vectors. Can be switched into an outage state.
#[derive(Default)]
pub struct MemoryStore {
    manual_entries: Mutex<Vec<ManualEntryRecord>>,
    favorites: Mutex<Vec<FavoriteRecord>>,
    unavailable: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_manual_entry(&self, entry: ManualEntryRecord) {
        self.manual_entries.lock().push(entry);
    }

    pub fn add_favorite(&self, user_id: ChatId, offer_id: &str) {
        let favorite = FavoriteRecord {
            user_id,
            offer_id: offer_id.to_owned(),
        };
        let mut favorites = self.favorites.lock();
        if !favorites.contains(&favorite) {
            favorites.push(favorite);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.lock() {
            return Err(StoreError::Unavailable("memory store switched off".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl OfferStore for MemoryStore {
    async fn load_active_manual_entries(&self) -> Result<Vec<ManualEntryRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .manual_entries
            .lock()
            .iter()
            .filter(|entry| entry.is_active)
            .cloned()
            .collect())
    }

    async fn load_favorites(&self) -> Result<Vec<FavoriteRecord>, StoreError> {
        self.check_available()?;
        Ok(self.favorites.lock().clone())
    }
}

/// A delivery that went through a `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub chat_id: ChatId,
    pub offer_id: String,
}

/// Notifier that keeps every delivery in memory instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
    failing_chats: Mutex<HashSet<ChatId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries to `chat_id` fail from now on.
    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing_chats.lock().insert(chat_id);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn deliveries_for(&self, offer_id: &str) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.offer_id == offer_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.deliveries.lock().clear();
    }
}

#[async_trait]
impl OfferNotifier for RecordingNotifier {
    async fn notify_one(&self, chat_id: ChatId, offer: &OfferRecord) -> Result<(), DeliveryError> {
        if self.failing_chats.lock().contains(&chat_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "bot was blocked by the user".to_owned(),
            });
        }
        self.deliveries.lock().push(Delivery {
            chat_id,
            offer_id: offer.id.clone(),
        });
        Ok(())
    }
}
