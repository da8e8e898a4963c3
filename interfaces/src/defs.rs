use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat (and user) identifier of the delivery channel.
pub type ChatId = i64;

/// Countdown assigned to offers whose end time is unknown or unparseable.
/// Sorts after every real countdown and never crosses a threshold.
pub const UNKNOWN_REMAINING_SECONDS: i64 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub id: String,
    pub title: String,
    pub year: String,
    pub mileage: String,
    pub auction_end: Option<DateTime<Utc>>,
    pub remaining_seconds: i64,
    pub source_label: String,
    pub image_url: String,
    pub detail_url: String,
    pub is_manual: bool,
}

impl OfferRecord {
    /// Countdown from `now` to `auction_end`, clamped at zero.
    pub fn remaining_from(auction_end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
        match auction_end {
            Some(end) => (end - now).num_seconds().max(0),
            None => UNKNOWN_REMAINING_SECONDS,
        }
    }

    pub fn has_known_end(&self) -> bool {
        self.auction_end.is_some()
    }
}

/// Operator-authored listing as kept by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntryRecord {
    pub id: i64,
    pub title: String,
    pub year: String,
    pub mileage: String,
    pub fuel: String,
    pub engine: String,
    pub transmission: String,
    pub price: String,
    pub auction_end: DateTime<Utc>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub added_by: ChatId,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: ChatId,
    pub offer_id: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery rejected ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("delivery transport error: {0}")]
    Transport(String),
}

// Object style note:
// The store and the notifier are owned by other subsystems (the chat front
// end, the database). This crate only describes the narrow surface the
// tracker needs from them, so the tracker can be exercised against the
// in-memory implementations in `memory`.

/// Read side of the persistence layer holding manual entries and favorites.
#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn load_active_manual_entries(&self) -> Result<Vec<ManualEntryRecord>, StoreError>;

    async fn load_favorites(&self) -> Result<Vec<FavoriteRecord>, StoreError>;
}

/// Outbound delivery of offer notifications.
#[async_trait]
pub trait OfferNotifier: Send + Sync {
    async fn notify_one(&self, chat_id: ChatId, offer: &OfferRecord) -> Result<(), DeliveryError>;

    /// Attempts every recipient and returns the ones that failed.
    async fn notify_all(&self, subscribers: &[ChatId], offer: &OfferRecord) -> Vec<(ChatId, DeliveryError)> {
        let mut failures = Vec::new();
        for &chat_id in subscribers {
            if let Err(e) = self.notify_one(chat_id, offer).await {
                failures.push((chat_id, e));
            }
        }
        failures
    }
}
