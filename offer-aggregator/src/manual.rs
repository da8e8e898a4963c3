use crate::types::{ManualEntryRecord, OfferRecord, OfferStore, MANUAL_ID_PREFIX, MANUAL_SOURCE_LABEL};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns operator-authored store entries into offer records.
pub struct ManualEntryProvider {
    store: Arc<dyn OfferStore>,
}

impl ManualEntryProvider {
    pub fn new(store: Arc<dyn OfferStore>) -> Self {
        Self { store }
    }

    /// Active entries with countdowns computed against `now`. A store
    /// outage yields no entries for this cycle.
    pub async fn load(&self, now: DateTime<Utc>) -> Vec<OfferRecord> {
        match self.store.load_active_manual_entries().await {
            Ok(entries) => {
                debug!("Loaded {} manual entries", entries.len());
                entries
                    .iter()
                    .filter(|entry| entry.is_active)
                    .map(|entry| to_offer(entry, now))
                    .collect()
            }
            Err(e) => {
                warn!("Manual entries unavailable this cycle: {}", e);
                Vec::new()
            }
        }
    }
}

pub fn manual_offer_id(entry_id: i64) -> String {
    format!("{}{}", MANUAL_ID_PREFIX, entry_id)
}

pub fn to_offer(entry: &ManualEntryRecord, now: DateTime<Utc>) -> OfferRecord {
    OfferRecord {
        id: manual_offer_id(entry.id),
        title: entry.title.clone(),
        year: entry.year.clone(),
        mileage: entry.mileage.clone(),
        auction_end: Some(entry.auction_end),
        remaining_seconds: OfferRecord::remaining_from(Some(entry.auction_end), now),
        source_label: MANUAL_SOURCE_LABEL.to_string(),
        image_url: entry.image_url.clone().unwrap_or_default(),
        detail_url: entry.url.clone().unwrap_or_default(),
        is_manual: true,
    }
}
