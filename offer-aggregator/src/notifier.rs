use crate::snapshot::Snapshot;
use crate::types::{ChatId, FavoriteRecord, OfferRecord};
use std::collections::HashSet;
use tracing::debug;

/// A threshold crossing that has to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Goes to every subscriber.
    Urgent(OfferRecord),
    /// Goes to the one user who favorited the offer.
    Favorite { user_id: ChatId, offer: OfferRecord },
}

impl Notification {
    pub fn offer(&self) -> &OfferRecord {
        match self {
            Notification::Urgent(offer) => offer,
            Notification::Favorite { offer, .. } => offer,
        }
    }
}

/// Counts of state entries added by a warm-start seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub urgent_suppressed: usize,
    pub favorites_suppressed: usize,
}

/// Remembers which offers and favorite pairs were already announced.
/// Both sets only grow: an entry is never removed, so a crossing is
/// reported at most once per process lifetime.
pub struct ThresholdNotifier {
    urgent_threshold_secs: i64,
    favorite_threshold_secs: i64,
    urgent_notified: HashSet<String>,
    favorite_notified: HashSet<(ChatId, String)>,
}

impl ThresholdNotifier {
    pub fn new(urgent_threshold_secs: i64, favorite_threshold_secs: i64) -> Self {
        Self {
            urgent_threshold_secs,
            favorite_threshold_secs,
            urgent_notified: HashSet::new(),
            favorite_notified: HashSet::new(),
        }
    }

    fn is_urgent(&self, offer: &OfferRecord) -> bool {
        offer.remaining_seconds < self.urgent_threshold_secs
    }

    fn is_favorite_due(&self, offer: &OfferRecord) -> bool {
        offer.remaining_seconds < self.favorite_threshold_secs
    }

    /// Evaluate both tiers against the full snapshot and record every
    /// crossing returned.
    pub fn evaluate(&mut self, snapshot: &Snapshot, favorites: &[FavoriteRecord]) -> Vec<Notification> {
        let mut notifications = Vec::new();

        for offer in snapshot.offers() {
            if self.is_urgent(offer) && self.urgent_notified.insert(offer.id.clone()) {
                debug!("Offer {} crossed the urgent threshold ({}s left)", offer.id, offer.remaining_seconds);
                notifications.push(Notification::Urgent(offer.clone()));
            }
        }

        for favorite in favorites {
            let Some(offer) = snapshot.get(&favorite.offer_id) else {
                continue;
            };
            if !self.is_favorite_due(offer) {
                continue;
            }
            if self
                .favorite_notified
                .insert((favorite.user_id, favorite.offer_id.clone()))
            {
                debug!("Favorite {} of user {} crossed the favorite threshold", offer.id, favorite.user_id);
                notifications.push(Notification::Favorite {
                    user_id: favorite.user_id,
                    offer: offer.clone(),
                });
            }
        }

        notifications
    }

    /// Record already-due scraped offers and favorite pairs without
    /// announcing them. Manual offers are never seeded.
    pub fn seed_warm_start(&mut self, snapshot: &Snapshot, favorites: &[FavoriteRecord]) -> SeedSummary {
        SeedSummary {
            urgent_suppressed: self.seed_urgent(snapshot.offers()),
            favorites_suppressed: self.seed_favorites(snapshot, favorites, |_| true),
        }
    }

    /// Silently mark the already-urgent scraped offers among `offers`.
    pub fn seed_urgent<'a>(&mut self, offers: impl IntoIterator<Item = &'a OfferRecord>) -> usize {
        let mut seeded = 0;
        for offer in offers.into_iter().filter(|o| !o.is_manual) {
            if self.is_urgent(offer) && self.urgent_notified.insert(offer.id.clone()) {
                seeded += 1;
            }
        }
        seeded
    }

    /// Silently mark favorite pairs whose scraped offer is already due and
    /// accepted by `include`.
    pub fn seed_favorites(
        &mut self,
        snapshot: &Snapshot,
        favorites: &[FavoriteRecord],
        include: impl Fn(&OfferRecord) -> bool,
    ) -> usize {
        let mut seeded = 0;
        for favorite in favorites {
            let due = snapshot
                .get(&favorite.offer_id)
                .is_some_and(|o| !o.is_manual && include(o) && self.is_favorite_due(o));
            if due
                && self
                    .favorite_notified
                    .insert((favorite.user_id, favorite.offer_id.clone()))
            {
                seeded += 1;
            }
        }
        seeded
    }

    pub fn is_urgent_notified(&self, offer_id: &str) -> bool {
        self.urgent_notified.contains(offer_id)
    }

    pub fn is_favorite_notified(&self, user_id: ChatId, offer_id: &str) -> bool {
        self.favorite_notified.contains(&(user_id, offer_id.to_string()))
    }

    pub fn urgent_notified_count(&self) -> usize {
        self.urgent_notified.len()
    }
}
