use crate::aggregator::OfferAggregator;
use crate::notifier::{Notification, SeedSummary, ThresholdNotifier};
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::subscribers::SubscriberRegistry;
use crate::types::{ChatId, FavoriteRecord, OfferNotifier, OfferRecord, OfferStore};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Warm-start state machine of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No cycle has succeeded yet; the next one seeds state silently.
    WarmingUp,
    /// Crossings are delivered.
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Another cycle was still running.
    Skipped,
    /// Every source failed; the previous snapshot stays in place.
    Failed { failed_sources: Vec<String> },
    /// First successful cycle: snapshot and state seeded, nothing sent.
    /// `favorites_deferred` is set when the store could not be read.
    WarmStart {
        offers: usize,
        seed: SeedSummary,
        favorites_deferred: bool,
    },
    Steady {
        offers: usize,
        urgent_sent: usize,
        favorite_sent: usize,
        delivery_failures: usize,
    },
}

/// Seeding still owed after a warm start that could not see everything.
#[derive(Debug, Default)]
struct PendingSeed {
    favorites: bool,
    // Sources that failed during the warm start.
    sources: HashSet<String>,
}

#[derive(Debug, Default)]
struct DeliveryTally {
    urgent: usize,
    favorite: usize,
    // Failed recipients, not failed notifications.
    failures: usize,
}

/// Drives fetch -> merge -> snapshot -> thresholds on a fixed interval.
/// Owns every piece of mutable tracker state.
pub struct PollCoordinator {
    aggregator: OfferAggregator,
    store: Arc<dyn OfferStore>,
    delivery: Arc<dyn OfferNotifier>,
    snapshot: SnapshotCache,
    subscribers: Arc<SubscriberRegistry>,
    notifier: Mutex<ThresholdNotifier>,
    phase: parking_lot::Mutex<Phase>,
    pending: parking_lot::Mutex<PendingSeed>,
    cycle_guard: Mutex<()>,
}

impl PollCoordinator {
    pub fn new(
        aggregator: OfferAggregator,
        store: Arc<dyn OfferStore>,
        delivery: Arc<dyn OfferNotifier>,
        subscribers: Arc<SubscriberRegistry>,
        notifier: ThresholdNotifier,
    ) -> Self {
        Self {
            aggregator,
            store,
            delivery,
            snapshot: SnapshotCache::new(),
            subscribers,
            notifier: Mutex::new(notifier),
            phase: parking_lot::Mutex::new(Phase::WarmingUp),
            pending: parking_lot::Mutex::new(PendingSeed::default()),
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.current()
    }

    pub fn offers(&self) -> Vec<OfferRecord> {
        self.snapshot.offers()
    }

    pub fn lookup(&self, id: &str) -> Option<OfferRecord> {
        self.snapshot.lookup(id)
    }

    pub fn register_subscriber(&self, chat_id: ChatId) -> bool {
        self.subscribers.register(chat_id)
    }

    pub async fn is_urgent_notified(&self, offer_id: &str) -> bool {
        self.notifier.lock().await.is_urgent_notified(offer_id)
    }

    pub async fn is_favorite_notified(&self, user_id: ChatId, offer_id: &str) -> bool {
        self.notifier.lock().await.is_favorite_notified(user_id, offer_id)
    }

    /// Run one cycle now, unless one is already in flight.
    pub async fn refresh_now(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleReport {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            info!("Poll cycle already running, skipping");
            return CycleReport::Skipped;
        };

        let cycle_id = Uuid::new_v4();
        let span = info_span!("poll_cycle", %cycle_id, phase = ?self.phase());
        self.cycle(cycle_id, now).instrument(span).await
    }

    async fn cycle(&self, cycle_id: Uuid, now: DateTime<Utc>) -> CycleReport {
        let outcome = self.aggregator.aggregate(now).await;

        if outcome.all_sources_failed() {
            warn!(
                "All {} sources failed, keeping previous snapshot of {} offers",
                outcome.source_count,
                self.snapshot.len()
            );
            return CycleReport::Failed {
                failed_sources: outcome.failed_sources,
            };
        }

        let snapshot = self.snapshot.replace(Snapshot::new(cycle_id, now, outcome.offers));
        let favorites = self.load_favorites().await;

        let phase = self.phase();
        match phase {
            Phase::WarmingUp => {
                let mut notifier = self.notifier.lock().await;
                let seed = SeedSummary {
                    urgent_suppressed: notifier.seed_urgent(snapshot.offers()),
                    favorites_suppressed: favorites
                        .as_deref()
                        .map_or(0, |favorites| notifier.seed_favorites(&snapshot, favorites, |_| true)),
                };
                drop(notifier);

                let favorites_deferred = favorites.is_none();
                *self.pending.lock() = PendingSeed {
                    favorites: favorites_deferred,
                    sources: outcome.failed_sources.into_iter().collect(),
                };
                *self.phase.lock() = Phase::Steady;
                info!(
                    "Warm start with {} offers ({} urgent and {} favorite crossings suppressed)",
                    snapshot.len(),
                    seed.urgent_suppressed,
                    seed.favorites_suppressed
                );
                CycleReport::WarmStart {
                    offers: snapshot.len(),
                    seed,
                    favorites_deferred,
                }
            }
            Phase::Steady => {
                let mut notifier = self.notifier.lock().await;
                self.settle_pending_seed(&mut notifier, &snapshot, &outcome.source_offer_ids, favorites.as_deref());
                let notifications = notifier.evaluate(&snapshot, favorites.as_deref().unwrap_or_default());
                drop(notifier);

                let tally = self.deliver(&notifications).await;
                info!(
                    "Cycle finished with {} offers, {} urgent and {} favorite notifications",
                    snapshot.len(),
                    tally.urgent,
                    tally.favorite
                );
                CycleReport::Steady {
                    offers: snapshot.len(),
                    urgent_sent: tally.urgent,
                    favorite_sent: tally.favorite,
                    delivery_failures: tally.failures,
                }
            }
        }
    }

    /// Seed what the warm start could not see: the first batch of a source
    /// that failed back then, and favorites once the store answers again.
    fn settle_pending_seed(
        &self,
        notifier: &mut ThresholdNotifier,
        snapshot: &Snapshot,
        source_offer_ids: &HashMap<String, Vec<String>>,
        favorites: Option<&[FavoriteRecord]>,
    ) {
        let mut pending = self.pending.lock();

        let recovered: Vec<String> = pending
            .sources
            .iter()
            .filter(|source_id| source_offer_ids.contains_key(*source_id))
            .cloned()
            .collect();
        for source_id in recovered {
            pending.sources.remove(&source_id);
            let ids: HashSet<&str> = source_offer_ids[&source_id].iter().map(String::as_str).collect();
            let urgent = notifier.seed_urgent(ids.iter().filter_map(|id| snapshot.get(id)));
            let favorite = match favorites {
                Some(favorites) => notifier.seed_favorites(snapshot, favorites, |offer| ids.contains(offer.id.as_str())),
                None => {
                    pending.favorites = true;
                    0
                }
            };
            info!(
                "Source {} recovered after warm start ({} urgent and {} favorite crossings suppressed)",
                source_id, urgent, favorite
            );
        }

        if pending.favorites {
            if let Some(favorites) = favorites {
                let seeded = notifier.seed_favorites(snapshot, favorites, |_| true);
                pending.favorites = false;
                info!("Favorites readable again, {} crossings suppressed", seeded);
            }
        }
    }

    /// `None` when the store is unavailable this cycle.
    async fn load_favorites(&self) -> Option<Vec<FavoriteRecord>> {
        match self.store.load_favorites().await {
            Ok(favorites) => Some(favorites),
            Err(e) => {
                warn!("Favorites unavailable this cycle: {}", e);
                None
            }
        }
    }

    async fn deliver(&self, notifications: &[Notification]) -> DeliveryTally {
        let mut tally = DeliveryTally::default();

        for notification in notifications {
            match notification {
                Notification::Urgent(offer) => {
                    tally.urgent += 1;
                    let subscribers = self.subscribers.list();
                    info!("Urgent offer {} to {} subscribers", offer.id, subscribers.len());
                    for (chat_id, e) in self.delivery.notify_all(&subscribers, offer).await {
                        warn!("Failed to send offer {} to {}: {}", offer.id, chat_id, e);
                        tally.failures += 1;
                    }
                }
                Notification::Favorite { user_id, offer } => {
                    tally.favorite += 1;
                    info!("Favorite offer {} to user {}", offer.id, user_id);
                    if let Err(e) = self.delivery.notify_one(*user_id, offer).await {
                        warn!("Failed to send favorite {} to {}: {}", offer.id, user_id, e);
                        tally.failures += 1;
                    }
                }
            }
        }

        tally
    }

    /// Warm start immediately, then one cycle per `interval`, forever.
    pub async fn run(&self, interval: Duration) {
        info!(
            "Poll coordinator starting with {} sources, interval {:?}",
            self.aggregator.source_count(),
            interval
        );
        self.refresh_now().await;

        loop {
            tokio::time::sleep(interval).await;
            self.refresh_now().await;
        }
    }

    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(interval).await })
    }
}
