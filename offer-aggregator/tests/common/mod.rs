#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use interfaces::memory::{MemoryStore, RecordingNotifier};
use offer_aggregator::{
    FetchError, ManualEntryProvider, ManualEntryRecord, OfferAggregator, OfferRecord, PollCoordinator, SourceAdapter,
    SubscriberRegistry, ThresholdNotifier, TrackerConfig, UNKNOWN_REMAINING_SECONDS,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap()
}

/// Scraped offer whose countdown is `remaining` at `base_time()`.
pub fn offer(id: &str, remaining: i64, source_label: &str) -> OfferRecord {
    let auction_end = if remaining == UNKNOWN_REMAINING_SECONDS {
        None
    } else {
        Some(base_time() + ChronoDuration::seconds(remaining))
    };
    OfferRecord {
        id: id.to_string(),
        title: format!("Car {}", id),
        year: "2019".to_string(),
        mileage: "120000 km".to_string(),
        auction_end,
        remaining_seconds: remaining,
        source_label: source_label.to_string(),
        image_url: format!("https://img.example.com/{}.jpg", id),
        detail_url: format!("https://{}.example.com/offers/{}", source_label.to_lowercase(), id),
        is_manual: false,
    }
}

/// Active manual entry ending `remaining` seconds after `base_time()`.
pub fn manual_entry(id: i64, remaining: i64) -> ManualEntryRecord {
    ManualEntryRecord {
        id,
        title: format!("Manual car {}", id),
        year: "2021".to_string(),
        mileage: "15000".to_string(),
        fuel: "Diesel".to_string(),
        engine: "2.0".to_string(),
        transmission: "Automatic".to_string(),
        price: "25000 EUR".to_string(),
        auction_end: base_time() + ChronoDuration::seconds(remaining),
        image_url: None,
        url: None,
        added_by: 1,
        is_active: true,
    }
}

/// Source adapter returning whatever the test last configured.
pub struct StaticSource {
    id: String,
    endpoint: String,
    response: Mutex<Result<Vec<OfferRecord>, FetchError>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(id: &str, offers: Vec<OfferRecord>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            endpoint: format!("https://{}.example.com/offers", id),
            response: Mutex::new(Ok(offers)),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(id: &str, error: FetchError) -> Arc<Self> {
        let source = Self::new(id, Vec::new());
        source.fail_with(error);
        source
    }

    pub fn set_offers(&self, offers: Vec<OfferRecord>) {
        *self.response.lock() = Ok(offers);
    }

    pub fn fail_with(&self, error: FetchError) {
        *self.response.lock() = Err(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn source_id(&self) -> String {
        self.id.clone()
    }

    fn source_name(&self) -> String {
        format!("Static {}", self.id)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, _endpoint: &str) -> Result<Vec<OfferRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().clone()
    }
}

pub fn as_sources(sources: &[Arc<StaticSource>]) -> Vec<Arc<dyn SourceAdapter>> {
    sources
        .iter()
        .map(|s| s.clone() as Arc<dyn SourceAdapter>)
        .collect()
}

pub fn aggregator(sources: &[Arc<StaticSource>], store: Arc<MemoryStore>) -> OfferAggregator {
    let config = TrackerConfig::default();
    OfferAggregator::new(as_sources(sources), ManualEntryProvider::new(store), config.fetch_timeout())
}

/// Coordinator wired to in-memory collaborators with default thresholds.
pub struct Harness {
    pub coordinator: Arc<PollCoordinator>,
    pub store: Arc<MemoryStore>,
    pub delivery: Arc<RecordingNotifier>,
    pub subscribers: Arc<SubscriberRegistry>,
}

pub fn harness(sources: &[Arc<StaticSource>], subscribers: &[i64]) -> Harness {
    let config = TrackerConfig::default();
    let store = Arc::new(MemoryStore::new());
    let delivery = Arc::new(RecordingNotifier::new());
    let subscribers = Arc::new(SubscriberRegistry::with_subscribers(subscribers.iter().copied()));
    let notifier = ThresholdNotifier::new(config.urgent_threshold_secs, config.favorite_threshold_secs);
    let coordinator = Arc::new(PollCoordinator::new(
        aggregator(sources, store.clone()),
        store.clone(),
        delivery.clone(),
        subscribers.clone(),
        notifier,
    ));
    Harness {
        coordinator,
        store,
        delivery,
        subscribers,
    }
}
