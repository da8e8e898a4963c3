pub mod types;
pub mod config;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod manual;
pub mod aggregator;
pub mod snapshot;
pub mod subscribers;
pub mod notifier;
pub mod coordinator;
pub mod delivery;
pub mod store;
pub mod offer_utils;

pub use types::*;
pub use config::TrackerConfig;
pub use traits::SourceAdapter;
pub use fetcher::Fetcher;
pub use parser::{CardSelectors, ListingParser};
pub use sources::{AutachSource, HtmlListingSource};
pub use manual::ManualEntryProvider;
pub use aggregator::{merge_offers, OfferAggregator};
pub use snapshot::{Snapshot, SnapshotCache};
pub use subscribers::SubscriberRegistry;
pub use notifier::{Notification, SeedSummary, ThresholdNotifier};
pub use coordinator::{CycleReport, Phase, PollCoordinator};
pub use delivery::{LogNotifier, TelegramNotifier};
pub use store::PgOfferStore;
