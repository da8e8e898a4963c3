use crate::manual::ManualEntryProvider;
use crate::traits::SourceAdapter;
use crate::types::{AggregateOutcome, FetchError, OfferRecord};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fans out to every source and folds the results into one sorted list.
pub struct OfferAggregator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    manual: ManualEntryProvider,
    fetch_timeout: Duration,
}

impl OfferAggregator {
    /// `sources` are in priority order: on duplicate ids the earlier one wins.
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, manual: ManualEntryProvider, fetch_timeout: Duration) -> Self {
        Self {
            sources,
            manual,
            fetch_timeout,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub async fn aggregate(&self, now: DateTime<Utc>) -> AggregateOutcome {
        let fetches = self.sources.iter().map(|source| {
            let source = source.clone();
            let timeout = self.fetch_timeout;
            async move {
                let endpoint = source.endpoint().to_string();
                let result = match tokio::time::timeout(timeout, source.fetch(&endpoint)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout),
                };
                (source, result)
            }
        });

        // join_all keeps the input order, which is the priority order.
        let results = join_all(fetches).await;

        let mut batches = Vec::with_capacity(results.len());
        let mut failed_sources = Vec::new();
        let mut source_offer_ids = HashMap::new();
        for (source, result) in results {
            match result {
                Ok(mut offers) => {
                    debug!("Source {} returned {} offers", source.source_id(), offers.len());
                    // Countdowns are relative to the cycle instant, not to the fetch.
                    for offer in &mut offers {
                        offer.remaining_seconds = OfferRecord::remaining_from(offer.auction_end, now);
                    }
                    source_offer_ids.insert(source.source_id(), offers.iter().map(|o| o.id.clone()).collect());
                    batches.push(offers);
                }
                Err(e) => {
                    warn!("Source {} failed this cycle: {}", source.source_name(), e);
                    failed_sources.push(source.source_id());
                }
            }
        }

        let manual = self.manual.load(now).await;
        let (offers, duplicates_dropped) = merge_offers(batches, manual);

        info!(
            "Merged {} offers from {}/{} sources ({} duplicates dropped)",
            offers.len(),
            self.sources.len() - failed_sources.len(),
            self.sources.len(),
            duplicates_dropped
        );

        AggregateOutcome {
            offers,
            failed_sources,
            source_offer_ids,
            source_count: self.sources.len(),
            duplicates_dropped,
        }
    }
}

/// Merge source batches (priority order) followed by manual offers.
/// First occurrence of an id wins, finished manual auctions are dropped,
/// and the result is stably sorted by countdown, most urgent first.
/// Returns the merged list and the number of duplicates dropped.
pub fn merge_offers(batches: Vec<Vec<OfferRecord>>, manual: Vec<OfferRecord>) -> (Vec<OfferRecord>, usize) {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut duplicates_dropped = 0;

    let manual = manual.into_iter().filter(|offer| offer.remaining_seconds > 0);

    for offer in batches.into_iter().flatten().chain(manual) {
        if seen.insert(offer.id.clone()) {
            merged.push(offer);
        } else {
            debug!("Dropping duplicate offer {} from {}", offer.id, offer.source_label);
            duplicates_dropped += 1;
        }
    }

    merged.sort_by_key(|offer| offer.remaining_seconds);
    (merged, duplicates_dropped)
}
