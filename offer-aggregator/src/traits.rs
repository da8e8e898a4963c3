use crate::types::{FetchError, OfferRecord};
use async_trait::async_trait;

/// Trait for pulling offers from one external listing source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this source
    fn source_id(&self) -> String;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Endpoint the aggregator passes to `fetch`
    fn endpoint(&self) -> &str;

    /// Fetch and normalize every offer currently listed at `endpoint`.
    /// Malformed cards are dropped; only network-level failures are errors.
    /// The aggregator recomputes countdowns against the cycle instant.
    async fn fetch(&self, endpoint: &str) -> Result<Vec<OfferRecord>, FetchError>;
}
