use serde::{Deserialize, Serialize};
use std::collections::HashMap;
// Use the interfaces crate for the shared records and collaborator traits
pub use interfaces::defs::{ChatId, FavoriteRecord, ManualEntryRecord, OfferRecord, UNKNOWN_REMAINING_SECONDS};
pub use interfaces::defs::{DeliveryError, OfferNotifier, OfferStore, StoreError};

/// Prefix of manual offer ids, keeps them apart from scraped ids.
pub const MANUAL_ID_PREFIX: &str = "manual_";

/// Source label carried by operator-authored offers.
pub const MANUAL_SOURCE_LABEL: &str = "Manager";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_page_bytes: usize,
    pub max_redirects: usize,
    pub min_host_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            timeout_seconds: 15,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_page_bytes: 10 * 1024 * 1024,
            max_redirects: 5,
            min_host_interval_ms: 1000,
        }
    }
}

/// Cards extracted from one listing page.
#[derive(Debug, Default)]
pub struct ParsedListing {
    pub offers: Vec<OfferRecord>,
    pub skipped: usize,
}

/// Result of one fan-out over every configured source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateOutcome {
    pub offers: Vec<OfferRecord>,
    pub failed_sources: Vec<String>,
    /// Ids each successful source returned this cycle, keyed by source id.
    pub source_offer_ids: HashMap<String, Vec<String>>,
    pub source_count: usize,
    pub duplicates_dropped: usize,
}

impl AggregateOutcome {
    /// Every configured source failed, so the merge carries no scraped data.
    pub fn all_sources_failed(&self) -> bool {
        self.source_count > 0 && self.failed_sources.len() == self.source_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("page larger than {limit_bytes} bytes")]
    BodyTooLarge { limit_bytes: usize },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
