use crate::offer_utils;
use crate::parser::{CardSelectors, ListingParser};
use crate::traits::SourceAdapter;
use crate::types::{AggregatorError, FetchError, OfferRecord, Result};
use crate::Fetcher;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Generic listing page source: one HTTP fetch, one page of offer cards
pub struct HtmlListingSource {
    pub url: String,
    pub source_label: String,
    fetcher: Arc<Fetcher>,
    parser: ListingParser,
}

impl HtmlListingSource {
    pub fn new(url: String, source_label: String, selectors: &CardSelectors, fetcher: Arc<Fetcher>) -> Result<Self> {
        if !offer_utils::url::is_valid_listing_url(&url) {
            return Err(AggregatorError::Config(format!("not a listing URL: {}", url)));
        }

        Ok(Self {
            url,
            source_label,
            fetcher,
            parser: ListingParser::new(selectors)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for HtmlListingSource {
    fn source_id(&self) -> String {
        format!("html_{}", self.source_label.to_lowercase())
    }

    fn source_name(&self) -> String {
        match offer_utils::url::extract_domain(&self.url) {
            Some(domain) => format!("{} ({})", self.source_label, domain),
            None => self.source_label.clone(),
        }
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, endpoint: &str) -> std::result::Result<Vec<OfferRecord>, FetchError> {
        info!("Pulling listing page: {}", endpoint);

        let body = self.fetcher.fetch_page(endpoint).await.map_err(|e| {
            error!("Failed to fetch listing page {}: {}", endpoint, e);
            e
        })?;

        let listing = self.parser.parse_listing(&body, endpoint, &self.source_label, Utc::now());
        Ok(listing.offers)
    }
}
