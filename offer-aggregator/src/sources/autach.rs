use crate::parser::{CardSelectors, DEFAULT_END_TIME_FORMAT};
use crate::sources::HtmlListingSource;
use crate::traits::SourceAdapter;
use crate::types::{FetchError, OfferRecord, Result};
use crate::Fetcher;
use async_trait::async_trait;
use std::sync::Arc;

pub const AUTACH_OFFERS_URL: &str = "https://autach.pl/offers?from=axa";

/// autach.pl auction listing
pub struct AutachSource {
    inner: HtmlListingSource,
}

impl AutachSource {
    pub fn new(url: String, fetcher: Arc<Fetcher>) -> Result<Self> {
        let inner = HtmlListingSource::new(url, "Autach".to_string(), &Self::selectors(), fetcher)?;
        Ok(Self { inner })
    }

    pub fn selectors() -> CardSelectors {
        CardSelectors {
            card: ".offer-container .offer-card".to_string(),
            title: "h3".to_string(),
            image: ".swiper-slide img".to_string(),
            link: "a.offer-link".to_string(),
            year: ".offer-year".to_string(),
            mileage: ".offer-mileage".to_string(),
            auction_end: ".offer-auction-end".to_string(),
            id_attribute: "data-offer-id".to_string(),
            end_time_format: DEFAULT_END_TIME_FORMAT.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for AutachSource {
    fn source_id(&self) -> String {
        "autach".to_string()
    }

    fn source_name(&self) -> String {
        format!("Autach: {}", self.inner.url)
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn fetch(&self, endpoint: &str) -> std::result::Result<Vec<OfferRecord>, FetchError> {
        // Delegate to the generic listing source
        self.inner.fetch(endpoint).await
    }
}
