use crate::offer_utils;
use crate::types::{AggregatorError, OfferRecord, ParsedListing, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

/// Default absolute end-time format of listing cards, read as UTC.
pub const DEFAULT_END_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// CSS selectors describing one listing page layout.
#[derive(Debug, Clone)]
pub struct CardSelectors {
    pub card: String,
    pub title: String,
    pub image: String,
    pub link: String,
    pub year: String,
    pub mileage: String,
    pub auction_end: String,
    /// Attribute on the card element carrying the offer id.
    pub id_attribute: String,
    pub end_time_format: String,
}

pub struct ListingParser {
    card: Selector,
    title: Selector,
    image: Selector,
    link: Selector,
    year: Selector,
    mileage: Selector,
    auction_end: Selector,
    id_attribute: String,
    end_time_format: String,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AggregatorError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl ListingParser {
    pub fn new(selectors: &CardSelectors) -> Result<Self> {
        Ok(Self {
            card: compile(&selectors.card)?,
            title: compile(&selectors.title)?,
            image: compile(&selectors.image)?,
            link: compile(&selectors.link)?,
            year: compile(&selectors.year)?,
            mileage: compile(&selectors.mileage)?,
            auction_end: compile(&selectors.auction_end)?,
            id_attribute: selectors.id_attribute.clone(),
            end_time_format: selectors.end_time_format.clone(),
        })
    }

    /// Parse every card on the page. Cards missing a title, id or image are
    /// skipped; an unreadable end time still yields a record with the
    /// unknown-countdown sentinel.
    pub fn parse_listing(&self, html: &str, page_url: &str, source_label: &str, now: DateTime<Utc>) -> ParsedListing {
        debug!("Parsing listing page ({} bytes)", html.len());

        let base = Url::parse(page_url).ok();
        let document = Html::parse_document(html);
        let mut listing = ParsedListing::default();

        for card in document.select(&self.card) {
            match self.parse_card(card, base.as_ref(), source_label, now) {
                Some(offer) => listing.offers.push(offer),
                None => listing.skipped += 1,
            }
        }

        info!(
            "Parsed {} offers from {} ({} cards skipped)",
            listing.offers.len(),
            page_url,
            listing.skipped
        );
        listing
    }

    fn parse_card(&self, card: ElementRef<'_>, base: Option<&Url>, source_label: &str, now: DateTime<Utc>) -> Option<OfferRecord> {
        let title = select_text(card, &self.title).filter(|t| !t.is_empty());
        let Some(title) = title else {
            debug!("Skipping card without title");
            return None;
        };

        let image_url = card
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .map(|src| resolve(base, src))
            .filter(|src| !src.is_empty());
        let Some(image_url) = image_url else {
            debug!("Skipping card without image: {}", title);
            return None;
        };

        let detail_url = card
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve(base, href))
            .unwrap_or_default();

        let id = card
            .value()
            .attr(&self.id_attribute)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| offer_utils::url::extract_offer_id(&detail_url));
        let Some(id) = id else {
            debug!("Skipping card without id: {}", title);
            return None;
        };

        let auction_end = select_text(card, &self.auction_end)
            .and_then(|text| parse_end_time(&text, &self.end_time_format));
        if auction_end.is_none() {
            debug!("Unreadable auction end for offer {}, using unknown countdown", id);
        }

        Some(OfferRecord {
            id,
            title,
            year: select_text(card, &self.year).unwrap_or_default(),
            mileage: select_text(card, &self.mileage).unwrap_or_default(),
            auction_end,
            remaining_seconds: OfferRecord::remaining_from(auction_end, now),
            source_label: source_label.to_string(),
            image_url,
            detail_url,
            is_manual: false,
        })
    }
}

fn select_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

/// Parse an absolute end time. Labels before the date ("Ends: ...") are
/// tolerated by retrying on the trailing date and time tokens.
pub fn parse_end_time(text: &str, format: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Some(naive.and_utc());
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let width = format.split_whitespace().count();
    if tokens.len() > width {
        let tail = tokens[tokens.len() - width..].join(" ");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&tail, format) {
            return Some(naive.and_utc());
        }
    }

    None
}
