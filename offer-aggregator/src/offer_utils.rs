/// Offer-specific utility functions for the tracker

/// URL utilities for listing pages
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        if let Ok(url) = Url::parse(url_str) {
            url.domain().map(|d| d.to_string())
        } else {
            None
        }
    }

    /// Validate listing page URL format
    pub fn is_valid_listing_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            (url.scheme() == "http" || url.scheme() == "https") && url.host().is_some()
        } else {
            false
        }
    }

    /// Last all-digit path segment of a detail URL, e.g. `/offers/42` -> `42`
    pub fn extract_offer_id(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        url.path_segments()?
            .rev()
            .find(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
            .map(|segment| segment.to_string())
    }
}

/// Time utilities for auction countdowns
pub mod time {
    /// Format a countdown in human-readable form, e.g. `1d 2h 5m`
    pub fn format_remaining(total_seconds: i64) -> String {
        if total_seconds <= 0 {
            return "ended".to_string();
        }

        let days = total_seconds / 86_400;
        let hours = (total_seconds % 86_400) / 3_600;
        let minutes = (total_seconds % 3_600) / 60;

        if days > 0 {
            format!("{}d {}h {}m", days, hours, minutes)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", total_seconds)
        }
    }
}
