use crate::offer_utils::time::format_remaining;
use crate::types::{AggregatorError, ChatId, DeliveryError, OfferNotifier, OfferRecord, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl OfferNotifier for LogNotifier {
    async fn notify_one(&self, chat_id: ChatId, offer: &OfferRecord) -> std::result::Result<(), DeliveryError> {
        info!(
            "Notify {}: {} [{}] ({}s left)",
            chat_id, offer.title, offer.id, offer.remaining_seconds
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends offer cards through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, timeout)
    }

    pub fn with_api_base(api_base: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        if bot_token.trim().is_empty() {
            return Err(AggregatorError::Config("bot token is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AggregatorError::Http)?;

        Ok(Self {
            client,
            api_base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token.trim()),
        })
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> std::result::Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if !status.is_success() || !body.ok {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OfferNotifier for TelegramNotifier {
    async fn notify_one(&self, chat_id: ChatId, offer: &OfferRecord) -> std::result::Result<(), DeliveryError> {
        let caption = offer_caption(offer);

        if !offer.image_url.is_empty() {
            let photo = self
                .call(
                    "sendPhoto",
                    json!({
                        "chat_id": chat_id,
                        "photo": offer.image_url,
                        "caption": caption,
                        "parse_mode": "HTML",
                    }),
                )
                .await;
            match photo {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Photo send of {} to {} failed, falling back to text: {}", offer.id, chat_id, e),
            }
        }

        debug!("Sending text card of {} to {}", offer.id, chat_id);
        self.call(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }
}

/// Short HTML caption of an offer card.
pub fn offer_caption(offer: &OfferRecord) -> String {
    let remaining = if offer.has_known_end() {
        format_remaining(offer.remaining_seconds)
    } else {
        "unknown".to_string()
    };
    let mut caption = format!(
        "<b>{}</b>\nID: {} ({})\nYear: {}\nMileage: {}\nEnds in: {}",
        escape_html(&offer.title),
        escape_html(&offer.id),
        escape_html(&offer.source_label),
        escape_html(&offer.year),
        escape_html(&offer.mileage),
        remaining
    );
    if let Some(end) = offer.auction_end {
        caption.push_str(&format!(" ({} UTC)", end.format("%Y-%m-%d %H:%M")));
    }
    if !offer.detail_url.is_empty() {
        caption.push_str(&format!("\n{}", escape_html(&offer.detail_url)));
    }
    caption
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
