use anyhow::Context;
use clap::Parser;
use interfaces::memory::MemoryStore;
use offer_aggregator::sources::autach::AUTACH_OFFERS_URL;
use offer_aggregator::{
    offer_utils, AutachSource, ChatId, CycleReport, FetchConfig, Fetcher, HtmlListingSource, LogNotifier,
    ManualEntryProvider, OfferAggregator, OfferNotifier, OfferStore, PgOfferStore, PollCoordinator,
    SourceAdapter, SubscriberRegistry, TelegramNotifier, ThresholdNotifier, TrackerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "offer-aggregator", about = "Tracks auction listings and announces closing offers")]
struct Cli {
    /// Seconds between poll cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 180)]
    poll_interval: u64,

    /// Countdown below which an offer goes to every subscriber
    #[arg(long, env = "URGENT_THRESHOLD_SECS", default_value_t = 43_200)]
    urgent_threshold: i64,

    /// Countdown below which a favorited offer goes to its user
    #[arg(long, env = "FAVORITE_THRESHOLD_SECS", default_value_t = 10_800)]
    favorite_threshold: i64,

    /// Per-source fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 15)]
    fetch_timeout: u64,

    /// Listing pages to poll, highest priority first
    #[arg(long = "source", env = "SOURCE_URLS", value_delimiter = ',', default_value = AUTACH_OFFERS_URL)]
    sources: Vec<String>,

    /// Bot database with manual entries and favorites
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Telegram bot token; notifications are only logged without it
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Chats subscribed to urgent notifications
    #[arg(long = "subscriber", env = "SUBSCRIBERS", value_delimiter = ',')]
    subscribers: Vec<ChatId>,

    /// Warm start, run one more cycle, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval_secs: self.poll_interval,
            urgent_threshold_secs: self.urgent_threshold,
            favorite_threshold_secs: self.favorite_threshold,
            fetch_timeout_secs: self.fetch_timeout,
        }
    }
}

fn build_sources(urls: &[String], fetcher: Arc<Fetcher>) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for url in urls {
        let domain = offer_utils::url::extract_domain(url).unwrap_or_default();
        let source: Arc<dyn SourceAdapter> = if domain.ends_with("autach.pl") {
            Arc::new(AutachSource::new(url.clone(), fetcher.clone())?)
        } else {
            // Unknown sites are expected to share the autach card layout.
            Arc::new(HtmlListingSource::new(url.clone(), domain, &AutachSource::selectors(), fetcher.clone())?)
        };
        info!("Configured source: {}", source.source_name());
        sources.push(source);
    }
    Ok(sources)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.tracker_config();
    config.validate()?;

    info!("Starting offer aggregator");

    let fetch_config = FetchConfig {
        timeout_seconds: config.fetch_timeout_secs,
        ..FetchConfig::default()
    };
    let fetcher = Arc::new(Fetcher::new(fetch_config)?);
    let sources = build_sources(&cli.sources, fetcher)?;

    let store: Arc<dyn OfferStore> = match &cli.database_url {
        Some(url) => Arc::new(
            PgOfferStore::connect(url, config.fetch_timeout())
                .await
                .context("failed to connect to the offer store")?,
        ),
        None => {
            warn!("No DATABASE_URL set, manual entries and favorites are disabled");
            Arc::new(MemoryStore::new())
        }
    };

    let delivery: Arc<dyn OfferNotifier> = match &cli.bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token, Duration::from_secs(10))?),
        None => {
            warn!("No BOT_TOKEN set, notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let aggregator = OfferAggregator::new(sources, ManualEntryProvider::new(store.clone()), config.fetch_timeout());
    let subscribers = Arc::new(SubscriberRegistry::with_subscribers(cli.subscribers.iter().copied()));
    let notifier = ThresholdNotifier::new(config.urgent_threshold_secs, config.favorite_threshold_secs);
    let coordinator = Arc::new(PollCoordinator::new(aggregator, store, delivery, subscribers, notifier));

    if cli.once {
        for _ in 0..2 {
            let report = coordinator.refresh_now().await;
            info!("Cycle report: {:?}", report);
            if let CycleReport::Failed { .. } = report {
                anyhow::bail!("every source failed");
            }
        }
        println!("{}", serde_json::to_string_pretty(&coordinator.offers())?);
        return Ok(());
    }

    coordinator.spawn(config.poll_interval()).await?;
    Ok(())
}
