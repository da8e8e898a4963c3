use crate::types::{FavoriteRecord, ManualEntryRecord, OfferStore, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, FromRow)]
struct ManualCarRow {
    id: i64,
    title: String,
    year: String,
    mileage: String,
    fuel: String,
    engine: String,
    transmission: String,
    price: String,
    auction_end: DateTime<Utc>,
    image_url: Option<String>,
    url: Option<String>,
    added_by: i64,
    is_active: bool,
}

impl From<ManualCarRow> for ManualEntryRecord {
    fn from(row: ManualCarRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            year: row.year,
            mileage: row.mileage,
            fuel: row.fuel,
            engine: row.engine,
            transmission: row.transmission,
            price: row.price,
            auction_end: row.auction_end,
            image_url: row.image_url,
            url: row.url,
            added_by: row.added_by,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct FavoriteRow {
    user_id: i64,
    offer_id: String,
}

/// Read access to the bot database (`manual_cars` and `favorites` tables).
pub struct PgOfferStore {
    db: PgPool,
}

impl PgOfferStore {
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        info!("Connected to offer store");
        Ok(Self { db })
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl OfferStore for PgOfferStore {
    async fn load_active_manual_entries(&self) -> std::result::Result<Vec<ManualEntryRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ManualCarRow>(
            r#"
            SELECT id, title, year, mileage, fuel, engine, transmission, price,
                   auction_end, image_url, url, added_by, is_active
            FROM manual_cars
            WHERE is_active = true
            ORDER BY auction_end ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(unavailable)?;

        debug!("Loaded {} active manual cars", rows.len());
        Ok(rows.into_iter().map(ManualEntryRecord::from).collect())
    }

    async fn load_favorites(&self) -> std::result::Result<Vec<FavoriteRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT user_id, offer_id FROM favorites ORDER BY id",
        )
        .fetch_all(&self.db)
        .await
        .map_err(unavailable)?;

        Ok(rows
            .into_iter()
            .map(|row| FavoriteRecord {
                user_id: row.user_id,
                offer_id: row.offer_id,
            })
            .collect())
    }
}
