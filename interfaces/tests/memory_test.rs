use chrono::{TimeZone, Utc};
use interfaces::defs::{DeliveryError, ManualEntryRecord, OfferNotifier, OfferRecord, OfferStore, StoreError};
use interfaces::memory::{Delivery, MemoryStore, RecordingNotifier};

fn entry(id: i64, is_active: bool) -> ManualEntryRecord {
    ManualEntryRecord {
        id,
        title: format!("Entry {}", id),
        year: "2020".to_owned(),
        mileage: "50000".to_owned(),
        fuel: "Petrol".to_owned(),
        engine: "1.5".to_owned(),
        transmission: "Manual".to_owned(),
        price: "12000 EUR".to_owned(),
        auction_end: Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap(),
        image_url: None,
        url: Some(format!("https://dealer.example.com/{}", id)),
        added_by: 1,
        is_active,
    }
}

fn offer(id: &str) -> OfferRecord {
    OfferRecord {
        id: id.to_owned(),
        title: "Car".to_owned(),
        year: String::new(),
        mileage: String::new(),
        auction_end: None,
        remaining_seconds: 999_999,
        source_label: "Test".to_owned(),
        image_url: String::new(),
        detail_url: String::new(),
        is_manual: false,
    }
}

#[tokio::test]
async fn test_store_returns_only_active_entries() {
    let store = MemoryStore::new();
    store.add_manual_entry(entry(1, true));
    store.add_manual_entry(entry(2, false));
    store.add_manual_entry(entry(3, true));

    let ids: Vec<i64> = store
        .load_active_manual_entries()
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();

    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_store_outage_fails_both_reads() {
    let store = MemoryStore::new();
    store.add_favorite(1, "10");
    store.set_unavailable(true);

    assert!(matches!(store.load_favorites().await, Err(StoreError::Unavailable(_))));
    assert!(store.load_active_manual_entries().await.is_err());

    store.set_unavailable(false);
    assert_eq!(store.load_favorites().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_favorites_are_stored_once() {
    let store = MemoryStore::new();
    store.add_favorite(1, "10");
    store.add_favorite(1, "10");
    store.add_favorite(2, "10");

    assert_eq!(store.load_favorites().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_notify_all_attempts_every_recipient() {
    let notifier = RecordingNotifier::new();
    notifier.fail_for(2);

    let failures = notifier.notify_all(&[1, 2, 3], &offer("x")).await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 2);
    assert!(matches!(failures[0].1, DeliveryError::Rejected { status: 403, .. }));
    assert_eq!(
        notifier.deliveries(),
        vec![
            Delivery {
                chat_id: 1,
                offer_id: "x".to_owned()
            },
            Delivery {
                chat_id: 3,
                offer_id: "x".to_owned()
            },
        ]
    );

    notifier.clear();
    assert!(notifier.deliveries_for("x").is_empty());
}

#[test]
fn test_remaining_is_clamped_and_unknown_uses_sentinel() {
    let now = Utc.with_ymd_and_hms(2026, 10, 20, 10, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 10, 20, 11, 0, 0).unwrap();

    assert_eq!(OfferRecord::remaining_from(Some(later), now), 3_600);
    assert_eq!(OfferRecord::remaining_from(Some(now), later), 0);
    assert_eq!(OfferRecord::remaining_from(None, now), 999_999);
}
