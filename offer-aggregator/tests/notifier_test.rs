mod common;

use common::{base_time, init_tracing, offer};
use offer_aggregator::{
    FavoriteRecord, Notification, OfferRecord, Snapshot, ThresholdNotifier, UNKNOWN_REMAINING_SECONDS,
};
use uuid::Uuid;

const URGENT: i64 = 43_200;
const FAVORITE: i64 = 10_800;

fn favorite(user_id: i64, offer_id: &str) -> FavoriteRecord {
    FavoriteRecord {
        user_id,
        offer_id: offer_id.to_string(),
    }
}

fn snapshot_of(offers: Vec<OfferRecord>) -> Snapshot {
    Snapshot::new(Uuid::new_v4(), base_time(), offers)
}

fn manual(id: &str, remaining: i64) -> OfferRecord {
    let mut record = offer(id, remaining, "Manager");
    record.is_manual = true;
    record
}

#[test]
fn test_urgent_crossing_reported_once_while_countdown_drops() {
    init_tracing();

    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let mut sent = 0;

    for cycle in 0..5 {
        let snapshot = snapshot_of(vec![offer("77", 43_199 - cycle * 180, "A")]);
        sent += notifier
            .evaluate(&snapshot, &[])
            .iter()
            .filter(|n| matches!(n, Notification::Urgent(o) if o.id == "77"))
            .count();
    }

    assert_eq!(sent, 1);
    assert!(notifier.is_urgent_notified("77"));
}

#[test]
fn test_offer_at_threshold_is_not_urgent() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);

    assert!(notifier.evaluate(&snapshot_of(vec![offer("1", URGENT, "A")]), &[]).is_empty());
    assert_eq!(notifier.evaluate(&snapshot_of(vec![offer("1", URGENT - 1, "A")]), &[]).len(), 1);
}

#[test]
fn test_unknown_end_time_never_crosses() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![offer("x", UNKNOWN_REMAINING_SECONDS, "A")]);
    let favorites = vec![favorite(10, "x")];

    for _ in 0..3 {
        assert!(notifier.evaluate(&snapshot, &favorites).is_empty());
    }
    assert!(!notifier.is_urgent_notified("x"));
    assert!(!notifier.is_favorite_notified(10, "x"));
}

#[test]
fn test_notified_offer_stays_notified_after_countdown_grows() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);

    assert_eq!(notifier.evaluate(&snapshot_of(vec![offer("5", 1_000, "A")]), &[]).len(), 1);
    // End time pushed back, then forward again.
    assert!(notifier.evaluate(&snapshot_of(vec![offer("5", 90_000, "A")]), &[]).is_empty());
    assert!(notifier.evaluate(&snapshot_of(vec![offer("5", 900, "A")]), &[]).is_empty());
    assert_eq!(notifier.urgent_notified_count(), 1);
}

#[test]
fn test_favorite_goes_only_to_the_user_who_favorited() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![offer("1", 5_000, "A"), offer("2", 20_000, "A")]);
    let favorites = vec![favorite(100, "1"), favorite(200, "2"), favorite(300, "gone")];

    let notifications = notifier.evaluate(&snapshot, &favorites);

    let favorite_hits: Vec<(i64, String)> = notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Favorite { user_id, offer } => Some((*user_id, offer.id.clone())),
            Notification::Urgent(_) => None,
        })
        .collect();
    assert_eq!(favorite_hits, vec![(100, "1".to_string())]);

    // Second user favorites the same offer later: their pair is new.
    let favorites = vec![favorite(100, "1"), favorite(400, "1")];
    let notifications = notifier.evaluate(&snapshot, &favorites);
    assert_eq!(
        notifications,
        vec![Notification::Favorite {
            user_id: 400,
            offer: snapshot.offers()[0].clone(),
        }]
    );
}

#[test]
fn test_evaluation_repeated_is_idempotent() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![offer("1", 100, "A"), offer("2", 200, "A")]);
    let favorites = vec![favorite(1, "1")];

    let first = notifier.evaluate(&snapshot, &favorites);
    let second = notifier.evaluate(&snapshot, &favorites);

    assert_eq!(first.len(), 3);
    assert!(second.is_empty());
}

#[test]
fn test_warm_start_seed_skips_manual_offers() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![offer("scraped", 1_000, "A"), manual("manual_1", 1_000)]);
    let favorites = vec![favorite(9, "scraped"), favorite(9, "manual_1")];

    let seed = notifier.seed_warm_start(&snapshot, &favorites);

    assert_eq!(seed.urgent_suppressed, 1);
    assert_eq!(seed.favorites_suppressed, 1);
    assert!(notifier.is_urgent_notified("scraped"));
    assert!(!notifier.is_urgent_notified("manual_1"));

    let next = notifier.evaluate(&snapshot, &favorites);
    let ids: Vec<&str> = next.iter().map(|n| n.offer().id.as_str()).collect();
    assert_eq!(ids, vec!["manual_1", "manual_1"]);
}

#[test]
fn test_favorites_resolve_through_snapshot_index() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let mut offers: Vec<OfferRecord> = (0..500).map(|i| offer(&i.to_string(), 90_000, "A")).collect();
    offers.push(offer("tail", 600, "A"));
    let snapshot = snapshot_of(offers);
    let favorites = vec![favorite(1, "tail"), favorite(2, "tail"), favorite(3, "gone"), favorite(4, "499")];

    let notifications = notifier.evaluate(&snapshot, &favorites);

    let favorite_users: Vec<i64> = notifications
        .iter()
        .filter_map(|n| match n {
            Notification::Favorite { user_id, .. } => Some(*user_id),
            Notification::Urgent(_) => None,
        })
        .collect();
    assert_eq!(favorite_users, vec![1, 2]);
    assert!(!notifier.is_favorite_notified(3, "gone"));
    assert!(!notifier.is_favorite_notified(4, "499"));
}

#[test]
fn test_seed_urgent_marks_only_the_given_offers() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![
        offer("a", 1_000, "A"),
        offer("b", 2_000, "B"),
        offer("c", 90_000, "B"),
        manual("manual_3", 500),
    ]);

    let seeded = notifier.seed_urgent(snapshot.offers().iter().filter(|o| o.id != "a"));

    assert_eq!(seeded, 1);
    assert!(notifier.is_urgent_notified("b"));
    assert!(!notifier.is_urgent_notified("c"));
    assert!(!notifier.is_urgent_notified("manual_3"));

    let ids: Vec<String> = notifier
        .evaluate(&snapshot, &[])
        .iter()
        .map(|n| n.offer().id.clone())
        .collect();
    assert_eq!(ids, vec!["a", "manual_3"]);
}

#[test]
fn test_seed_favorites_honours_filter() {
    let mut notifier = ThresholdNotifier::new(URGENT, FAVORITE);
    let snapshot = snapshot_of(vec![offer("1", 600, "A"), offer("2", 600, "B"), manual("manual_4", 600)]);
    let favorites = vec![favorite(7, "1"), favorite(7, "2"), favorite(7, "manual_4")];

    let seeded = notifier.seed_favorites(&snapshot, &favorites, |o| o.source_label == "B");

    assert_eq!(seeded, 1);
    assert!(notifier.is_favorite_notified(7, "2"));
    assert!(!notifier.is_favorite_notified(7, "1"));
    assert!(!notifier.is_favorite_notified(7, "manual_4"));
}
