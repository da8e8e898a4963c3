use crate::types::OfferRecord;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Immutable merged offer list of one cycle.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub cycle_id: Option<Uuid>,
    pub taken_at: Option<DateTime<Utc>>,
    offers: Vec<OfferRecord>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new(cycle_id: Uuid, taken_at: DateTime<Utc>, offers: Vec<OfferRecord>) -> Self {
        let index = offers
            .iter()
            .enumerate()
            .map(|(position, offer)| (offer.id.clone(), position))
            .collect();
        Self {
            cycle_id: Some(cycle_id),
            taken_at: Some(taken_at),
            offers,
            index,
        }
    }

    pub fn offers(&self) -> &[OfferRecord] {
        &self.offers
    }

    pub fn get(&self, id: &str) -> Option<&OfferRecord> {
        self.index.get(id).map(|&position| &self.offers[position])
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

/// Last successfully merged snapshot, readable without network I/O.
/// Readers hold an `Arc` to a whole snapshot and never see a partial swap.
#[derive(Default)]
pub struct SnapshotCache {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = snapshot.clone();
        snapshot
    }

    pub fn lookup(&self, id: &str) -> Option<OfferRecord> {
        self.current().get(id).cloned()
    }

    pub fn offers(&self) -> Vec<OfferRecord> {
        self.current().offers().to_vec()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }
}
