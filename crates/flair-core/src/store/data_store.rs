// ── Snapshot store ──
//
// Holds the one current `Snapshot`. Reads are wait-free `Arc` loads;
// replacement is a single pointer swap, so readers always see one whole
// fetch. Every change is pushed to subscribers over a `watch` channel.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::command::LocalPatch;
use crate::model::Snapshot;
use crate::stream::SnapshotStream;

/// Central store for the coordinator's cached snapshot.
pub struct DataStore {
    current: ArcSwap<Snapshot>,
    changes: watch::Sender<Arc<Snapshot>>,
    pub(crate) last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DataStore {
    pub fn new() -> Self {
        let empty = Arc::new(Snapshot::empty());
        let (changes, _) = watch::channel(Arc::clone(&empty));
        let (last_full_refresh, _) = watch::channel(None);

        Self {
            current: ArcSwap::new(empty),
            changes,
            last_full_refresh,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The most recently committed snapshot. Never blocks.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.changes.subscribe())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Swap in a freshly fetched snapshot and stamp the refresh time.
    pub(crate) fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        self.last_full_refresh.send_replace(Some(Utc::now()));
        self.changes.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// Apply an optimistic patch to the matching record.
    ///
    /// Returns `false` (and leaves the snapshot untouched) when the record
    /// is not in the current snapshot.
    pub(crate) fn apply_patch(&self, patch: &LocalPatch) -> bool {
        if self
            .current
            .load()
            .find(patch.category, &patch.device_id)
            .is_none()
        {
            return false;
        }

        let mut applied = false;
        self.current.rcu(|current| {
            let mut next = Snapshot::clone(current);
            applied = patch_record(&mut next, patch);
            next
        });
        if applied {
            self.changes.send_replace(self.current.load_full());
        }
        applied
    }

    /// Drop the cached snapshot.
    pub(crate) fn clear(&self) {
        let empty = Arc::new(Snapshot::empty());
        self.current.store(Arc::clone(&empty));
        self.last_full_refresh.send_replace(None);
        self.changes.send_replace(empty);
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    /// How long ago the last full refresh occurred, or `None` if never refreshed.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_full_refresh().map(|t| Utc::now() - t)
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

fn patch_record(snapshot: &mut Snapshot, patch: &LocalPatch) -> bool {
    let Some(record) = snapshot.find_mut(patch.category, &patch.device_id) else {
        return false;
    };
    record.attributes.merge(&patch.attributes);
    for (name, relation) in &patch.relationships {
        record.relationships.insert(name.clone(), relation.clone());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DeviceRecord, Relation, Structure};

    fn snapshot_with_vent(percent_open: i64) -> Snapshot {
        let mut structure = Structure::new(DeviceRecord::new("s1", Category::Structure));
        structure.insert(
            DeviceRecord::new("v1", Category::Vent).with_attribute("percent-open", percent_open),
        );
        let mut snapshot = Snapshot::empty();
        snapshot.insert(structure);
        snapshot
    }

    fn percent_open(store: &DataStore) -> Option<i64> {
        store
            .snapshot()
            .find(Category::Vent, "v1")
            .and_then(|(_, vent)| vent.attributes.i64("percent-open"))
    }

    #[test]
    fn starts_empty_without_refresh_time() {
        let store = DataStore::new();
        assert!(store.snapshot().is_empty());
        assert!(store.last_full_refresh().is_none());
        assert!(store.data_age().is_none());
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let store = DataStore::new();
        let before = store.snapshot();
        store.replace(snapshot_with_vent(50));

        assert!(before.is_empty());
        assert_eq!(percent_open(&store), Some(50));
        assert!(store.last_full_refresh().is_some());
    }

    #[test]
    fn patch_updates_only_the_current_snapshot() {
        let store = DataStore::new();
        store.replace(snapshot_with_vent(50));
        let held = store.snapshot();

        let patch = LocalPatch::new(Category::Vent, "v1").attribute("percent-open", 100);
        assert!(store.apply_patch(&patch));

        assert_eq!(percent_open(&store), Some(100));
        let held_value = held
            .find(Category::Vent, "v1")
            .and_then(|(_, v)| v.attributes.i64("percent-open"));
        assert_eq!(held_value, Some(50));
    }

    #[test]
    fn patch_for_unknown_record_is_ignored() {
        let store = DataStore::new();
        store.replace(snapshot_with_vent(50));

        let patch = LocalPatch::new(Category::Vent, "nope").attribute("percent-open", 0);
        assert!(!store.apply_patch(&patch));
        assert_eq!(percent_open(&store), Some(50));
    }

    #[test]
    fn patch_can_rewrite_relations() {
        let store = DataStore::new();
        store.replace(snapshot_with_vent(50));

        let patch = LocalPatch::new(Category::Structure, "s1")
            .relation("active-schedule", Relation::One("sc1".into()));
        assert!(store.apply_patch(&patch));

        let snapshot = store.snapshot();
        let active = snapshot
            .structure("s1")
            .and_then(|s| s.record.related_id("active-schedule"));
        assert_eq!(active, Some("sc1"));
    }

    #[test]
    fn subscribers_see_replacements_and_patches() {
        let store = DataStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.replace(snapshot_with_vent(50));
        assert!(!stream.latest().is_empty());

        store.apply_patch(&LocalPatch::new(Category::Vent, "v1").attribute("percent-open", 0));
        let latest = stream.latest();
        let value = latest
            .find(Category::Vent, "v1")
            .and_then(|(_, v)| v.attributes.i64("percent-open"));
        assert_eq!(value, Some(0));
        assert!(stream.has_changed());
    }
}
