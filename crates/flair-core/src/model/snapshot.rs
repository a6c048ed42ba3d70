// ── Snapshot ──
//
// The coordinator's view of the whole account. Replaced wholesale on every
// successful refresh; readers hold an `Arc<Snapshot>` and never observe a
// partially applied fetch.

use std::collections::BTreeMap;

use serde::Serialize;

use super::record::{Category, DeviceRecord};

/// One structure and every record fetched underneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Structure {
    pub record: DeviceRecord,
    pub pucks: BTreeMap<String, DeviceRecord>,
    pub vents: BTreeMap<String, DeviceRecord>,
    pub bridges: BTreeMap<String, DeviceRecord>,
    pub rooms: BTreeMap<String, DeviceRecord>,
    pub hvac_units: BTreeMap<String, DeviceRecord>,
    pub schedules: BTreeMap<String, DeviceRecord>,
}

impl Structure {
    pub fn new(record: DeviceRecord) -> Self {
        Self {
            record,
            pucks: BTreeMap::new(),
            vents: BTreeMap::new(),
            bridges: BTreeMap::new(),
            rooms: BTreeMap::new(),
            hvac_units: BTreeMap::new(),
            schedules: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// The child map for a device category. `None` for `Structure`.
    pub fn devices(&self, category: Category) -> Option<&BTreeMap<String, DeviceRecord>> {
        match category {
            Category::Structure => None,
            Category::Puck => Some(&self.pucks),
            Category::Vent => Some(&self.vents),
            Category::Bridge => Some(&self.bridges),
            Category::Room => Some(&self.rooms),
            Category::HvacUnit => Some(&self.hvac_units),
            Category::Schedule => Some(&self.schedules),
        }
    }

    fn devices_mut(&mut self, category: Category) -> Option<&mut BTreeMap<String, DeviceRecord>> {
        match category {
            Category::Structure => None,
            Category::Puck => Some(&mut self.pucks),
            Category::Vent => Some(&mut self.vents),
            Category::Bridge => Some(&mut self.bridges),
            Category::Room => Some(&mut self.rooms),
            Category::HvacUnit => Some(&mut self.hvac_units),
            Category::Schedule => Some(&mut self.schedules),
        }
    }

    /// Add a child record, routed by its category. A `Structure` record
    /// replaces this structure's own record.
    pub fn insert(&mut self, record: DeviceRecord) {
        match self.devices_mut(record.category) {
            Some(map) => {
                map.insert(record.id.clone(), record);
            }
            None => self.record = record,
        }
    }

    pub fn device(&self, category: Category, id: &str) -> Option<&DeviceRecord> {
        match self.devices(category) {
            Some(map) => map.get(id),
            None => (self.record.id == id).then_some(&self.record),
        }
    }

    pub(crate) fn device_mut(&mut self, category: Category, id: &str) -> Option<&mut DeviceRecord> {
        if category == Category::Structure {
            return (self.record.id == id).then_some(&mut self.record);
        }
        self.devices_mut(category).and_then(|map| map.get_mut(id))
    }

    /// Resolve a to-one relation of `record` into this structure.
    pub fn related(&self, record: &DeviceRecord, name: &str, category: Category) -> Option<&DeviceRecord> {
        record
            .related_id(name)
            .and_then(|id| self.device(category, id))
    }

    /// Structure system mode is `manual`.
    pub fn is_manual(&self) -> bool {
        self.record.attributes.str("mode") == Some("manual")
    }

    pub fn device_count(&self) -> usize {
        self.pucks.len()
            + self.vents.len()
            + self.bridges.len()
            + self.rooms.len()
            + self.hvac_units.len()
            + self.schedules.len()
    }
}

/// Every structure visible to the account, keyed by structure id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub structures: BTreeMap<String, Structure>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn insert(&mut self, structure: Structure) {
        self.structures.insert(structure.id().to_owned(), structure);
    }

    pub fn structure(&self, id: &str) -> Option<&Structure> {
        self.structures.get(id)
    }

    /// Locate a record in a given structure.
    pub fn device(&self, structure_id: &str, category: Category, id: &str) -> Option<&DeviceRecord> {
        self.structure(structure_id)
            .and_then(|s| s.device(category, id))
    }

    /// Locate a record in any structure.
    pub fn find(&self, category: Category, id: &str) -> Option<(&Structure, &DeviceRecord)> {
        self.structures
            .values()
            .find_map(|s| s.device(category, id).map(|d| (s, d)))
    }

    pub(crate) fn find_mut(&mut self, category: Category, id: &str) -> Option<&mut DeviceRecord> {
        self.structures
            .values_mut()
            .find_map(|s| s.device_mut(category, id))
    }

    pub fn device_count(&self) -> usize {
        self.structures.values().map(Structure::device_count).sum()
    }
}
