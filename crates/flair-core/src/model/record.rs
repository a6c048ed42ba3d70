// ── Device records ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Device categories held in a structure.
///
/// The serialized names match the API resource paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    strum::Display, strum::EnumString, strum::EnumIter, strum::AsRefStr,
)]
pub enum Category {
    #[serde(rename = "structures")]
    #[strum(to_string = "structures", serialize = "structure")]
    Structure,
    #[serde(rename = "pucks")]
    #[strum(to_string = "pucks", serialize = "puck")]
    Puck,
    #[serde(rename = "vents")]
    #[strum(to_string = "vents", serialize = "vent")]
    Vent,
    #[serde(rename = "bridges")]
    #[strum(to_string = "bridges", serialize = "bridge")]
    Bridge,
    #[serde(rename = "rooms")]
    #[strum(to_string = "rooms", serialize = "room")]
    Room,
    #[serde(rename = "hvac-units")]
    #[strum(to_string = "hvac-units", serialize = "hvac-unit")]
    HvacUnit,
    #[serde(rename = "schedules")]
    #[strum(to_string = "schedules", serialize = "schedule")]
    Schedule,
}

impl Category {
    /// The API collection this category is read from and written to.
    pub fn resource_kind(self) -> flair_api::ResourceKind {
        use flair_api::ResourceKind;
        match self {
            Self::Structure => ResourceKind::Structures,
            Self::Puck => ResourceKind::Pucks,
            Self::Vent => ResourceKind::Vents,
            Self::Bridge => ResourceKind::Bridges,
            Self::Room => ResourceKind::Rooms,
            Self::HvacUnit => ResourceKind::HvacUnits,
            Self::Schedule => ResourceKind::Schedules,
        }
    }
}

// ── Attributes ───────────────────────────────────────────────────────

/// Vendor-defined attribute map with null-aware typed accessors.
///
/// A key that is present with a JSON `null` reads as `None` from every
/// typed accessor; use [`Attributes::contains`] to tell the two apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Whether the key exists at all (even as `null`).
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Like [`Attributes::f64`], but also accepts numeric strings such as
    /// `"72"`, which some HVAC units report.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::String(raw) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            other => other.as_f64(),
        }
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn list(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overwrite the given fields, leaving the rest untouched.
    pub fn merge(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ── Relations ────────────────────────────────────────────────────────

/// A foreign key to other records. The target may be missing from the
/// snapshot; lookups then yield `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Empty,
    One(String),
    Many(Vec<String>),
}

impl Relation {
    /// The single related id, if this is a to-one relation.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::One(id) => Some(id),
            Self::Empty | Self::Many(_) => None,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Empty => Vec::new(),
            Self::One(id) => vec![id.as_str()],
            Self::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

// ── DeviceRecord ─────────────────────────────────────────────────────

/// One remote object: a structure, device, room or schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub category: Category,
    pub attributes: Attributes,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relation>,
    /// Latest sensor reading for pucks and vents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_reading: Option<Attributes>,
}

impl DeviceRecord {
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            attributes: Attributes::new(),
            relationships: BTreeMap::new(),
            current_reading: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn with_relation(mut self, name: &str, relation: Relation) -> Self {
        self.relationships.insert(name.to_owned(), relation);
        self
    }

    pub fn with_reading(mut self, reading: Attributes) -> Self {
        self.current_reading = Some(reading);
        self
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.attributes.str("name").unwrap_or(&self.id)
    }

    /// Pucks, vents and bridges report `inactive: true` when offline.
    pub fn is_inactive(&self) -> bool {
        self.attributes.bool("inactive").unwrap_or(false)
    }

    /// Id of a to-one relation, if populated.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.relationships.get(name).and_then(Relation::id)
    }

    /// Read a numeric field from the current reading, falling back to
    /// the record's own attributes.
    pub fn reading_f64(&self, key: &str) -> Option<f64> {
        self.current_reading
            .as_ref()
            .and_then(|r| r.f64(key))
            .or_else(|| self.attributes.f64(key))
    }
}
