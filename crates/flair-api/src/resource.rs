// JSON:API document shapes returned by the Flair cloud.
//
// Every endpoint wraps its payload in `{ "data": ... }`. Attributes are
// vendor-defined, so they stay as a JSON object rather than typed structs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── ResourceKind ────────────────────────────────────────────────────

/// Top-level resource collections exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Structures,
    Users,
    Pucks,
    Vents,
    Rooms,
    Bridges,
    HvacUnits,
    Schedules,
}

impl ResourceKind {
    /// Path segment and JSON:API `type` for this collection.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structures => "structures",
            Self::Users => "users",
            Self::Pucks => "pucks",
            Self::Vents => "vents",
            Self::Rooms => "rooms",
            Self::Bridges => "bridges",
            Self::HvacUnits => "hvac-units",
            Self::Schedules => "schedules",
        }
    }

    /// Whether devices of this kind expose a `current-reading` sub-resource.
    pub fn has_current_reading(self) -> bool {
        matches!(self, Self::Pucks | Self::Vents)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Documents ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct Document<T> {
    pub data: T,
}

/// A single JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
}

impl Resource {
    /// The `name` attribute, if present.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }
}

/// One entry of a resource's `relationships` object.
///
/// Flair often returns only `links`; `data` is present when the
/// relationship has been included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

// ── Aggregates ──────────────────────────────────────────────────────

/// Everything fetched for one structure in a full pull.
#[derive(Debug, Clone)]
pub struct StructureData {
    pub structure: Resource,
    pub pucks: Vec<Resource>,
    pub vents: Vec<Resource>,
    pub rooms: Vec<Resource>,
    pub bridges: Vec<Resource>,
    pub hvac_units: Vec<Resource>,
    pub schedules: Vec<Resource>,
    /// Latest `current-reading` attributes keyed by puck/vent id.
    pub current_readings: HashMap<String, Map<String, Value>>,
}

/// Result of a full account pull.
#[derive(Debug, Clone, Default)]
pub struct FlairData {
    pub structures: Vec<StructureData>,
}

/// Result of a credential validation round trip.
#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub users: Vec<Resource>,
    pub structures: Vec<Resource>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn relationship_shapes_parse() {
        let raw = serde_json::json!({
            "id": "h1",
            "type": "hvac-units",
            "attributes": { "name": "Mini split" },
            "relationships": {
                "room": { "data": { "type": "rooms", "id": "r1" } },
                "puck": { "data": null },
                "vents": { "data": [ { "type": "vents", "id": "v1" } ] },
                "structure": { "links": { "self": "/api/hvac-units/h1/relationships/structure" } }
            }
        });
        let res: Resource = serde_json::from_value(raw).unwrap();

        assert_eq!(res.name(), Some("Mini split"));
        assert!(matches!(
            res.relationships["room"].data,
            Some(RelationshipData::One(ref r)) if r.id == "r1"
        ));
        assert_eq!(res.relationships["puck"].data, None);
        assert!(matches!(
            res.relationships["vents"].data,
            Some(RelationshipData::Many(ref v)) if v.len() == 1
        ));
        assert_eq!(res.relationships["structure"].data, None);
    }

    #[test]
    fn kind_paths_are_kebab_case() {
        assert_eq!(ResourceKind::HvacUnits.to_string(), "hvac-units");
        assert!(ResourceKind::Vents.has_current_reading());
        assert!(!ResourceKind::Rooms.has_current_reading());
    }
}
