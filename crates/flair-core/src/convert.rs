// ── API-to-domain conversions ──
//
// Bridges raw `flair_api` resources into the snapshot model. Relationships
// collapse to plain ids; readings attach to their puck or vent.

use std::collections::HashMap;

use serde_json::{Map, Value};

use flair_api::{FlairData, Relationship, RelationshipData, Resource, StructureData};

use crate::model::{Attributes, Category, DeviceRecord, Relation, Snapshot, Structure};

// ── Helpers ────────────────────────────────────────────────────────

fn to_relation(relationship: &Relationship) -> Relation {
    match &relationship.data {
        None => Relation::Empty,
        Some(RelationshipData::One(target)) => Relation::One(target.id.clone()),
        Some(RelationshipData::Many(targets)) => {
            Relation::Many(targets.iter().map(|t| t.id.clone()).collect())
        }
    }
}

fn to_record(
    resource: Resource,
    category: Category,
    readings: &mut HashMap<String, Map<String, Value>>,
) -> DeviceRecord {
    let relationships = resource
        .relationships
        .iter()
        .map(|(name, rel)| (name.clone(), to_relation(rel)))
        .collect();
    let current_reading = readings.remove(&resource.id).map(Attributes::from);

    DeviceRecord {
        id: resource.id,
        category,
        attributes: Attributes::from(resource.attributes),
        relationships,
        current_reading,
    }
}

// ── Structure ──────────────────────────────────────────────────────

impl From<StructureData> for Structure {
    fn from(data: StructureData) -> Self {
        let StructureData {
            structure,
            pucks,
            vents,
            rooms,
            bridges,
            hvac_units,
            schedules,
            mut current_readings,
        } = data;

        let mut out = Structure::new(to_record(
            structure,
            Category::Structure,
            &mut current_readings,
        ));

        let groups = [
            (Category::Puck, pucks),
            (Category::Vent, vents),
            (Category::Room, rooms),
            (Category::Bridge, bridges),
            (Category::HvacUnit, hvac_units),
            (Category::Schedule, schedules),
        ];
        for (category, resources) in groups {
            for resource in resources {
                out.insert(to_record(resource, category, &mut current_readings));
            }
        }
        out
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

impl From<FlairData> for Snapshot {
    fn from(data: FlairData) -> Self {
        let mut snapshot = Snapshot::empty();
        for structure in data.structures {
            snapshot.insert(Structure::from(structure));
        }
        snapshot
    }
}
