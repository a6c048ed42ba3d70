// ── Connectivity ──

use serde::Serialize;

use super::{BinarySensorState, Entity, EntityKind, EntityState, StateValue};
use crate::model::{DeviceRecord, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BinarySensorKind {
    Connectivity,
}

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    let devices = structure
        .pucks
        .values()
        .chain(structure.vents.values())
        .chain(structure.bridges.values());
    for device in devices {
        out.push(
            Entity::new(
                structure,
                device,
                "connectivity",
                "Connection status",
                EntityKind::BinarySensor(BinarySensorKind::Connectivity),
            )
            .diagnostic(),
        );
    }
}

/// Always available: reporting offline is the point.
pub(super) fn render(kind: BinarySensorKind, record: &DeviceRecord) -> EntityState {
    let BinarySensorKind::Connectivity = kind;
    EntityState::new(
        true,
        StateValue::BinarySensor(BinarySensorState {
            is_on: !record.is_inactive(),
        }),
    )
}
