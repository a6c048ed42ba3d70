// ── Vent covers ──

use serde::Serialize;
use tracing::warn;

use super::{CoverState, Entity, EntityAction, EntityKind, EntityState, StateValue, unsupported};
use crate::command::{Mutation, WritePlan};
use crate::error::CoreError;
use crate::model::{Category, DeviceRecord, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoverKind {
    Vent,
}

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    for vent in structure.vents.values() {
        out.push(Entity::new(
            structure,
            vent,
            "vent",
            "Vent",
            EntityKind::Cover(CoverKind::Vent),
        ));
    }
}

pub(super) fn render(kind: CoverKind, _structure: &Structure, record: &DeviceRecord) -> EntityState {
    match kind {
        CoverKind::Vent => {
            let position = record.attributes.i64("percent-open");
            EntityState::new(
                !record.is_inactive(),
                StateValue::Cover(CoverState {
                    position,
                    is_closed: position.map(|p| p == 0),
                }),
            )
        }
    }
}

/// Vents only accept fully open, half open and closed.
fn snap_position(position: i64) -> i64 {
    match position {
        0 | 100 => position,
        _ => 50,
    }
}

pub(super) fn plan(
    entity: &Entity,
    kind: CoverKind,
    structure: &Structure,
    record: &DeviceRecord,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    let CoverKind::Vent = kind;
    let position = match action {
        EntityAction::Open => 100,
        EntityAction::Close => 0,
        EntityAction::SetPosition(p) => snap_position(*p),
        _ => return Err(unsupported(entity, action)),
    };

    // Flair keeps driving vents of a tracked room in auto mode.
    let room_tracked = structure
        .related(record, "room", Category::Room)
        .is_none_or(|room| room.attributes.f64("current-temperature-c").is_some());
    if !structure.is_manual() && room_tracked {
        warn!(
            vent = record.name(),
            position,
            "position changes will eventually be reversed by Flair while the structure is in auto mode"
        );
    }

    Ok(WritePlan::new().write(
        Mutation::new(Category::Vent, &record.id).attribute("percent-open", position),
    ))
}
