// ── Switches ──

use serde::Serialize;

use super::{Entity, EntityAction, EntityKind, EntityState, StateValue, SwitchState, unsupported};
use crate::command::{Mutation, WritePlan};
use crate::error::CoreError;
use crate::model::{Category, DeviceRecord, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwitchKind {
    /// Structure-wide lock of IR-controlled unit modes.
    IrLock,
    PuckLock,
    HvacPower,
}

impl SwitchKind {
    /// Attribute the switch reads and writes, with its on/off values.
    fn field(self) -> (&'static str, serde_json::Value, serde_json::Value) {
        match self {
            Self::IrLock => ("hvac-unit-group-lock", true.into(), false.into()),
            Self::PuckLock => ("locked", true.into(), false.into()),
            Self::HvacPower => ("power", "On".into(), "Off".into()),
        }
    }
}

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    out.push(Entity::new(
        structure,
        &structure.record,
        "IR_lock",
        "Lock IR device modes",
        EntityKind::Switch(SwitchKind::IrLock),
    ));

    for puck in structure.pucks.values() {
        out.push(Entity::new(
            structure,
            puck,
            "puck_lock",
            "Lock puck",
            EntityKind::Switch(SwitchKind::PuckLock),
        ));
    }

    for unit in structure.hvac_units.values() {
        let has_scale = unit
            .attributes
            .object("constraints")
            .is_some_and(|c| c.contains_key("temperature-scale"));
        if has_scale {
            out.push(Entity::new(
                structure,
                unit,
                "hvac_power",
                "HVAC power",
                EntityKind::Switch(SwitchKind::HvacPower),
            ));
        }
    }
}

pub(super) fn render(kind: SwitchKind, structure: &Structure, record: &DeviceRecord) -> EntityState {
    let (key, on, _) = kind.field();
    let raw = record.attributes.get(key).filter(|v| !v.is_null());
    let is_on = raw.map(|v| *v == on);

    let available = match kind {
        SwitchKind::IrLock => !structure.hvac_units.is_empty(),
        SwitchKind::PuckLock => !record.is_inactive() && raw.is_some(),
        SwitchKind::HvacPower => {
            let puck_active = structure
                .related(record, "puck", Category::Puck)
                .is_some_and(|puck| !puck.is_inactive());
            puck_active && structure.is_manual()
        }
    };
    EntityState::new(available, StateValue::Switch(SwitchState { is_on }))
}

pub(super) fn plan(
    entity: &Entity,
    kind: SwitchKind,
    record: &DeviceRecord,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    let (key, on, off) = kind.field();
    let value = match action {
        EntityAction::TurnOn => on,
        EntityAction::TurnOff => off,
        _ => return Err(unsupported(entity, action)),
    };
    Ok(WritePlan::new().write(Mutation::new(record.category, &record.id).attribute(key, value)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::super::{discover, find, fixtures, plan, render};
    use super::*;
    use crate::config::UnitSystem;

    fn is_on(state: &EntityState) -> Option<bool> {
        match &state.value {
            StateValue::Switch(s) => s.is_on,
            other => panic!("not a switch: {other:?}"),
        }
    }

    #[test]
    fn ir_lock_needs_hvac_units() {
        let bare = fixtures::snapshot(Structure::new(fixtures::structure_record("auto")));
        let entities = discover(&bare);
        let lock = find(&entities, "s1_IR_lock").unwrap();
        assert!(!render(lock, &bare, UnitSystem::Metric).available);

        let full = fixtures::full("auto");
        let state = render(lock, &full, UnitSystem::Metric);
        assert!(state.available);
        assert_eq!(is_on(&state), Some(false));
    }

    #[test]
    fn puck_lock_writes_and_patches() {
        let snapshot = fixtures::full("auto");
        let entities = discover(&snapshot);
        let lock = find(&entities, "p1_puck_lock").unwrap();

        let plan = plan(lock, &snapshot, UnitSystem::Metric, &EntityAction::TurnOn).unwrap();
        assert_eq!(plan.mutations[0].category, Category::Puck);
        assert_eq!(plan.mutations[0].attributes["locked"], json!(true));
        assert_eq!(plan.patches[0].attributes["locked"], json!(true));
    }

    #[test]
    fn puck_lock_without_value_is_unavailable() {
        let mut structure = Structure::new(fixtures::structure_record("auto"));
        structure.insert(fixtures::puck("p1").with_attribute("locked", serde_json::Value::Null));
        let snapshot = fixtures::snapshot(structure);
        let entities = discover(&snapshot);

        let state = render(find(&entities, "p1_puck_lock").unwrap(), &snapshot, UnitSystem::Metric);
        assert!(!state.available);
        assert_eq!(is_on(&state), None);
    }

    #[test]
    fn hvac_power_only_available_in_manual() {
        let auto = fixtures::full("auto");
        let entities = discover(&auto);
        let power = find(&entities, "h1_hvac_power").unwrap();
        let state = render(power, &auto, UnitSystem::Metric);
        assert!(!state.available);
        assert_eq!(is_on(&state), Some(true));

        let manual = fixtures::full("manual");
        assert!(render(power, &manual, UnitSystem::Metric).available);

        let plan = plan(power, &manual, UnitSystem::Metric, &EntityAction::TurnOff).unwrap();
        assert_eq!(plan.mutations[0].attributes["power"], "Off");
    }

    #[test]
    fn hvac_power_needs_constraint_scale() {
        let mut structure = Structure::new(fixtures::structure_record("manual"));
        structure.insert(
            DeviceRecord::new("h2", Category::HvacUnit).with_attribute("constraints", json!(["POWER"])),
        );
        let entities = discover(&fixtures::snapshot(structure));
        assert!(find(&entities, "h2_hvac_power").is_none());
    }
}
