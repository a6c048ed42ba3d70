// ── Buttons ──

use serde::Serialize;
use serde_json::{Value, json};

use super::{Entity, EntityAction, EntityKind, EntityState, StateValue, capitalize, unsupported};
use crate::command::{Mutation, WritePlan};
use crate::error::CoreError;
use crate::model::{Category, DeviceRecord, Structure};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    HomeAwayClearHold,
    HomeAwayReverse,
    ClearHold,
    /// Replays one IR command from an HVAC unit's constraint list.
    HvacConstraint(String),
}

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    let record = &structure.record;
    out.push(
        Entity::new(
            structure,
            record,
            "home_away_clear_hold",
            "Clear home/away hold",
            EntityKind::Button(ButtonKind::HomeAwayClearHold),
        )
        .auto_only(structure),
    );
    out.push(
        Entity::new(
            structure,
            record,
            "home_away_reverse",
            "Reverse home/away hold",
            EntityKind::Button(ButtonKind::HomeAwayReverse),
        )
        .auto_only(structure),
    );

    for room in structure.rooms.values() {
        out.push(
            Entity::new(
                structure,
                room,
                "clear_hold",
                "Clear hold",
                EntityKind::Button(ButtonKind::ClearHold),
            )
            .auto_only(structure),
        );
    }

    for unit in structure.hvac_units.values() {
        let Some(constraints) = unit.attributes.list("constraints") else {
            continue;
        };
        for constraint in constraints.iter().filter_map(Value::as_str) {
            out.push(Entity::new(
                structure,
                unit,
                constraint,
                capitalize(constraint),
                EntityKind::Button(ButtonKind::HvacConstraint(constraint.to_owned())),
            ));
        }
    }
}

pub(super) fn render(kind: &ButtonKind, structure: &Structure, record: &DeviceRecord) -> EntityState {
    let available = match kind {
        ButtonKind::HomeAwayClearHold | ButtonKind::HomeAwayReverse | ButtonKind::ClearHold => {
            !structure.is_manual()
        }
        ButtonKind::HvacConstraint(_) => structure
            .related(record, "puck", Category::Puck)
            .is_some_and(|puck| !puck.is_inactive()),
    };
    EntityState::new(available, StateValue::Button)
}

pub(super) fn plan(
    entity: &Entity,
    kind: &ButtonKind,
    record: &DeviceRecord,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    if !matches!(action, EntityAction::Press) {
        return Err(unsupported(entity, action));
    }
    let mutation = || Mutation::new(record.category, &record.id);

    let plan = match kind {
        ButtonKind::HomeAwayClearHold => {
            WritePlan::new().write(mutation().attribute("hold-until", Value::Null))
        }
        ButtonKind::HomeAwayReverse => {
            let home = record.attributes.bool("home").ok_or_else(|| {
                CoreError::rejected(format!("{} has no home/away state to reverse", record.name()))
            })?;
            WritePlan::new()
                .write(mutation().attribute("home", !home))
                .write(mutation().attribute("hold-until", Value::Null))
        }
        ButtonKind::ClearHold => WritePlan::new().write(
            mutation()
                .attribute("hold-until", Value::Null)
                .attribute("hold-until-schedule-event", false),
        ),
        ButtonKind::HvacConstraint(constraint) => {
            WritePlan::new().send(mutation().attribute("button-presses", json!([constraint])))
        }
    };
    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{discover, find, fixtures, plan, render};
    use super::*;
    use crate::config::UnitSystem;
    use crate::model::{Relation, Snapshot};

    fn press(snapshot: &Snapshot, id: &str) -> Result<WritePlan, CoreError> {
        let entities = discover(snapshot);
        plan(find(&entities, id).unwrap(), snapshot, UnitSystem::Metric, &EntityAction::Press)
    }

    fn ir_snapshot() -> Snapshot {
        let mut structure = Structure::new(fixtures::structure_record("auto"));
        structure.insert(fixtures::puck("p1"));
        structure.insert(
            DeviceRecord::new("h2", Category::HvacUnit)
                .with_attribute("name", "Window Unit")
                .with_attribute("constraints", json!(["POWER", "TEMP UP"]))
                .with_relation("puck", Relation::One("p1".into())),
        );
        fixtures::snapshot(structure)
    }

    #[test]
    fn reverse_toggles_home_and_clears_hold() {
        let plan = press(&fixtures::full("auto"), "s1_home_away_reverse").unwrap();
        assert_eq!(plan.mutations.len(), 2);
        assert_eq!(plan.mutations[0].attributes["home"], json!(false));
        assert_eq!(plan.mutations[1].attributes["hold-until"], Value::Null);
    }

    #[test]
    fn room_clear_hold_resets_schedule_flag() {
        let plan = press(&fixtures::full("auto"), "r1_clear_hold").unwrap();
        let m = &plan.mutations[0];
        assert_eq!(m.category, Category::Room);
        assert_eq!(m.attributes["hold-until"], Value::Null);
        assert_eq!(m.attributes["hold-until-schedule-event"], json!(false));
    }

    #[test]
    fn hold_buttons_unavailable_in_manual() {
        let snapshot = fixtures::full("manual");
        let entities = discover(&snapshot);
        let button = find(&entities, "s1_home_away_clear_hold").unwrap();
        assert!(!button.enabled_by_default);
        assert!(!render(button, &snapshot, UnitSystem::Metric).available);
    }

    #[test]
    fn constraint_buttons_send_without_patching() {
        let snapshot = ir_snapshot();
        let entities = discover(&snapshot);
        let power = find(&entities, "h2_POWER").unwrap();
        assert_eq!(power.name, "Power");
        assert_eq!(find(&entities, "h2_TEMP UP").unwrap().name, "Temp up");
        assert!(render(power, &snapshot, UnitSystem::Metric).available);

        let plan = press(&snapshot, "h2_TEMP UP").unwrap();
        assert_eq!(plan.mutations[0].attributes["button-presses"], json!(["TEMP UP"]));
        assert!(plan.patches.is_empty());
    }

    #[test]
    fn buttons_only_press() {
        let snapshot = fixtures::full("auto");
        let entities = discover(&snapshot);
        let button = find(&entities, "r1_clear_hold").unwrap();
        assert!(plan(button, &snapshot, UnitSystem::Metric, &EntityAction::TurnOn).is_err());
    }
}
