// ── Selects ──
//
// Structure settings with a fixed option set, the active schedule, and
// per-room activity. Options are the human labels; writes translate
// them back to the vendor strings.

use std::fmt;

use serde::Serialize;

use super::{
    Entity, EntityAction, EntityKind, EntityState, SelectState, StateValue, bool_label, lookup,
    parse_option, unsupported,
};
use crate::command::{LocalPatch, Mutation, WritePlan};
use crate::error::CoreError;
use crate::mapping::{
    AWAY_MODE, BiMap, HOLD_DURATION, HOME_AWAY_SET_BY, SET_POINT_CONTROLLER, SYSTEM_MODE,
    TEMPERATURE_SCALE,
};
use crate::model::{Category, DeviceRecord, Relation, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectKind {
    StructureMode,
    SystemMode,
    HomeAwayMode,
    Schedule,
    SetPointController,
    AwayMode,
    DefaultHoldDuration,
    HomeAwaySetBy,
    TemperatureScale,
    RoomActivity,
}

/// Structure heat/cool mode labels. `float` is shown as Off.
const STRUCTURE_MODE_OPTIONS: [(&str, &str); 4] = [
    ("Heat", "heat"),
    ("Cool", "cool"),
    ("Auto", "auto"),
    ("Off", "float"),
];

const NO_SCHEDULE: &str = "No Schedule";

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    let record = &structure.record;
    let select = |suffix: &str, name: &str, kind: SelectKind| {
        Entity::new(structure, record, suffix, name, EntityKind::Select(kind))
    };

    out.extend([
        select("mode", "Structure mode", SelectKind::StructureMode),
        select("system_mode", "System mode", SelectKind::SystemMode),
        select("home_away_mode", "Home/Away", SelectKind::HomeAwayMode),
        select("schedules", "Schedule", SelectKind::Schedule),
        select("set_point_controller", "Set point controller", SelectKind::SetPointController)
            .config(),
        select("away_mode", "Away mode", SelectKind::AwayMode).config(),
        select("default_hold_duration", "Default hold duration", SelectKind::DefaultHoldDuration)
            .config(),
        select("home_away_set_by", "Home/Away set by", SelectKind::HomeAwaySetBy).config(),
        select("temperature_scale", "Temperature scale", SelectKind::TemperatureScale).config(),
    ]);

    for room in structure.rooms.values() {
        out.push(Entity::new(
            structure,
            room,
            "activity",
            "Activity status",
            EntityKind::Select(SelectKind::RoomActivity),
        ));
    }
}

// ── Rendering ────────────────────────────────────────────────────

fn table_state<T: Copy + PartialEq + fmt::Display>(table: &BiMap<T>, raw: Option<&str>) -> SelectState {
    SelectState {
        current: raw.map(|raw| lookup(table, raw).to_string()),
        options: table.hosts().map(|h| h.to_string()).collect(),
    }
}

fn labels(options: &[&str]) -> Vec<String> {
    options.iter().map(|&o| o.to_owned()).collect()
}

fn schedule_state(structure: &Structure) -> SelectState {
    let current = match structure.record.related_id("active-schedule") {
        None => NO_SCHEDULE.to_owned(),
        Some(id) => structure
            .device(Category::Schedule, id)
            .map_or_else(|| id.to_owned(), |s| s.name().to_owned()),
    };
    let options = std::iter::once(NO_SCHEDULE.to_owned())
        .chain(structure.schedules.values().map(|s| s.name().to_owned()))
        .collect();
    SelectState {
        current: Some(current),
        options,
    }
}

pub(super) fn render(kind: SelectKind, structure: &Structure, record: &DeviceRecord) -> EntityState {
    let attrs = &record.attributes;
    let state = match kind {
        SelectKind::StructureMode => SelectState {
            current: attrs.str("structure-heat-cool-mode").map(|raw| {
                STRUCTURE_MODE_OPTIONS
                    .iter()
                    .find(|(_, vendor)| *vendor == raw)
                    .map_or_else(|| raw.to_owned(), |(label, _)| (*label).to_owned())
            }),
            options: labels(&STRUCTURE_MODE_OPTIONS.map(|(label, _)| label)),
        },
        SelectKind::SystemMode => table_state(&SYSTEM_MODE, attrs.str("mode")),
        SelectKind::HomeAwayMode => SelectState {
            current: bool_label(attrs.bool("home"), "Home", "Away"),
            options: labels(&["Home", "Away"]),
        },
        SelectKind::Schedule => schedule_state(structure),
        SelectKind::SetPointController => {
            table_state(&SET_POINT_CONTROLLER, attrs.str("set-point-mode"))
        }
        SelectKind::AwayMode => table_state(&AWAY_MODE, attrs.str("structure-away-mode")),
        SelectKind::DefaultHoldDuration => {
            table_state(&HOLD_DURATION, attrs.str("default-hold-duration"))
        }
        SelectKind::HomeAwaySetBy => table_state(&HOME_AWAY_SET_BY, attrs.str("home-away-mode")),
        SelectKind::TemperatureScale => {
            table_state(&TEMPERATURE_SCALE, attrs.str("temperature-scale"))
        }
        SelectKind::RoomActivity => SelectState {
            current: bool_label(attrs.bool("active"), "Active", "Inactive"),
            options: labels(&["Active", "Inactive"]),
        },
    };

    let available = match kind {
        SelectKind::Schedule => !structure.schedules.is_empty(),
        _ => state.current.is_some(),
    };
    EntityState::new(available, StateValue::Select(state))
}

// ── Write planning ───────────────────────────────────────────────

/// Vendor string for `option` in `table`.
fn table_vendor<T: Copy + PartialEq + fmt::Display>(table: &BiMap<T>, option: &str) -> Option<&'static str> {
    parse_option(table.hosts(), option).and_then(|host| table.to_vendor(host))
}

fn invalid_option(entity: &Entity, option: &str) -> CoreError {
    CoreError::invalid(format!("'{option}' is not an option of {}", entity.unique_id))
}

pub(super) fn plan(
    entity: &Entity,
    kind: SelectKind,
    structure: &Structure,
    record: &DeviceRecord,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    let EntityAction::SelectOption(option) = action else {
        return Err(unsupported(entity, action));
    };
    let option = option.as_str();
    let mutation = Mutation::new(record.category, &record.id);

    let (key, value): (&str, serde_json::Value) = match kind {
        SelectKind::StructureMode => {
            let vendor = STRUCTURE_MODE_OPTIONS
                .iter()
                .find(|(label, _)| *label == option)
                .map(|(_, vendor)| *vendor)
                .ok_or_else(|| invalid_option(entity, option))?;
            ("structure-heat-cool-mode", vendor.into())
        }
        SelectKind::HomeAwayMode => match option {
            "Home" => ("home", true.into()),
            "Away" => ("home", false.into()),
            _ => return Err(invalid_option(entity, option)),
        },
        SelectKind::RoomActivity => match option {
            "Active" => ("active", true.into()),
            "Inactive" => ("active", false.into()),
            _ => return Err(invalid_option(entity, option)),
        },
        SelectKind::Schedule => return plan_schedule(entity, structure, option),
        SelectKind::SystemMode => table_write(entity, &SYSTEM_MODE, "mode", option)?,
        SelectKind::SetPointController => {
            table_write(entity, &SET_POINT_CONTROLLER, "set-point-mode", option)?
        }
        SelectKind::AwayMode => table_write(entity, &AWAY_MODE, "structure-away-mode", option)?,
        SelectKind::DefaultHoldDuration => {
            table_write(entity, &HOLD_DURATION, "default-hold-duration", option)?
        }
        SelectKind::HomeAwaySetBy => {
            table_write(entity, &HOME_AWAY_SET_BY, "home-away-mode", option)?
        }
        SelectKind::TemperatureScale => {
            table_write(entity, &TEMPERATURE_SCALE, "temperature-scale", option)?
        }
    };
    Ok(WritePlan::new().write(mutation.attribute(key, value)))
}

fn table_write<'k, T: Copy + PartialEq + fmt::Display>(
    entity: &Entity,
    table: &BiMap<T>,
    key: &'k str,
    option: &str,
) -> Result<(&'k str, serde_json::Value), CoreError> {
    let vendor = table_vendor(table, option).ok_or_else(|| invalid_option(entity, option))?;
    Ok((key, vendor.into()))
}

fn plan_schedule(entity: &Entity, structure: &Structure, option: &str) -> Result<WritePlan, CoreError> {
    let target = if option == NO_SCHEDULE {
        None
    } else {
        let schedule = structure
            .schedules
            .values()
            .find(|s| s.name() == option)
            .ok_or_else(|| invalid_option(entity, option))?;
        Some(schedule.id.as_str())
    };

    let relation = target.map_or(Relation::Empty, |id| Relation::One(id.to_owned()));
    Ok(WritePlan::new()
        .send(
            Mutation::new(Category::Structure, structure.id())
                .relation("active-schedule", target.map(|id| (Category::Schedule, id))),
        )
        .patch(LocalPatch::new(Category::Structure, structure.id()).relation("active-schedule", relation)))
}
