// ── Configuration numbers ──
//
// Temperature numbers are shown in the user's units and always stored
// in Celsius. Bounds that depend on a sibling value (away min/max, puck
// lower/upper limit) are recomputed from the record on every render.

use serde::Serialize;

use super::{Entity, EntityAction, EntityKind, EntityState, NumberState, StateValue, check_range, unsupported};
use crate::command::{Mutation, WritePlan};
use crate::config::UnitSystem;
use crate::error::CoreError;
use crate::mapping::{AWAY_MODE, AwayMode, SET_POINT_CONTROLLER, SetPointController};
use crate::model::{DeviceRecord, Structure};
use crate::units::{
    TemperatureUnit, delta_to_celsius, display_delta, display_temperature, per_system,
    to_stored_celsius,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NumberKind {
    AwayMinimum,
    AwayMaximum,
    LowerLimit,
    UpperLimit,
    TemperatureCalibration,
    LedBrightness,
}

/// The offset Flair stores is relative to a 5 °C baseline.
const CALIBRATION_BASELINE_C: f64 = 5.0;

impl NumberKind {
    fn attribute(self) -> &'static str {
        match self {
            Self::AwayMinimum => "temp-away-min-c",
            Self::AwayMaximum => "temp-away-max-c",
            Self::LowerLimit => "setpoint-bound-low",
            Self::UpperLimit => "setpoint-bound-high",
            Self::TemperatureCalibration => "temperature-offset-override-c",
            Self::LedBrightness => "led-brightness",
        }
    }
}

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    let number = |record: &DeviceRecord, suffix: &str, name: &str, kind: NumberKind| {
        Entity::new(structure, record, suffix, name, EntityKind::Number(kind)).config()
    };

    out.push(
        number(&structure.record, "temp_away_min", "Away temperature minimum", NumberKind::AwayMinimum)
            .auto_only(structure),
    );
    out.push(
        number(&structure.record, "temp_away_max", "Away temperature maximum", NumberKind::AwayMaximum)
            .auto_only(structure),
    );

    for puck in structure.pucks.values() {
        out.extend([
            number(puck, "lower_limit", "Set point lower limit", NumberKind::LowerLimit),
            number(puck, "upper_limit", "Set point upper limit", NumberKind::UpperLimit),
            number(
                puck,
                "temp_calibration",
                "Temperature calibration",
                NumberKind::TemperatureCalibration,
            ),
        ]);
    }

    for bridge in structure.bridges.values() {
        out.push(number(bridge, "led", "LED brightness", NumberKind::LedBrightness));
    }
}

/// Current `(min, max, step)` for `kind` on `record`.
fn bounds(kind: NumberKind, record: &DeviceRecord, units: UnitSystem) -> (f64, f64, f64) {
    let shown = |key: &str, shift: f64, fallback: f64| {
        record
            .attributes
            .f64(key)
            .map_or(fallback, |c| display_temperature(c + shift, units))
    };
    match kind {
        NumberKind::AwayMinimum => {
            let min = per_system(units, 10.0, 50.0);
            let max_default = per_system(units, 32.2, 90.0);
            (min, shown("temp-away-max-c", -3.0, max_default), 1.0)
        }
        NumberKind::AwayMaximum => {
            let min_default = per_system(units, 10.0, 50.0);
            (shown("temp-away-min-c", 3.0, min_default), per_system(units, 32.2, 90.0), 1.0)
        }
        NumberKind::LowerLimit => {
            let max_default = per_system(units, 32.23, 90.0);
            (
                per_system(units, 10.0, 50.0),
                shown("setpoint-bound-high", 0.0, max_default),
                per_system(units, 0.5, 1.0),
            )
        }
        NumberKind::UpperLimit => {
            let min_default = per_system(units, 10.0, 50.0);
            (
                shown("setpoint-bound-low", 0.0, min_default),
                per_system(units, 32.23, 90.0),
                per_system(units, 0.5, 1.0),
            )
        }
        NumberKind::TemperatureCalibration => (
            per_system(units, -10.0, -18.0),
            per_system(units, 5.0, 9.0),
            per_system(units, 0.5, 1.0),
        ),
        NumberKind::LedBrightness => (20.0, 100.0, 1.0),
    }
}

fn away_settings_editable(structure: &Structure) -> bool {
    let attrs = &structure.record.attributes;
    attrs.str("set-point-mode") == SET_POINT_CONTROLLER.to_vendor(SetPointController::FlairApp)
        && attrs.str("structure-away-mode") == AWAY_MODE.to_vendor(AwayMode::SmartAway)
        && attrs.str("mode") == Some("auto")
}

pub(super) fn render(
    kind: NumberKind,
    structure: &Structure,
    record: &DeviceRecord,
    units: UnitSystem,
) -> EntityState {
    let raw = record.attributes.f64(kind.attribute());
    let (value, unit) = match kind {
        NumberKind::TemperatureCalibration => (
            raw.map(|offset| display_delta(offset + CALIBRATION_BASELINE_C, units)),
            Some(TemperatureUnit::from(units).to_string()),
        ),
        NumberKind::LedBrightness => (raw, Some("%".to_owned())),
        _ => (
            raw.map(|c| display_temperature(c, units)),
            Some(TemperatureUnit::from(units).to_string()),
        ),
    };
    let (min, max, step) = bounds(kind, record, units);

    let available = match kind {
        NumberKind::AwayMinimum | NumberKind::AwayMaximum => away_settings_editable(structure),
        NumberKind::TemperatureCalibration => !record.is_inactive() && raw.is_some(),
        _ => !record.is_inactive(),
    };
    EntityState::new(
        available,
        StateValue::Number(NumberState { value, min, max, step, unit }),
    )
}

pub(super) fn plan(
    entity: &Entity,
    kind: NumberKind,
    record: &DeviceRecord,
    units: UnitSystem,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    let EntityAction::SetValue(value) = action else {
        return Err(unsupported(entity, action));
    };
    let (min, max, _) = bounds(kind, record, units);
    check_range(entity, *value, min, max)?;

    let stored = match kind {
        NumberKind::TemperatureCalibration => delta_to_celsius(*value, units) - CALIBRATION_BASELINE_C,
        NumberKind::LedBrightness => value.round(),
        _ => to_stored_celsius(*value, units),
    };
    Ok(WritePlan::new().write(
        Mutation::new(record.category, &record.id).attribute(kind.attribute(), stored),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::super::{discover, find, fixtures, plan, render};
    use super::*;
    use crate::model::Snapshot;

    fn number_state(snapshot: &Snapshot, id: &str, units: UnitSystem) -> (bool, NumberState) {
        let entities = discover(snapshot);
        let state = render(find(&entities, id).unwrap(), snapshot, units);
        match state.value {
            StateValue::Number(n) => (state.available, n),
            other => panic!("not a number: {other:?}"),
        }
    }

    fn set(snapshot: &Snapshot, id: &str, units: UnitSystem, value: f64) -> Result<WritePlan, CoreError> {
        let entities = discover(snapshot);
        plan(find(&entities, id).unwrap(), snapshot, units, &EntityAction::SetValue(value))
    }

    #[test]
    fn away_bounds_keep_three_degrees_apart() {
        let snapshot = fixtures::full("auto");
        let (available, min) = number_state(&snapshot, "s1_temp_away_min", UnitSystem::Metric);
        assert!(available);
        assert_eq!((min.value, min.min, min.max), (Some(15.0), 10.0, 24.0));

        let (_, max) = number_state(&snapshot, "s1_temp_away_max", UnitSystem::Metric);
        assert_eq!((max.value, max.min, max.max), (Some(27.0), 18.0, 32.2));
    }

    #[test]
    fn away_numbers_need_smart_away_and_flair_control() {
        let mut structure = Structure::new(
            fixtures::structure_record("auto").with_attribute("structure-away-mode", "Off Only"),
        );
        structure.insert(fixtures::room("r1"));
        let snapshot = fixtures::snapshot(structure);
        assert!(!number_state(&snapshot, "s1_temp_away_min", UnitSystem::Metric).0);

        assert!(!number_state(&fixtures::full("manual"), "s1_temp_away_max", UnitSystem::Metric).0);
    }

    #[test]
    fn away_minimum_rejects_values_past_maximum() {
        let err = set(&fixtures::full("auto"), "s1_temp_away_min", UnitSystem::Metric, 26.0).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[test]
    fn imperial_writes_convert_to_celsius() {
        let plan = set(&fixtures::full("auto"), "p1_lower_limit", UnitSystem::Imperial, 60.0).unwrap();
        assert_eq!(plan.mutations[0].attributes["setpoint-bound-low"], json!(15.56));
    }

    #[test]
    fn calibration_is_shown_against_five_degree_baseline() {
        let snapshot = fixtures::full("auto");
        let (available, metric) = number_state(&snapshot, "p1_temp_calibration", UnitSystem::Metric);
        assert!(available);
        assert_eq!(metric.value, Some(3.0));
        assert_eq!((metric.min, metric.max, metric.step), (-10.0, 5.0, 0.5));

        let (_, imperial) = number_state(&snapshot, "p1_temp_calibration", UnitSystem::Imperial);
        assert_eq!(imperial.value, Some(5.0));
        assert_eq!((imperial.min, imperial.max), (-18.0, 9.0));
    }

    #[test]
    fn calibration_writes_remove_baseline() {
        let snapshot = fixtures::full("auto");
        let metric = set(&snapshot, "p1_temp_calibration", UnitSystem::Metric, 1.5).unwrap();
        assert_eq!(metric.mutations[0].attributes["temperature-offset-override-c"], json!(-3.5));

        let imperial = set(&snapshot, "p1_temp_calibration", UnitSystem::Imperial, 9.0).unwrap();
        let stored = imperial.mutations[0].attributes["temperature-offset-override-c"]
            .as_f64()
            .unwrap();
        assert!(stored.abs() < 1e-9);
    }

    #[test]
    fn led_brightness_range() {
        let snapshot = fixtures::full("auto");
        let (available, led) = number_state(&snapshot, "b1_led", UnitSystem::Metric);
        assert!(available);
        assert_eq!((led.value, led.min, led.max), (Some(60.0), 20.0, 100.0));

        assert!(set(&snapshot, "b1_led", UnitSystem::Metric, 10.0).is_err());
        let plan = set(&snapshot, "b1_led", UnitSystem::Metric, 80.0).unwrap();
        assert_eq!(plan.mutations[0].attributes["led-brightness"], json!(80.0));
    }
}
