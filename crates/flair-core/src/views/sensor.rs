// ── Sensors ──
//
// Read-only values from pucks, vents, bridges, rooms and the structure.
// Values measured by a device come from its current reading when the
// API returned one, otherwise from the record itself.

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Entity, EntityKind, EntityState, SensorState, SensorValue, StateValue, capitalize};
use crate::config::UnitSystem;
use crate::model::{Category, DeviceRecord, Structure};
use crate::units::{TemperatureUnit, display_measured, round_to};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorKind {
    HomeAwayHoldUntil,
    HoldUntil,
    Temperature,
    Humidity,
    Light,
    Voltage,
    Rssi,
    Pressure,
    DuctTemperature,
    DuctPressure,
    ReportedState,
    Gateway,
    LastButtonPressed,
}

// ── Discovery ────────────────────────────────────────────────────

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    let sensor = |record: &DeviceRecord, suffix: &str, name: &str, kind: SensorKind| {
        Entity::new(structure, record, suffix, name, EntityKind::Sensor(kind))
    };

    out.push(
        sensor(
            &structure.record,
            "home_away_hold_until",
            "Home/Away holding until",
            SensorKind::HomeAwayHoldUntil,
        )
        .auto_only(structure),
    );

    for puck in structure.pucks.values() {
        out.extend([
            sensor(puck, "temperature", "Temperature", SensorKind::Temperature),
            sensor(puck, "humidity", "Humidity", SensorKind::Humidity),
            sensor(puck, "light", "Light", SensorKind::Light),
            sensor(puck, "voltage", "Voltage", SensorKind::Voltage).diagnostic(),
            sensor(puck, "rssi", "RSSI", SensorKind::Rssi).diagnostic(),
            sensor(puck, "pressure", "Pressure", SensorKind::Pressure),
            sensor(puck, "gateway", "Associated gateway", SensorKind::Gateway).diagnostic(),
        ]);
    }

    for vent in structure.vents.values() {
        out.extend([
            sensor(vent, "duct_temperature", "Duct temperature", SensorKind::DuctTemperature),
            sensor(vent, "duct_pressure", "Duct pressure", SensorKind::DuctPressure),
            sensor(vent, "voltage", "Voltage", SensorKind::Voltage).diagnostic(),
            sensor(vent, "rssi", "RSSI", SensorKind::Rssi).diagnostic(),
            sensor(vent, "reported_state", "Reported state", SensorKind::ReportedState)
                .diagnostic()
                .enabled_by_default(false),
            sensor(vent, "gateway", "Associated gateway", SensorKind::Gateway).diagnostic(),
        ]);
    }

    for room in structure.rooms.values() {
        out.push(
            sensor(room, "hold_until", "Temperature holding until", SensorKind::HoldUntil)
                .auto_only(structure),
        );
    }

    for unit in structure.hvac_units.values() {
        // Only IR units driven by button presses report a constraint list.
        if unit.attributes.list("constraints").is_some() {
            out.push(sensor(
                unit,
                "last_button_pressed",
                "Last button pressed",
                SensorKind::LastButtonPressed,
            ));
        }
    }

    for bridge in structure.bridges.values() {
        out.push(sensor(bridge, "rssi", "RSSI", SensorKind::Rssi).diagnostic());
    }
}

// ── Rendering ────────────────────────────────────────────────────

fn number(value: Option<f64>, unit: &str) -> SensorState {
    SensorState {
        value: value.map(SensorValue::Number),
        unit: Some(unit.to_owned()),
    }
}

fn text(value: Option<String>) -> SensorState {
    SensorState {
        value: value.map(SensorValue::Text),
        unit: None,
    }
}

/// `hold-until` is an ISO-8601 timestamp or null.
fn hold_until(record: &DeviceRecord) -> SensorState {
    let value = record.attributes.str("hold-until").map(|raw| {
        DateTime::parse_from_rfc3339(raw).map_or_else(
            |err| {
                debug!(record = %record.id, raw, error = %err, "unparsed hold-until timestamp");
                SensorValue::Text(raw.to_owned())
            },
            SensorValue::Timestamp,
        )
    });
    SensorState { value, unit: None }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Name of the bridge or puck relaying this device's traffic.
fn gateway_name(structure: &Structure, record: &DeviceRecord) -> Option<String> {
    let gateway_id = record.attributes.str("connected-gateway-id")?;
    if gateway_id == record.id {
        return Some("Self".to_owned());
    }
    let category = match record.attributes.str("connected-gateway-type")? {
        "puck" => Category::Puck,
        "bridge" => Category::Bridge,
        _ => return None,
    };
    structure
        .device(category, gateway_id)
        .map(|gateway| gateway.name().to_owned())
}

fn last_button_pressed(record: &DeviceRecord) -> String {
    record
        .attributes
        .list("button-presses")
        .and_then(|presses| presses.first())
        .and_then(Value::as_str)
        .map_or_else(|| "No button pressed".to_owned(), capitalize)
}

pub(super) fn render(
    kind: SensorKind,
    structure: &Structure,
    record: &DeviceRecord,
    units: UnitSystem,
) -> EntityState {
    let temperature_unit = TemperatureUnit::from(units);
    let reading = |key: &str| {
        record
            .current_reading
            .as_ref()
            .and_then(|r| r.f64(key))
    };

    let state = match kind {
        SensorKind::HomeAwayHoldUntil | SensorKind::HoldUntil => hold_until(record),
        SensorKind::Temperature => number(
            record
                .attributes
                .f64("current-temperature-c")
                .map(|c| display_measured(c, temperature_unit)),
            &temperature_unit.to_string(),
        ),
        SensorKind::DuctTemperature => number(
            record
                .reading_f64("duct-temperature-c")
                .map(|c| display_measured(c, temperature_unit)),
            &temperature_unit.to_string(),
        ),
        SensorKind::Humidity => number(record.attributes.f64("current-humidity"), "%"),
        // Light is a percentage of a 200 lx full scale.
        SensorKind::Light => number(reading("light").map(|v| v * 2.0), "lx"),
        SensorKind::Voltage => number(record.attributes.f64("voltage"), "V"),
        SensorKind::Rssi => number(record.attributes.f64("current-rssi"), "dBm"),
        SensorKind::Pressure => number(
            record.reading_f64("room-pressure").map(|p| round_to(p, 2)),
            "kPa",
        ),
        SensorKind::DuctPressure => number(
            record.reading_f64("duct-pressure").map(|p| round_to(p, 2)),
            "kPa",
        ),
        SensorKind::ReportedState => number(reading("percent-open"), "%"),
        SensorKind::Gateway => text(gateway_name(structure, record)),
        SensorKind::LastButtonPressed => text(Some(last_button_pressed(record))),
    };

    let available = match kind {
        SensorKind::HomeAwayHoldUntil | SensorKind::HoldUntil => {
            is_truthy(record.attributes.get("hold-until"))
        }
        SensorKind::Light => !record.is_inactive() && reading("light").is_some(),
        SensorKind::LastButtonPressed => structure
            .related(record, "puck", Category::Puck)
            .is_some_and(|puck| !puck.is_inactive()),
        _ => !record.is_inactive(),
    };
    EntityState::new(available, StateValue::Sensor(state))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::super::{discover, find, fixtures, render};
    use super::*;
    use crate::model::Relation;

    fn sensor(snapshot: &crate::model::Snapshot, id: &str, units: UnitSystem) -> EntityState {
        let entities = discover(snapshot);
        render(find(&entities, id).unwrap(), snapshot, units)
    }

    fn value(state: &EntityState) -> Option<&SensorValue> {
        match &state.value {
            StateValue::Sensor(s) => s.value.as_ref(),
            other => panic!("not a sensor: {other:?}"),
        }
    }

    #[test]
    fn puck_temperature_follows_units() {
        let snapshot = fixtures::full("auto");
        let metric = sensor(&snapshot, "p1_temperature", UnitSystem::Metric);
        assert_eq!(value(&metric), Some(&SensorValue::Number(20.5)));

        let imperial = sensor(&snapshot, "p1_temperature", UnitSystem::Imperial);
        assert_eq!(value(&imperial), Some(&SensorValue::Number(68.9)));
        let StateValue::Sensor(s) = &imperial.value else { unreachable!() };
        assert_eq!(s.unit.as_deref(), Some("°F"));
    }

    #[test]
    fn light_scales_reading_and_pressure_rounds() {
        let snapshot = fixtures::full("auto");
        let light = sensor(&snapshot, "p1_light", UnitSystem::Metric);
        assert!(light.available);
        assert_eq!(value(&light), Some(&SensorValue::Number(80.0)));

        let pressure = sensor(&snapshot, "p1_pressure", UnitSystem::Metric);
        assert_eq!(value(&pressure), Some(&SensorValue::Number(101.35)));

        let duct = sensor(&snapshot, "v1_duct_pressure", UnitSystem::Metric);
        assert_eq!(value(&duct), Some(&SensorValue::Number(0.12)));
    }

    #[test]
    fn light_without_reading_is_unavailable() {
        let mut puck = fixtures::puck("p1");
        puck.current_reading = None;
        let mut structure = Structure::new(fixtures::structure_record("auto"));
        structure.insert(puck);
        let snapshot = fixtures::snapshot(structure);

        assert!(!sensor(&snapshot, "p1_light", UnitSystem::Metric).available);
    }

    #[test]
    fn gateway_names_self_and_bridge() {
        let snapshot = fixtures::full("auto");
        let puck = sensor(&snapshot, "p1_gateway", UnitSystem::Metric);
        assert_eq!(value(&puck), Some(&SensorValue::Text("Self".into())));

        let vent = sensor(&snapshot, "v1_gateway", UnitSystem::Metric);
        assert_eq!(value(&vent), Some(&SensorValue::Text("Bridge".into())));
    }

    #[test]
    fn hold_until_parses_timestamp_and_tracks_availability() {
        let snapshot = fixtures::full("auto");
        let cleared = sensor(&snapshot, "s1_home_away_hold_until", UnitSystem::Metric);
        assert!(!cleared.available);
        assert_eq!(value(&cleared), None);

        let mut structure = Structure::new(
            fixtures::structure_record("auto").with_attribute("hold-until", "2026-03-01T18:00:00+00:00"),
        );
        structure.insert(fixtures::room("r1"));
        let held = fixtures::snapshot(structure);
        let state = sensor(&held, "s1_home_away_hold_until", UnitSystem::Metric);
        assert!(state.available);
        assert!(matches!(value(&state), Some(SensorValue::Timestamp(_))));
    }

    #[test]
    fn reported_state_is_disabled_by_default() {
        let entities = discover(&fixtures::full("auto"));
        let reported = find(&entities, "v1_reported_state").unwrap();
        assert!(!reported.enabled_by_default);
        assert_eq!(reported.entity_category, Some(super::super::EntityCategory::Diagnostic));
    }

    #[test]
    fn last_button_pressed_for_ir_units() {
        let unit = DeviceRecord::new("h2", Category::HvacUnit)
            .with_attribute("constraints", json!(["POWER", "TEMP UP"]))
            .with_attribute("button-presses", json!(["TEMP UP", "POWER"]))
            .with_relation("puck", Relation::One("p1".into()));
        let mut structure = Structure::new(fixtures::structure_record("auto"));
        structure.insert(fixtures::puck("p1"));
        structure.insert(unit);
        let snapshot = fixtures::snapshot(structure);

        let state = sensor(&snapshot, "h2_last_button_pressed", UnitSystem::Metric);
        assert!(state.available);
        assert_eq!(value(&state), Some(&SensorValue::Text("Temp up".into())));
    }

    #[test]
    fn object_constraints_have_no_button_sensor() {
        let entities = discover(&fixtures::full("auto"));
        assert!(find(&entities, "h1_last_button_pressed").is_none());
    }
}
