// ── Climate views ──
//
// Three thermostats: the structure-wide set point, one per room, and one
// per split unit that reports a constraint table. HVAC writes differ by
// structure mode: in auto the unit follows its room, in manual the unit
// is driven directly.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ClimateFeatures, ClimateState, Entity, EntityAction, EntityKind, EntityState, StateValue,
    check_finite, check_range, lookup, unsupported,
};
use crate::command::{LocalPatch, Mutation, WritePlan};
use crate::config::UnitSystem;
use crate::error::CoreError;
use crate::mapping::{
    CONSTRAINT_FAN_SPEED, FAN_SPEED, FanMode, HVAC_CONSTRAINT_MODE, HVAC_UNIT_MODE, HvacAction,
    HvacMode, Mapped, SET_POINT_CONTROLLER, STRUCTURE_HEAT_COOL, SWING, SetPointController,
    SwingMode, TEMPERATURE_SCALE, TemperatureScale,
};
use crate::model::{Category, DeviceRecord, Structure};
use crate::units::{TemperatureUnit, display_measured, display_temperature, per_system, to_stored_celsius};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClimateKind {
    Structure,
    Room,
    HvacUnit,
}

const STRUCTURE_MODES: [HvacMode; 4] = [
    HvacMode::Off,
    HvacMode::Cool,
    HvacMode::Heat,
    HvacMode::HeatCool,
];

fn set_point_bounds(units: UnitSystem) -> (f64, f64, f64) {
    (
        per_system(units, 10.0, 50.0),
        per_system(units, 32.23, 90.0),
        per_system(units, 0.5, 1.0),
    )
}

// ── Discovery ────────────────────────────────────────────────────

pub(super) fn discover(structure: &Structure, out: &mut Vec<Entity>) {
    out.push(
        Entity::new(
            structure,
            &structure.record,
            "climate",
            "Structure",
            EntityKind::Climate(ClimateKind::Structure),
        )
        .auto_only(structure),
    );

    for room in structure.rooms.values() {
        out.push(
            Entity::new(structure, room, "room", "Room", EntityKind::Climate(ClimateKind::Room))
                .auto_only(structure),
        );
    }

    for unit in structure.hvac_units.values() {
        // Button-only units report a list of constraints instead.
        if unit.attributes.object("constraints").is_none() {
            continue;
        }
        if hvac_temperature_unit(unit).is_none() {
            warn!(
                hvac_unit = unit.name(),
                "HVAC unit has no temperature scale; contact Flair support to get this fixed"
            );
            continue;
        }
        out.push(Entity::new(
            structure,
            unit,
            "hvac_unit",
            "HVAC unit",
            EntityKind::Climate(ClimateKind::HvacUnit),
        ));
    }
}

/// Unit an HVAC unit reports temperatures in, read from its constraints
/// or its first codeset. `None` when neither carries a scale.
pub(crate) fn hvac_temperature_unit(record: &DeviceRecord) -> Option<TemperatureUnit> {
    let constraints = record.attributes.object("constraints")?;
    let scale = match constraints.get("temperature-scale") {
        Some(scale) => scale,
        None => record
            .attributes
            .list("codesets")
            .and_then(|codesets| codesets.first())
            .and_then(|codeset| codeset.get("temperature-scale"))?,
    };
    let fahrenheit = scale
        .as_str()
        .is_some_and(|s| TEMPERATURE_SCALE.to_host(s) == Mapped::Known(TemperatureScale::Fahrenheit));
    Some(if fahrenheit {
        TemperatureUnit::Fahrenheit
    } else {
        TemperatureUnit::Celsius
    })
}

// ── Rendering ────────────────────────────────────────────────────

pub(super) fn render(
    kind: ClimateKind,
    structure: &Structure,
    record: &DeviceRecord,
    units: UnitSystem,
) -> EntityState {
    match kind {
        ClimateKind::Structure => render_structure(structure, units),
        ClimateKind::Room => render_room(structure, record),
        ClimateKind::HvacUnit => match HvacUnit::new(structure, record) {
            Some(unit) => unit.render(),
            None => EntityState::missing(),
        },
    }
}

fn structure_mode(structure: &Structure) -> Option<Mapped<HvacMode>> {
    structure
        .record
        .attributes
        .str("structure-heat-cool-mode")
        .map(|mode| lookup(&STRUCTURE_HEAT_COOL, mode))
}

fn render_structure(structure: &Structure, units: UnitSystem) -> EntityState {
    let (min, max, step) = set_point_bounds(units);
    let state = ClimateState {
        hvac_mode: structure_mode(structure),
        hvac_modes: STRUCTURE_MODES.to_vec(),
        hvac_action: None,
        current_temperature: None,
        target_temperature: structure
            .record
            .attributes
            .f64("set-point-temperature-c")
            .map(|c| display_temperature(c, units)),
        current_humidity: None,
        min_temp: Some(min),
        max_temp: Some(max),
        step: Some(step),
        unit: units.into(),
        fan_mode: None,
        fan_modes: Vec::new(),
        swing_mode: None,
        swing_modes: Vec::new(),
        features: ClimateFeatures {
            target_temperature: true,
            turn_off: true,
            ..ClimateFeatures::default()
        },
    };
    EntityState::new(!structure.is_manual(), StateValue::Climate(state))
}

fn render_room(structure: &Structure, room: &DeviceRecord) -> EntityState {
    let current = room.attributes.f64("current-temperature-c");
    let state = ClimateState {
        hvac_mode: structure_mode(structure),
        hvac_modes: STRUCTURE_MODES.to_vec(),
        hvac_action: None,
        current_temperature: current,
        target_temperature: room.attributes.f64("set-point-c"),
        current_humidity: room.attributes.f64("current-humidity"),
        min_temp: None,
        max_temp: None,
        step: None,
        unit: TemperatureUnit::Celsius,
        fan_mode: None,
        fan_modes: Vec::new(),
        swing_mode: None,
        swing_modes: Vec::new(),
        features: ClimateFeatures {
            target_temperature: true,
            turn_off: true,
            ..ClimateFeatures::default()
        },
    };
    let available = !structure.is_manual() && current.is_some();
    EntityState::new(available, StateValue::Climate(state))
}

// ── Write planning ───────────────────────────────────────────────

pub(super) fn plan(
    entity: &Entity,
    kind: ClimateKind,
    structure: &Structure,
    record: &DeviceRecord,
    units: UnitSystem,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    match kind {
        ClimateKind::Structure => plan_structure(entity, structure, units, action),
        ClimateKind::Room => plan_room(entity, structure, record, action),
        ClimateKind::HvacUnit => HvacUnit::new(structure, record)
            .ok_or_else(|| CoreError::not_found("hvac unit", &record.id))?
            .plan(entity, action),
    }
}

fn structure_heat_cool(structure: &Structure, mode: HvacMode) -> Result<WritePlan, CoreError> {
    let vendor = STRUCTURE_HEAT_COOL
        .to_vendor(mode)
        .ok_or_else(|| CoreError::invalid(format!("structures do not support the {mode} mode")))?;
    Ok(WritePlan::new().write(
        Mutation::new(Category::Structure, structure.id())
            .attribute("structure-heat-cool-mode", vendor),
    ))
}

fn plan_structure(
    entity: &Entity,
    structure: &Structure,
    units: UnitSystem,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    match action {
        EntityAction::TurnOff => structure_heat_cool(structure, HvacMode::Off),
        EntityAction::SetHvacMode(mode) => structure_heat_cool(structure, *mode),
        EntityAction::SetTemperature(value) => {
            let controller = structure.record.attributes.str("set-point-mode");
            if controller == SET_POINT_CONTROLLER.to_vendor(SetPointController::Thermostat) {
                return Err(CoreError::rejected(format!(
                    "target temperature for structure {} can only be set when the set point controller is {}",
                    structure.name(),
                    SetPointController::FlairApp
                )));
            }
            let (min, max, _) = set_point_bounds(units);
            check_range(entity, *value, min, max)?;
            Ok(WritePlan::new().write(
                Mutation::new(Category::Structure, structure.id())
                    .attribute("set-point-temperature-c", to_stored_celsius(*value, units)),
            ))
        }
        _ => Err(unsupported(entity, action)),
    }
}

fn plan_room(
    entity: &Entity,
    structure: &Structure,
    room: &DeviceRecord,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    match action {
        EntityAction::TurnOff => structure_heat_cool(structure, HvacMode::Off),
        EntityAction::SetHvacMode(mode) => structure_heat_cool(structure, *mode),
        EntityAction::SetTemperature(value) => {
            check_finite(entity, *value)?;
            Ok(WritePlan::new().write(
                Mutation::new(Category::Room, &room.id)
                    .attribute("set-point-c", *value)
                    .attribute("active", true),
            ))
        }
        _ => Err(unsupported(entity, action)),
    }
}

// ── HVAC units ───────────────────────────────────────────────────

struct HvacUnit<'a> {
    structure: &'a Structure,
    record: &'a DeviceRecord,
    unit: TemperatureUnit,
}

impl<'a> HvacUnit<'a> {
    fn new(structure: &'a Structure, record: &'a DeviceRecord) -> Option<Self> {
        Some(Self {
            structure,
            record,
            unit: hvac_temperature_unit(record)?,
        })
    }

    fn is_on(&self) -> bool {
        self.record.attributes.str("power") == Some("On")
    }

    fn is_manual(&self) -> bool {
        self.structure.is_manual()
    }

    fn room(&self) -> Option<&'a DeviceRecord> {
        self.structure.related(self.record, "room", Category::Room)
    }

    fn puck(&self) -> Option<&'a DeviceRecord> {
        self.structure.related(self.record, "puck", Category::Puck)
    }

    fn fan_speed(&self) -> Option<&'a str> {
        self.record.attributes.str("fan-speed")
    }

    /// Units without swing report `"swing": null`.
    fn swing_available(&self) -> bool {
        self.record.attributes.get("swing").is_some()
    }

    /// `constraints.ON`: vendor mode → fan speed tables.
    fn constrained_modes(&self) -> Option<&'a serde_json::Map<String, Value>> {
        self.record
            .attributes
            .object("constraints")
            .and_then(|c| c.get("ON"))
            .and_then(Value::as_object)
    }

    /// Fan speeds allowed in `vendor_mode`, from its `ON` table when present.
    fn fan_speeds_for(&self, vendor_mode: &str) -> Vec<FanMode> {
        let Some(entry) = self
            .constrained_modes()
            .and_then(|modes| modes.get(vendor_mode))
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };
        let table = if entry.contains_key("ON") {
            entry.get("ON")
        } else {
            entry.get("OFF")
        };
        table
            .and_then(Value::as_object)
            .map(|speeds| {
                speeds
                    .keys()
                    .filter_map(|key| lookup(&CONSTRAINT_FAN_SPEED, key).known())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn fan_modes(&self) -> Vec<FanMode> {
        match self.record.attributes.str("mode") {
            Some(mode) => self.fan_speeds_for(&mode.to_uppercase()),
            None => Vec::new(),
        }
    }

    fn hvac_mode(&self) -> Option<Mapped<HvacMode>> {
        // A powered-off unit under manual control always reads Off.
        if !self.is_on() && self.is_manual() {
            return Some(Mapped::Known(HvacMode::Off));
        }
        self.record
            .attributes
            .str("mode")
            .map(|mode| lookup(&HVAC_UNIT_MODE, mode))
    }

    fn hvac_modes(&self) -> Vec<HvacMode> {
        if !self.is_manual() {
            // Flair owns the mode in auto; only the current one is offered.
            return self
                .record
                .attributes
                .str("mode")
                .and_then(|mode| HVAC_UNIT_MODE.to_host(mode).known())
                .into_iter()
                .collect();
        }
        let mut modes = vec![HvacMode::Off];
        if let Some(constrained) = self.constrained_modes() {
            modes.extend(
                constrained
                    .keys()
                    .filter_map(|key| lookup(&HVAC_CONSTRAINT_MODE, key).known()),
            );
        }
        modes
    }

    fn hvac_action(&self) -> Option<HvacAction> {
        if !self.is_on() {
            return Some(HvacAction::Off);
        }
        self.hvac_mode()
            .and_then(|mode| mode.known())
            .and_then(HvacAction::for_mode)
    }

    fn features(&self, fans: bool) -> ClimateFeatures {
        let swing = self.swing_available();
        if !swing && !fans {
            return ClimateFeatures::default();
        }
        let no_target = matches!(
            self.hvac_mode().and_then(|m| m.known()),
            Some(HvacMode::Dry | HvacMode::FanOnly)
        );

        match (self.is_manual(), self.is_on()) {
            (true, true) => ClimateFeatures {
                target_temperature: !no_target,
                fan_mode: fans,
                swing_mode: swing,
                turn_on: true,
                turn_off: true,
            },
            (true, false) => ClimateFeatures {
                target_temperature: true,
                turn_on: true,
                ..ClimateFeatures::default()
            },
            (false, true) => ClimateFeatures {
                target_temperature: !no_target,
                fan_mode: fans,
                swing_mode: swing,
                ..ClimateFeatures::default()
            },
            (false, false) if swing && fans => ClimateFeatures {
                target_temperature: true,
                fan_mode: true,
                swing_mode: true,
                ..ClimateFeatures::default()
            },
            (false, false) => ClimateFeatures::default(),
        }
    }

    fn available(&self) -> bool {
        self.puck().is_some_and(|puck| !puck.is_inactive())
    }

    fn render(&self) -> EntityState {
        let room = self.room();
        let fan_modes = self.fan_modes();
        let swing = self.swing_available();
        let state = ClimateState {
            hvac_mode: self.hvac_mode(),
            hvac_modes: self.hvac_modes(),
            hvac_action: self.hvac_action(),
            current_temperature: room
                .and_then(|r| r.attributes.f64("current-temperature-c"))
                .map(|c| display_measured(c, self.unit)),
            target_temperature: self.record.attributes.number("temperature"),
            current_humidity: room.and_then(|r| r.attributes.f64("current-humidity")),
            min_temp: None,
            max_temp: None,
            step: None,
            unit: self.unit,
            fan_mode: self.fan_speed().map(|speed| lookup(&FAN_SPEED, speed)),
            features: self.features(!fan_modes.is_empty()),
            fan_modes,
            swing_mode: self
                .record
                .attributes
                .str("swing")
                .map(|raw| lookup(&SWING, raw)),
            swing_modes: if swing {
                vec![SwingMode::On, SwingMode::Off]
            } else {
                Vec::new()
            },
        };
        EntityState::new(self.available(), StateValue::Climate(state))
    }

    fn mutation(&self) -> Mutation {
        Mutation::new(Category::HvacUnit, &self.record.id)
    }

    fn power(&self, on: bool) -> WritePlan {
        WritePlan::new().write(self.mutation().attribute("power", if on { "On" } else { "Off" }))
    }

    fn plan(&self, entity: &Entity, action: &EntityAction) -> Result<WritePlan, CoreError> {
        match action {
            EntityAction::TurnOn => Ok(self.power(true)),
            EntityAction::TurnOff => Ok(self.power(false)),
            EntityAction::SetTemperature(value) => {
                check_finite(entity, *value)?;
                self.set_temperature(*value)
            }
            EntityAction::SetHvacMode(mode) => self.set_hvac_mode(*mode),
            EntityAction::SetFanMode(fan) => Ok(self.set_fan_mode(*fan)),
            EntityAction::SetSwingMode(swing) if self.swing_available() => {
                Ok(self.set_swing_mode(*swing))
            }
            _ => Err(unsupported(entity, action)),
        }
    }

    fn set_temperature(&self, value: f64) -> Result<WritePlan, CoreError> {
        if self.is_manual() && !self.is_on() {
            return Err(CoreError::rejected(format!(
                "temperature for {} can only be set when it is powered on",
                self.record.name()
            )));
        }
        if let Some(mode @ (HvacMode::Off | HvacMode::FanOnly | HvacMode::Dry)) =
            self.hvac_mode().and_then(|m| m.known())
        {
            return Err(CoreError::rejected(format!(
                "{}: setting temperature is not supported in {mode} mode",
                self.record.name()
            )));
        }

        if self.is_manual() {
            return Ok(WritePlan::new().write(self.mutation().attribute("temperature", value)));
        }

        // In auto the unit chases its room's set point, which is always Celsius.
        let room = self
            .room()
            .ok_or_else(|| CoreError::not_found("room", self.record.related_id("room").unwrap_or("-")))?;
        let celsius = match self.unit {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => to_stored_celsius(value, UnitSystem::Imperial),
        };
        Ok(WritePlan::new()
            .write(
                Mutation::new(Category::Room, &room.id)
                    .attribute("set-point-c", celsius)
                    .attribute("active", true),
            )
            .patch(LocalPatch::new(Category::HvacUnit, &self.record.id).attribute("temperature", value)))
    }

    fn set_hvac_mode(&self, mode: HvacMode) -> Result<WritePlan, CoreError> {
        if mode == HvacMode::Off {
            return Ok(self.power(false));
        }
        if !self.is_manual() {
            debug!(hvac_unit = self.record.name(), %mode, "mode is controlled by Flair in auto");
            return Ok(WritePlan::new());
        }
        if !self.hvac_modes().contains(&mode) {
            return Err(CoreError::invalid(format!(
                "{} does not support the {mode} mode",
                self.record.name()
            )));
        }
        let Some(vendor) = HVAC_UNIT_MODE.to_vendor(mode) else {
            return Err(CoreError::invalid(format!("no vendor encoding for {mode}")));
        };

        let mut plan = if self.is_on() {
            WritePlan::new()
        } else {
            self.power(true)
        };
        plan = plan.write(self.mutation().attribute("mode", vendor));

        let auto_speed = FAN_SPEED.to_vendor(FanMode::Auto).unwrap_or("Auto");
        match mode {
            HvacMode::Dry | HvacMode::HeatCool if self.fan_speed() != Some(auto_speed) => {
                plan = plan.write(self.mutation().attribute("fan-speed", auto_speed));
            }
            HvacMode::FanOnly if self.fan_speed() == Some(auto_speed) => {
                // Fan-only rejects Auto; fall back to the first allowed speed.
                let fallback = self
                    .fan_speeds_for("FAN")
                    .first()
                    .and_then(|speed| FAN_SPEED.to_vendor(*speed));
                match fallback {
                    Some(speed) => plan = plan.write(self.mutation().attribute("fan-speed", speed)),
                    None => debug!(hvac_unit = self.record.name(), "no fan-only speeds constrained"),
                }
            }
            _ => {}
        }
        Ok(plan)
    }

    fn set_fan_mode(&self, fan: FanMode) -> WritePlan {
        let auto_speed = FAN_SPEED.to_vendor(FanMode::Auto).unwrap_or("Auto");
        let vendor = FAN_SPEED.to_vendor(fan).unwrap_or(auto_speed);

        if !self.is_manual() {
            // The auto-mode default uses upper case; the live value is title case.
            return WritePlan::new()
                .send(self.mutation().attribute("default-fan-speed", vendor.to_uppercase()))
                .patch(LocalPatch::new(Category::HvacUnit, &self.record.id).attribute("fan-speed", vendor));
        }

        let vendor = if self.hvac_mode().and_then(|m| m.known()) == Some(HvacMode::Dry) {
            auto_speed
        } else {
            vendor
        };
        WritePlan::new().write(self.mutation().attribute("fan-speed", vendor))
    }

    fn set_swing_mode(&self, swing: SwingMode) -> WritePlan {
        let vendor = SWING.to_vendor(swing).unwrap_or("Off");

        if !self.is_manual() {
            return WritePlan::new()
                .send(self.mutation().attribute("swing-auto", swing == SwingMode::On))
                .patch(LocalPatch::new(Category::HvacUnit, &self.record.id).attribute("swing", vendor));
        }
        WritePlan::new().write(self.mutation().attribute("swing", vendor))
    }
}
