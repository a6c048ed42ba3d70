// ── Entity views ──
//
// Pure projections of the snapshot into user-facing entities. Nothing in
// here touches the network: `render` reads a snapshot, `plan` turns an
// action into a `WritePlan` the coordinator executes.

mod binary_sensor;
mod button;
mod climate;
mod cover;
mod number;
mod select;
mod sensor;
mod switch;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::command::WritePlan;
use crate::config::UnitSystem;
use crate::error::CoreError;
use crate::mapping::{BiMap, FanMode, HvacAction, HvacMode, Mapped, SwingMode};
use crate::model::{Category, DeviceRecord, Snapshot, Structure};
use crate::units::TemperatureUnit;

pub use binary_sensor::BinarySensorKind;
pub use button::ButtonKind;
pub use climate::ClimateKind;
pub use cover::CoverKind;
pub use number::NumberKind;
pub use select::SelectKind;
pub use sensor::SensorKind;
pub use switch::SwitchKind;

/// How often an offline device is reported again.
const OFFLINE_NOTICE_INTERVAL: Duration = Duration::from_secs(300);

// ── Entity identity ──────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display,
    strum::EnumString, strum::EnumIter, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Platform {
    Climate,
    Cover,
    Switch,
    Sensor,
    BinarySensor,
    Number,
    Select,
    Button,
}

/// Which view of a record an entity is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "platform", content = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Climate(ClimateKind),
    Cover(CoverKind),
    Switch(SwitchKind),
    Sensor(SensorKind),
    BinarySensor(BinarySensorKind),
    Number(NumberKind),
    Select(SelectKind),
    Button(ButtonKind),
}

impl EntityKind {
    pub fn platform(&self) -> Platform {
        match self {
            Self::Climate(_) => Platform::Climate,
            Self::Cover(_) => Platform::Cover,
            Self::Switch(_) => Platform::Switch,
            Self::Sensor(_) => Platform::Sensor,
            Self::BinarySensor(_) => Platform::BinarySensor,
            Self::Number(_) => Platform::Number,
            Self::Select(_) => Platform::Select,
            Self::Button(_) => Platform::Button,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// The physical (or logical) device an entity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    fn of(record: &DeviceRecord) -> Self {
        let manufacturer = match record.category {
            Category::HvacUnit => record.attributes.str("make-name").unwrap_or("Unknown"),
            _ => "Flair",
        };
        Self {
            id: record.id.clone(),
            name: record.name().to_owned(),
            manufacturer: manufacturer.to_owned(),
            model: model_name(record.category).to_owned(),
        }
    }
}

fn model_name(category: Category) -> &'static str {
    match category {
        Category::Structure => "Structure",
        Category::Puck => "Puck",
        Category::Vent => "Vent",
        Category::Bridge => "Bridge",
        Category::Room => "Room",
        Category::HvacUnit => "HVAC Unit",
        Category::Schedule => "Schedule",
    }
}

/// One user-facing entity. Identity only; state comes from [`render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// `<device id>_<suffix>`, stable across refreshes.
    pub unique_id: String,
    pub name: String,
    pub structure_id: String,
    pub category: Category,
    pub device_id: String,
    pub kind: EntityKind,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<EntityCategory>,
    pub enabled_by_default: bool,
}

impl Entity {
    pub(crate) fn new(
        structure: &Structure,
        record: &DeviceRecord,
        suffix: &str,
        name: impl Into<String>,
        kind: EntityKind,
    ) -> Self {
        Self {
            unique_id: format!("{}_{suffix}", record.id),
            name: name.into(),
            structure_id: structure.id().to_owned(),
            category: record.category,
            device_id: record.id.clone(),
            kind,
            device: DeviceInfo::of(record),
            entity_category: None,
            enabled_by_default: true,
        }
    }

    pub(crate) fn config(mut self) -> Self {
        self.entity_category = Some(EntityCategory::Config);
        self
    }

    pub(crate) fn diagnostic(mut self) -> Self {
        self.entity_category = Some(EntityCategory::Diagnostic);
        self
    }

    pub(crate) fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    /// Disabled by default when the structure is in manual mode.
    pub(crate) fn auto_only(self, structure: &Structure) -> Self {
        self.enabled_by_default(!structure.is_manual())
    }

    pub fn platform(&self) -> Platform {
        self.kind.platform()
    }

    /// `"<device name> <entity name>"`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.device.name, self.name)
    }
}

// ── Entity state ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub available: bool,
    #[serde(flatten)]
    pub value: StateValue,
}

impl EntityState {
    pub(crate) fn new(available: bool, value: StateValue) -> Self {
        Self { available, value }
    }

    /// The record behind the entity is gone from the snapshot.
    pub fn missing() -> Self {
        Self::new(false, StateValue::Missing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum StateValue {
    Missing,
    Climate(ClimateState),
    Cover(CoverState),
    Switch(SwitchState),
    Sensor(SensorState),
    BinarySensor(BinarySensorState),
    Number(NumberState),
    Select(SelectState),
    Button,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateState {
    pub hvac_mode: Option<Mapped<HvacMode>>,
    pub hvac_modes: Vec<HvacMode>,
    pub hvac_action: Option<HvacAction>,
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub current_humidity: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub step: Option<f64>,
    pub unit: TemperatureUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_mode: Option<Mapped<FanMode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fan_modes: Vec<FanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swing_mode: Option<Mapped<SwingMode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub swing_modes: Vec<SwingMode>,
    pub features: ClimateFeatures,
}

/// Which climate actions currently make sense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClimateFeatures {
    pub target_temperature: bool,
    pub fan_mode: bool,
    pub swing_mode: bool,
    pub turn_on: bool,
    pub turn_off: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverState {
    pub position: Option<i64>,
    pub is_closed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub is_on: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub value: Option<SensorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinarySensorState {
    pub is_on: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberState {
    pub value: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectState {
    pub current: Option<String>,
    pub options: Vec<String>,
}

fn or_dash<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".to_owned(), ToString::to_string)
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Climate(c) => write!(
                f,
                "{} {}{} (target {})",
                or_dash(c.hvac_mode.as_ref()),
                or_dash(c.current_temperature.as_ref()),
                c.unit,
                or_dash(c.target_temperature.as_ref()),
            ),
            Self::Cover(c) => match c.position {
                Some(p) => write!(f, "{p}% open"),
                None => f.write_str("-"),
            },
            Self::Switch(s) => f.write_str(match s.is_on {
                Some(true) => "on",
                Some(false) => "off",
                None => "-",
            }),
            Self::Sensor(s) => {
                write!(f, "{}", or_dash(s.value.as_ref()))?;
                if let (Some(_), Some(unit)) = (&s.value, &s.unit) {
                    write!(f, " {unit}")?;
                }
                Ok(())
            }
            Self::BinarySensor(b) => f.write_str(if b.is_on { "on" } else { "off" }),
            Self::Number(n) => {
                write!(f, "{}", or_dash(n.value.as_ref()))?;
                if let Some(unit) = &n.unit {
                    write!(f, " {unit}")?;
                }
                Ok(())
            }
            Self::Select(s) => f.write_str(s.current.as_deref().unwrap_or("-")),
            Self::Button => f.write_str("press"),
        }
    }
}

// ── Actions ──────────────────────────────────────────────────────

/// A user request against one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum EntityAction {
    TurnOn,
    TurnOff,
    SetTemperature(f64),
    SetHvacMode(HvacMode),
    SetFanMode(FanMode),
    SetSwingMode(SwingMode),
    Open,
    Close,
    SetPosition(i64),
    SetValue(f64),
    SelectOption(String),
    Press,
}

impl fmt::Display for EntityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("turn on"),
            Self::TurnOff => f.write_str("turn off"),
            Self::SetTemperature(v) => write!(f, "set temperature to {v}"),
            Self::SetHvacMode(m) => write!(f, "set hvac mode to {m}"),
            Self::SetFanMode(m) => write!(f, "set fan mode to {m}"),
            Self::SetSwingMode(m) => write!(f, "set swing mode to {m}"),
            Self::Open => f.write_str("open"),
            Self::Close => f.write_str("close"),
            Self::SetPosition(p) => write!(f, "set position to {p}"),
            Self::SetValue(v) => write!(f, "set value to {v}"),
            Self::SelectOption(o) => write!(f, "select {o:?}"),
            Self::Press => f.write_str("press"),
        }
    }
}

pub(crate) fn unsupported(entity: &Entity, action: &EntityAction) -> CoreError {
    CoreError::invalid(format!(
        "{} ({}) does not support '{action}'",
        entity.unique_id,
        entity.platform()
    ))
}

// ── Projection entry points ──────────────────────────────────────

/// Every entity the snapshot yields, structure by structure.
pub fn discover(snapshot: &Snapshot) -> Vec<Entity> {
    let mut out = Vec::new();
    for structure in snapshot.structures.values() {
        climate::discover(structure, &mut out);
        cover::discover(structure, &mut out);
        switch::discover(structure, &mut out);
        sensor::discover(structure, &mut out);
        binary_sensor::discover(structure, &mut out);
        number::discover(structure, &mut out);
        select::discover(structure, &mut out);
        button::discover(structure, &mut out);
    }
    out
}

/// Look an entity up by unique id.
pub fn find<'a>(entities: &'a [Entity], unique_id: &str) -> Option<&'a Entity> {
    entities.iter().find(|e| e.unique_id == unique_id)
}

fn locate<'a>(entity: &Entity, snapshot: &'a Snapshot) -> Option<(&'a Structure, &'a DeviceRecord)> {
    let structure = snapshot.structure(&entity.structure_id)?;
    let record = structure.device(entity.category, &entity.device_id)?;
    Some((structure, record))
}

/// Current state of `entity`. Missing records render unavailable.
pub fn render(entity: &Entity, snapshot: &Snapshot, units: UnitSystem) -> EntityState {
    let Some((structure, record)) = locate(entity, snapshot) else {
        return EntityState::missing();
    };
    match &entity.kind {
        EntityKind::Climate(kind) => climate::render(*kind, structure, record, units),
        EntityKind::Cover(kind) => cover::render(*kind, structure, record),
        EntityKind::Switch(kind) => switch::render(*kind, structure, record),
        EntityKind::Sensor(kind) => sensor::render(*kind, structure, record, units),
        EntityKind::BinarySensor(kind) => binary_sensor::render(*kind, record),
        EntityKind::Number(kind) => number::render(*kind, structure, record, units),
        EntityKind::Select(kind) => select::render(*kind, structure, record),
        EntityKind::Button(kind) => button::render(kind, structure, record),
    }
}

/// Translate `action` into the writes that carry it out.
pub fn plan(
    entity: &Entity,
    snapshot: &Snapshot,
    units: UnitSystem,
    action: &EntityAction,
) -> Result<WritePlan, CoreError> {
    let (structure, record) = locate(entity, snapshot)
        .ok_or_else(|| CoreError::not_found("entity", &entity.unique_id))?;
    match &entity.kind {
        EntityKind::Climate(kind) => climate::plan(entity, *kind, structure, record, units, action),
        EntityKind::Cover(kind) => cover::plan(entity, *kind, structure, record, action),
        EntityKind::Switch(kind) => switch::plan(entity, *kind, record, action),
        EntityKind::Number(kind) => number::plan(entity, *kind, record, units, action),
        EntityKind::Select(kind) => select::plan(entity, *kind, structure, record, action),
        EntityKind::Button(kind) => button::plan(entity, kind, record, action),
        EntityKind::Sensor(_) | EntityKind::BinarySensor(_) => Err(unsupported(entity, action)),
    }
}

// ── Notices ──────────────────────────────────────────────────────

/// Rate limits warnings raised while rendering: offline devices are
/// reported every five minutes, an HVAC unit without a puck once.
#[derive(Debug, Default)]
pub struct NoticeLog {
    offline: Mutex<HashMap<String, Instant>>,
    missing_puck: Mutex<HashSet<String>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect a rendered entity and warn about conditions the user
    /// should hear about.
    pub fn observe(&self, entity: &Entity, snapshot: &Snapshot, state: &EntityState) {
        match &entity.kind {
            EntityKind::BinarySensor(_) => {
                if let StateValue::BinarySensor(BinarySensorState { is_on: false }) = state.value {
                    self.offline(entity);
                }
            }
            EntityKind::Climate(ClimateKind::HvacUnit) => {
                let has_puck = locate(entity, snapshot)
                    .is_some_and(|(_, record)| record.related_id("puck").is_some());
                self.missing_puck(entity, !has_puck);
            }
            _ => {}
        }
    }

    fn offline(&self, entity: &Entity) {
        let now = Instant::now();
        let Ok(mut seen) = self.offline.lock() else {
            return;
        };
        let due = seen
            .get(&entity.device_id)
            .is_none_or(|last| now.duration_since(*last) >= OFFLINE_NOTICE_INTERVAL);
        if due {
            warn!(
                model = %entity.device.model,
                device = %entity.device.name,
                "device is reported to be offline"
            );
            seen.insert(entity.device_id.clone(), now);
        }
    }

    fn missing_puck(&self, entity: &Entity, missing: bool) {
        let Ok(mut warned) = self.missing_puck.lock() else {
            return;
        };
        if !missing {
            warned.remove(&entity.device_id);
            return;
        }
        if warned.insert(entity.device_id.clone()) {
            warn!(
                hvac_unit = %entity.device.name,
                "no puck is associated with this HVAC unit; its climate entity stays unavailable until one is"
            );
        }
    }
}

// ── Shared helpers for the platform modules ──────────────────────

/// Map a vendor string, noting values the table does not know.
pub(crate) fn lookup<T: Copy + PartialEq>(table: &BiMap<T>, raw: &str) -> Mapped<T> {
    let mapped = table.to_host(raw);
    if !mapped.is_known() {
        debug!(table = table.name(), value = raw, "unmapped vendor value");
    }
    mapped
}

pub(crate) fn check_finite(entity: &Entity, value: f64) -> Result<(), CoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::invalid(format!(
            "{value} is not a usable value for {}",
            entity.unique_id
        )))
    }
}

pub(crate) fn check_range(entity: &Entity, value: f64, min: f64, max: f64) -> Result<(), CoreError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::invalid(format!(
            "{value} is outside {min}..={max} for {}",
            entity.unique_id
        )))
    }
}

/// `Some(bool)` attribute rendered as one of two labels.
pub(crate) fn bool_label(value: Option<bool>, on: &str, off: &str) -> Option<String> {
    value.map(|v| if v { on } else { off }.to_owned())
}

/// `"TEMP UP"` → `"Temp up"`.
pub(crate) fn capitalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Find `option` among `hosts` by their display label.
pub(crate) fn parse_option<T: Copy + fmt::Display>(
    hosts: impl IntoIterator<Item = T>,
    option: &str,
) -> Option<T> {
    hosts.into_iter().find(|h| h.to_string() == option)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Structure;

    #[test]
    fn unique_ids_are_unique() {
        let entities = discover(&fixtures::full("auto"));
        let mut ids: Vec<_> = entities.iter().map(|e| e.unique_id.as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn bare_structure_yields_only_structure_entities() {
        let snapshot = fixtures::snapshot(Structure::new(fixtures::structure_record("auto")));
        let entities = discover(&snapshot);

        assert!(!entities.is_empty());
        assert!(entities.iter().all(|e| e.category == Category::Structure));
    }

    #[test]
    fn removed_record_renders_unavailable() {
        let entities = discover(&fixtures::full("auto"));
        let vent = find(&entities, "v1_vent").unwrap();

        let empty = fixtures::snapshot(Structure::new(fixtures::structure_record("auto")));
        let state = render(vent, &empty, UnitSystem::Metric);
        assert_eq!(state, EntityState::missing());
        assert!(matches!(
            plan(vent, &empty, UnitSystem::Metric, &EntityAction::Open),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn sensors_refuse_actions() {
        let snapshot = fixtures::full("auto");
        let entities = discover(&snapshot);
        let temp = find(&entities, "p1_temperature").unwrap();

        let err = plan(temp, &snapshot, UnitSystem::Metric, &EntityAction::TurnOn).unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[test]
    fn device_info_uses_make_name_for_hvac_units() {
        let entities = discover(&fixtures::full("auto"));
        let hvac = find(&entities, "h1_hvac_unit").unwrap();
        assert_eq!(hvac.device.manufacturer, "Mitsubishi");
        assert_eq!(hvac.device.model, "HVAC Unit");
        assert_eq!(hvac.display_name(), "Mini Split HVAC unit");
    }

    #[test]
    fn state_serializes_flat_with_platform_tag() {
        let snapshot = fixtures::full("auto");
        let entities = discover(&snapshot);
        let vent = find(&entities, "v1_vent").unwrap();

        let json = serde_json::to_value(render(vent, &snapshot, UnitSystem::Metric)).unwrap();
        assert_eq!(json["platform"], "cover");
        assert_eq!(json["position"], 50);
        assert_eq!(json["available"], true);
    }
}
