// ── Vendor ⇄ host mapping tables ──
//
// Every enumerated attribute Flair reports as a string is translated
// through a static table. Values the table does not know come back as
// `Mapped::Unknown(raw)` so an API change shows up instead of vanishing.

use std::fmt;

use serde::{Serialize, Serializer};

/// Result of a vendor-to-host lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped<T> {
    Known(T),
    Unknown(String),
}

impl<T: Copy> Mapped<T> {
    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl<T: fmt::Display> fmt::Display for Mapped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => value.fmt(f),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl<T: fmt::Display> Serialize for Mapped<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A static bijective table between vendor strings and host values.
#[derive(Debug)]
pub struct BiMap<T: 'static> {
    name: &'static str,
    pairs: &'static [(&'static str, T)],
}

impl<T: Copy + PartialEq + 'static> BiMap<T> {
    pub const fn new(name: &'static str, pairs: &'static [(&'static str, T)]) -> Self {
        Self { name, pairs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Vendor string → host value.
    pub fn to_host(&self, raw: &str) -> Mapped<T> {
        self.pairs
            .iter()
            .find(|(vendor, _)| *vendor == raw)
            .map_or_else(|| Mapped::Unknown(raw.to_owned()), |(_, host)| Mapped::Known(*host))
    }

    /// Host value → vendor string. `None` when the vendor has no encoding
    /// for this value.
    pub fn to_vendor(&self, value: T) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(_, host)| *host == value)
            .map(|(vendor, _)| *vendor)
    }

    /// Host values in table order.
    pub fn hosts(&self) -> impl Iterator<Item = T> + '_ {
        self.pairs.iter().map(|(_, host)| *host)
    }

    pub fn vendors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(vendor, _)| *vendor)
    }
}

// ── Host enums ───────────────────────────────────────────────────────

/// Climate operating mode as presented to the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    HeatCool,
    Dry,
    FanOnly,
}

/// What an HVAC unit is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Drying,
    Fan,
}

impl HvacAction {
    /// Action implied by a powered-on unit in `mode`. `HeatCool` has none.
    pub fn for_mode(mode: HvacMode) -> Option<Self> {
        match mode {
            HvacMode::Off => Some(Self::Off),
            HvacMode::Heat => Some(Self::Heating),
            HvacMode::Cool => Some(Self::Cooling),
            HvacMode::Dry => Some(Self::Drying),
            HvacMode::FanOnly => Some(Self::Fan),
            HvacMode::HeatCool => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FanMode {
    Auto,
    High,
    Medium,
    Low,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SwingMode {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum SystemMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum SetPointController {
    Thermostat,
    #[strum(to_string = "Flair App")]
    FlairApp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum AwayMode {
    #[strum(to_string = "Smart Away")]
    SmartAway,
    #[strum(to_string = "Off Only")]
    OffOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum HoldDuration {
    #[strum(to_string = "Until next scheduled event")]
    UntilNextEvent,
    #[strum(to_string = "3 Hours")]
    ThreeHours,
    #[strum(to_string = "8 Hours")]
    EightHours,
    #[strum(to_string = "24 Hours")]
    OneDay,
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum HomeAwaySetter {
    Manual,
    Thermostat,
    #[strum(to_string = "Flair App Geolocation")]
    Geolocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum TemperatureScale {
    Fahrenheit,
    Celsius,
    Kelvin,
}

// ── Tables ───────────────────────────────────────────────────────────

/// `structure-heat-cool-mode`. Dry and FanOnly have no vendor value.
pub static STRUCTURE_HEAT_COOL: BiMap<HvacMode> = BiMap::new(
    "structure-heat-cool-mode",
    &[
        ("float", HvacMode::Off),
        ("heat", HvacMode::Heat),
        ("cool", HvacMode::Cool),
        ("auto", HvacMode::HeatCool),
    ],
);

/// HVAC unit `mode`.
pub static HVAC_UNIT_MODE: BiMap<HvacMode> = BiMap::new(
    "hvac-unit mode",
    &[
        ("Off", HvacMode::Off),
        ("Dry", HvacMode::Dry),
        ("Heat", HvacMode::Heat),
        ("Cool", HvacMode::Cool),
        ("Fan", HvacMode::FanOnly),
        ("Auto", HvacMode::HeatCool),
    ],
);

/// Keys of an HVAC unit's `constraints.ON` object. Off is power driven.
pub static HVAC_CONSTRAINT_MODE: BiMap<HvacMode> = BiMap::new(
    "hvac-unit constraint mode",
    &[
        ("DRY", HvacMode::Dry),
        ("HEAT", HvacMode::Heat),
        ("COOL", HvacMode::Cool),
        ("FAN", HvacMode::FanOnly),
        ("AUTO", HvacMode::HeatCool),
    ],
);

/// HVAC unit `fan-speed`.
pub static FAN_SPEED: BiMap<FanMode> = BiMap::new(
    "fan-speed",
    &[
        ("Auto", FanMode::Auto),
        ("High", FanMode::High),
        ("Medium", FanMode::Medium),
        ("Low", FanMode::Low),
    ],
);

/// Fan speed keys inside `constraints.ON.<MODE>.<ON|OFF>`.
pub static CONSTRAINT_FAN_SPEED: BiMap<FanMode> = BiMap::new(
    "constraint fan speed",
    &[
        ("FAN AUTO", FanMode::Auto),
        ("FAN HI", FanMode::High),
        ("FAN MID", FanMode::Medium),
        ("FAN LOW", FanMode::Low),
    ],
);

pub static SWING: BiMap<SwingMode> =
    BiMap::new("swing", &[("On", SwingMode::On), ("Off", SwingMode::Off)]);

pub static SYSTEM_MODE: BiMap<SystemMode> = BiMap::new(
    "mode",
    &[("auto", SystemMode::Auto), ("manual", SystemMode::Manual)],
);

pub static SET_POINT_CONTROLLER: BiMap<SetPointController> = BiMap::new(
    "set-point-mode",
    &[
        (
            "Home Evenness For Active Rooms Follow Third Party",
            SetPointController::Thermostat,
        ),
        (
            "Home Evenness For Active Rooms Flair Setpoint",
            SetPointController::FlairApp,
        ),
    ],
);

pub static AWAY_MODE: BiMap<AwayMode> = BiMap::new(
    "structure-away-mode",
    &[
        ("Smart Away", AwayMode::SmartAway),
        ("Off Only", AwayMode::OffOnly),
    ],
);

pub static HOLD_DURATION: BiMap<HoldDuration> = BiMap::new(
    "default-hold-duration",
    &[
        ("Until", HoldDuration::UntilNextEvent),
        ("3h", HoldDuration::ThreeHours),
        ("8h", HoldDuration::EightHours),
        ("24h", HoldDuration::OneDay),
        ("Forever", HoldDuration::Forever),
    ],
);

pub static HOME_AWAY_SET_BY: BiMap<HomeAwaySetter> = BiMap::new(
    "home-away-mode",
    &[
        ("Manual", HomeAwaySetter::Manual),
        ("Third Party Home Away", HomeAwaySetter::Thermostat),
        ("Flair Autohome Autoaway", HomeAwaySetter::Geolocation),
    ],
);

pub static TEMPERATURE_SCALE: BiMap<TemperatureScale> = BiMap::new(
    "temperature-scale",
    &[
        ("F", TemperatureScale::Fahrenheit),
        ("C", TemperatureScale::Celsius),
        ("K", TemperatureScale::Kelvin),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;

    /// Every host value with a vendor encoding maps back to itself.
    fn assert_round_trips<T: Copy + PartialEq + fmt::Debug + 'static>(table: &BiMap<T>) {
        for host in table.hosts() {
            let vendor = table.to_vendor(host);
            assert!(vendor.is_some(), "{}: {host:?} has no vendor value", table.name());
            let back = vendor.map(|v| table.to_host(v));
            assert_eq!(back, Some(Mapped::Known(host)), "{}", table.name());
        }
    }

    #[test]
    fn tables_round_trip() {
        assert_round_trips(&STRUCTURE_HEAT_COOL);
        assert_round_trips(&HVAC_UNIT_MODE);
        assert_round_trips(&HVAC_CONSTRAINT_MODE);
        assert_round_trips(&FAN_SPEED);
        assert_round_trips(&CONSTRAINT_FAN_SPEED);
        assert_round_trips(&SWING);
        assert_round_trips(&SYSTEM_MODE);
        assert_round_trips(&SET_POINT_CONTROLLER);
        assert_round_trips(&AWAY_MODE);
        assert_round_trips(&HOLD_DURATION);
        assert_round_trips(&HOME_AWAY_SET_BY);
        assert_round_trips(&TEMPERATURE_SCALE);
    }

    #[test]
    fn lossy_tables_have_no_encoding_for_missing_modes() {
        assert_eq!(STRUCTURE_HEAT_COOL.to_vendor(HvacMode::Dry), None);
        assert_eq!(STRUCTURE_HEAT_COOL.to_vendor(HvacMode::FanOnly), None);
        assert_eq!(HVAC_CONSTRAINT_MODE.to_vendor(HvacMode::Off), None);
    }

    #[test]
    fn unknown_vendor_values_are_preserved() {
        let mapped = HVAC_UNIT_MODE.to_host("Turbo");
        assert_eq!(mapped, Mapped::Unknown("Turbo".into()));
        assert_eq!(mapped.to_string(), "Turbo");
        assert_eq!(mapped.known(), None);
        assert_eq!(
            serde_json::to_value(&mapped).ok(),
            Some(serde_json::json!("Turbo"))
        );
    }

    #[test]
    fn host_labels() {
        assert_eq!(HvacMode::HeatCool.to_string(), "heat_cool");
        assert_eq!("fan_only".parse::<HvacMode>().ok(), Some(HvacMode::FanOnly));
        assert_eq!(SetPointController::FlairApp.to_string(), "Flair App");
        assert_eq!(HoldDuration::UntilNextEvent.to_string(), "Until next scheduled event");
        assert_eq!(HvacAction::for_mode(HvacMode::HeatCool), None);
    }
}
