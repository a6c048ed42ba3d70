// ── Temperature conversion ──
//
// Flair stores every temperature in Celsius. Imperial displays round to
// whole degrees Fahrenheit; writes convert back and round to two
// decimals so the stored Celsius value lands on what the user picked.

use serde::Serialize;

use crate::config::UnitSystem;

/// Unit of a rendered temperature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum TemperatureUnit {
    #[strum(to_string = "°C")]
    #[serde(rename = "°C")]
    Celsius,
    #[strum(to_string = "°F")]
    #[serde(rename = "°F")]
    Fahrenheit,
}

impl From<UnitSystem> for TemperatureUnit {
    fn from(units: UnitSystem) -> Self {
        match units {
            UnitSystem::Metric => Self::Celsius,
            UnitSystem::Imperial => Self::Fahrenheit,
        }
    }
}

/// Round half to even at `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round_ties_even() / factor
}

pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn f_to_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Stored Celsius → value shown in `units`.
pub fn display_temperature(celsius: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => round_to(c_to_f(celsius), 0),
    }
}

/// User value in `units` → Celsius to store.
pub fn to_stored_celsius(value: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => value,
        UnitSystem::Imperial => round_to(f_to_c(value), 2),
    }
}

/// Measured room temperature in `unit`, one decimal in Fahrenheit.
pub fn display_measured(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => round_to(c_to_f(celsius), 1),
    }
}

/// A temperature difference in Celsius shown in `units`.
pub fn display_delta(celsius: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => round_to(celsius * 9.0 / 5.0, 0),
    }
}

/// A temperature difference in `units` back to Celsius.
pub fn delta_to_celsius(value: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => value,
        UnitSystem::Imperial => value * 5.0 / 9.0,
    }
}

/// Pick the metric or imperial variant of a constant.
pub(crate) fn per_system(units: UnitSystem, metric: f64, imperial: f64) -> f64 {
    match units {
        UnitSystem::Metric => metric,
        UnitSystem::Imperial => imperial,
    }
}
