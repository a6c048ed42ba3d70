//! `flair set` and `flair press`: turn a command-line value into an
//! [`EntityAction`] and run it through the coordinator.

use std::str::FromStr;

use flair_core::mapping::{FanMode, HvacMode, SwingMode};
use flair_core::{Entity, EntityAction, Platform};

use super::util::{self, EntityView};
use crate::cli::{ClimateAttr, GlobalOpts, PressArgs, SetArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn set(session: &Session, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = util::start(session, false, global.quiet).await?;
    let result = async {
        let entity = util::find_entity(&coordinator, &args.unique_id)?;
        let action = parse_action(&entity, &args.value, args.attr)?;
        perform(&coordinator, session, entity, &action, global).await
    }
    .await;
    coordinator.shutdown().await;
    result
}

pub async fn press(session: &Session, args: PressArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = util::start(session, false, global.quiet).await?;
    let result = async {
        let entity = util::find_entity(&coordinator, &args.unique_id)?;
        if entity.platform() != Platform::Button {
            return Err(invalid(
                &entity,
                &args.unique_id,
                "is not a button; use `flair set`",
            ));
        }
        perform(&coordinator, session, entity, &EntityAction::Press, global).await
    }
    .await;
    coordinator.shutdown().await;
    result
}

async fn perform(
    coordinator: &flair_core::Coordinator,
    session: &Session,
    entity: Entity,
    action: &EntityAction,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    tracing::info!(entity = %entity.unique_id, %action, "writing");
    coordinator
        .perform(&entity, action, session.units)
        .await
        .map_err(|e| CliError::from_core(e, &session.profile_name))?;

    if !global.quiet {
        eprintln!("✓ {}: {action}", entity.display_name());
    }
    let view = EntityView::render(coordinator, entity, session.units);
    let out = output::render_single(global.output, &view, EntityView::summary, EntityView::summary);
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Value parsing ────────────────────────────────────────────────────

/// Interpret `raw` for `entity`'s platform.
pub fn parse_action(
    entity: &Entity,
    raw: &str,
    attr: Option<ClimateAttr>,
) -> Result<EntityAction, CliError> {
    let value = raw.trim();
    if attr.is_some() && entity.platform() != Platform::Climate {
        return Err(invalid(entity, raw, "--attr only applies to climate entities"));
    }

    match entity.platform() {
        Platform::Climate => parse_climate(entity, value, attr),
        Platform::Cover => match value.to_ascii_lowercase().as_str() {
            "open" => Ok(EntityAction::Open),
            "close" | "closed" => Ok(EntityAction::Close),
            other => other
                .trim_end_matches('%')
                .parse::<i64>()
                .ok()
                .filter(|p| (0..=100).contains(p))
                .map(EntityAction::SetPosition)
                .ok_or_else(|| invalid(entity, raw, "expected open, close or a position 0-100")),
        },
        Platform::Switch => match parse_toggle(value) {
            Some(true) => Ok(EntityAction::TurnOn),
            Some(false) => Ok(EntityAction::TurnOff),
            None => Err(invalid(entity, raw, "expected on or off")),
        },
        Platform::Number => parse_number(value)
            .map(EntityAction::SetValue)
            .ok_or_else(|| invalid(entity, raw, "expected a number")),
        Platform::Select => Ok(EntityAction::SelectOption(value.to_owned())),
        Platform::Button => Err(invalid(entity, raw, "buttons take no value; use `flair press`")),
        Platform::Sensor | Platform::BinarySensor => {
            Err(invalid(entity, raw, "sensors are read-only"))
        }
    }
}

fn parse_climate(
    entity: &Entity,
    value: &str,
    attr: Option<ClimateAttr>,
) -> Result<EntityAction, CliError> {
    match attr {
        Some(ClimateAttr::Temperature) => parse_number(value)
            .map(EntityAction::SetTemperature)
            .ok_or_else(|| invalid(entity, value, "expected a temperature")),
        Some(ClimateAttr::HvacMode) => HvacMode::from_str(value)
            .map(EntityAction::SetHvacMode)
            .map_err(|_| {
                invalid(entity, value, "expected off, heat, cool, heat_cool, dry or fan_only")
            }),
        Some(ClimateAttr::FanMode) => FanMode::from_str(value)
            .map(EntityAction::SetFanMode)
            .map_err(|_| invalid(entity, value, "expected auto, high, medium or low")),
        Some(ClimateAttr::SwingMode) => SwingMode::from_str(value)
            .map(EntityAction::SetSwingMode)
            .map_err(|_| invalid(entity, value, "expected on or off")),
        None => {
            if let Some(t) = parse_number(value) {
                return Ok(EntityAction::SetTemperature(t));
            }
            match parse_toggle(value) {
                Some(true) => return Ok(EntityAction::TurnOn),
                Some(false) => return Ok(EntityAction::TurnOff),
                None => {}
            }
            HvacMode::from_str(value)
                .map(EntityAction::SetHvacMode)
                .map_err(|_| {
                    invalid(
                        entity,
                        value,
                        "expected a temperature, on/off or an hvac mode (use --attr for fan and swing)",
                    )
                })
        }
    }
}

fn parse_toggle(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn invalid(entity: &Entity, raw: &str, reason: &str) -> CliError {
    CliError::Validation {
        field: entity.unique_id.clone(),
        reason: format!("'{raw}' {reason}"),
    }
}
