//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use flair_core::{Coordinator, Entity, EntityState, Platform, UnitSystem};

use crate::cli::EntityFilter;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

/// Connect and load the first snapshot. `poll` keeps the background
/// poller running; one-shot commands pass `false`.
pub async fn start(session: &Session, poll: bool, quiet: bool) -> Result<Coordinator, CliError> {
    let mut config = session.coordinator.clone();
    if !poll {
        config.poll_interval = Duration::ZERO;
    }

    let coordinator = Coordinator::connect(&session.connection, config)
        .map_err(|e| CliError::from_core(e, &session.profile_name))?;

    let spinner = spinner("Loading Flair state", quiet);
    let started = coordinator.start().await;
    spinner.finish_and_clear();
    started.map_err(|e| CliError::from_core(e, &session.profile_name))?;

    Ok(coordinator)
}

fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Look up an entity by unique id in the current snapshot.
pub fn find_entity(coordinator: &Coordinator, unique_id: &str) -> Result<Entity, CliError> {
    coordinator
        .entities()
        .into_iter()
        .find(|e| e.unique_id == unique_id)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "entity".into(),
            identifier: unique_id.into(),
        })
}

// ── Filtering ────────────────────────────────────────────────────────

/// A parsed [`EntityFilter`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    platform: Option<Platform>,
    structure: Option<String>,
    all: bool,
}

impl Selection {
    pub fn parse(filter: &EntityFilter) -> Result<Self, CliError> {
        let platform = filter
            .platform
            .as_deref()
            .map(|raw| {
                Platform::from_str(raw).map_err(|_| CliError::Validation {
                    field: "platform".into(),
                    reason: format!(
                        "unknown platform '{raw}' (expected climate, cover, switch, sensor, \
                         binary_sensor, number, select or button)"
                    ),
                })
            })
            .transpose()?;
        Ok(Self {
            platform,
            structure: filter.structure.clone(),
            all: filter.all,
        })
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        (self.all || entity.enabled_by_default)
            && self.platform.is_none_or(|p| entity.platform() == p)
            && self
                .structure
                .as_deref()
                .is_none_or(|s| entity.structure_id == s)
    }

    pub fn apply(&self, entities: Vec<Entity>) -> Vec<Entity> {
        entities.into_iter().filter(|e| self.matches(e)).collect()
    }
}

// ── Rendered entities ────────────────────────────────────────────────

/// An entity together with its rendered state.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    #[serde(flatten)]
    pub entity: Entity,
    pub state: EntityState,
}

impl EntityView {
    pub fn render(coordinator: &Coordinator, entity: Entity, units: UnitSystem) -> Self {
        let state = coordinator.render(&entity, units);
        Self { entity, state }
    }

    pub fn summary(&self) -> String {
        self.state.value.to_string()
    }
}

#[derive(Tabled)]
pub struct EntityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
}

impl EntityRow {
    pub fn from_view(view: &EntityView, color: bool) -> Self {
        Self {
            id: view.entity.unique_id.clone(),
            name: view.entity.display_name(),
            platform: view.entity.platform().to_string(),
            state: view.summary(),
            available: output::availability(view.state.available, color),
        }
    }
}
