//! `flair status`: coordinator health and a per-structure summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use flair_core::{Coordinator, SyncStatus};

use super::util;
use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusReport {
    profile: String,
    units: String,
    status: SyncStatus,
    last_refresh: Option<DateTime<Utc>>,
    structures: Vec<StructureSummary>,
    entities: usize,
}

#[derive(Debug, Serialize)]
struct StructureSummary {
    id: String,
    name: String,
    mode: &'static str,
    devices: usize,
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = util::start(session, false, global.quiet).await?;
    let report = build_report(&coordinator, session);
    coordinator.shutdown().await;

    let out = output::render_single(global.output, &report, detail, |r| {
        status_label(&r.status).to_owned()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn build_report(coordinator: &Coordinator, session: &Session) -> StatusReport {
    let snapshot = coordinator.snapshot();
    StatusReport {
        profile: session.profile_name.clone(),
        units: session.units.to_string(),
        status: coordinator.status(),
        last_refresh: coordinator.last_refresh(),
        structures: snapshot
            .structures
            .values()
            .map(|s| StructureSummary {
                id: s.id().to_owned(),
                name: s.name().to_owned(),
                mode: if s.is_manual() { "manual" } else { "auto" },
                devices: s.device_count(),
            })
            .collect(),
        entities: coordinator.entities().len(),
    }
}

fn status_label(status: &SyncStatus) -> &'static str {
    match status {
        SyncStatus::Initializing => "initializing",
        SyncStatus::Healthy => "healthy",
        SyncStatus::Degraded { .. } => "degraded",
        SyncStatus::NeedsReauth { .. } => "needs_reauth",
        SyncStatus::Stopped => "stopped",
    }
}

fn detail(report: &StatusReport) -> String {
    let mut pairs = vec![
        ("Profile", report.profile.clone()),
        ("Units", report.units.clone()),
        ("Status", status_label(&report.status).to_owned()),
        (
            "Last refresh",
            report
                .last_refresh
                .map_or_else(|| "never".into(), |t| t.to_rfc3339()),
        ),
        ("Entities", report.entities.to_string()),
    ];
    if let SyncStatus::Degraded { message, .. } | SyncStatus::NeedsReauth { message } =
        &report.status
    {
        pairs.push(("Last error", message.clone()));
    }
    for s in &report.structures {
        pairs.push((
            "Structure",
            format!("{} ({}), {} mode, {} devices", s.name, s.id, s.mode, s.devices),
        ));
    }
    output::detail_block(&pairs)
}
