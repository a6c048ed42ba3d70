//! `flair watch`: keep the coordinator polling and print what changes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Local;
use owo_colors::OwoColorize;

use flair_core::{Coordinator, SyncStatus, UnitSystem};

use super::util::{self, EntityView, Selection};
use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let selection = Selection::parse(&args.filter)?;
    let mut session = session.clone();
    if let Some(seconds) = args.interval {
        if seconds == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        session.coordinator.poll_interval = Duration::from_secs(seconds);
    }

    let coordinator = util::start(&session, true, global.quiet).await?;
    let color = output::should_color(global.color);
    let mut printer = ChangePrinter {
        format: global.output,
        color,
        units: session.units,
        seen: HashMap::new(),
    };

    if !global.quiet {
        eprintln!(
            "Watching {} (every {}s, Ctrl-C to stop)",
            session.profile_name,
            session.coordinator.poll_interval.as_secs()
        );
    }
    printer.print_changes(&coordinator, &selection);

    let mut snapshots = coordinator.subscribe();
    let mut status = coordinator.status_stream();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_none() {
                    break;
                }
                printer.print_changes(&coordinator, &selection);
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                report_status(&current, color);
                if current.needs_reauth() {
                    break;
                }
            }
        }
    }

    let final_status = coordinator.status();
    coordinator.shutdown().await;
    if let SyncStatus::NeedsReauth { message } = final_status {
        return Err(CliError::AuthFailed {
            profile: session.profile_name,
            message,
        });
    }
    Ok(())
}

fn report_status(status: &SyncStatus, color: bool) {
    let line = match status {
        SyncStatus::Healthy => "refresh recovered".to_owned(),
        SyncStatus::Degraded {
            consecutive_failures,
            message,
            ..
        } => format!("refresh failed ({consecutive_failures} in a row): {message}"),
        SyncStatus::NeedsReauth { message } => format!("credentials rejected: {message}"),
        SyncStatus::Initializing | SyncStatus::Stopped => return,
    };
    if color {
        eprintln!("{}", line.yellow());
    } else {
        eprintln!("{line}");
    }
}

/// Remembers the last printed summary of each entity.
struct ChangePrinter {
    format: OutputFormat,
    color: bool,
    units: UnitSystem,
    seen: HashMap<String, (String, bool)>,
}

impl ChangePrinter {
    fn print_changes(&mut self, coordinator: &Coordinator, selection: &Selection) {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        for entity in selection.apply(coordinator.entities()) {
            let view = EntityView::render(coordinator, entity, self.units);
            let current = (view.summary(), view.state.available);
            let previous = self.seen.insert(view.entity.unique_id.clone(), current.clone());
            if previous.as_ref() == Some(&current) {
                continue;
            }

            match self.format {
                OutputFormat::Table => {
                    let was = previous.map_or_else(String::new, |(s, _)| format!("{s} -> "));
                    let state = if current.1 {
                        current.0
                    } else {
                        format!("{} (unavailable)", current.0)
                    };
                    println!(
                        "{}  {}  {was}{}",
                        output::dim(&stamp, self.color),
                        view.entity.unique_id,
                        output::highlight(&state, self.color)
                    );
                }
                OutputFormat::Plain => println!("{}\t{}", view.entity.unique_id, current.0),
                OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
                    println!("{}", output::render_json(&view, true));
                }
            }
        }
    }
}
