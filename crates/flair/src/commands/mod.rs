//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod entities;
pub mod status;
pub mod util;
pub mod validate;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a command that talks to the Flair API.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Validate => validate::handle(session, global).await,
        Command::Status => status::handle(session, global).await,
        Command::Entities(args) => entities::handle(session, args, global).await,
        Command::Watch(args) => watch::handle(session, args, global).await,
        Command::Set(args) => control::set(session, args, global).await,
        Command::Press(args) => control::press(session, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before connecting".into(),
        }),
    }
}
