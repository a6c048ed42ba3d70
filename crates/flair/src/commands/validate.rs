//! `flair validate`: authenticate and list what the credentials can see.

use flair_core::{AccountInfo, validate_account};

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let client = session
        .connection
        .build_client()
        .map_err(|e| CliError::from_core(e, &session.profile_name))?;
    let info = validate_account(&client)
        .await
        .map_err(|e| CliError::from_core(e, &session.profile_name))?;

    let out = output::render_single(global.output, &info, detail, |i| i.client_id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(info: &AccountInfo) -> String {
    output::detail_block(&[
        ("Client id", info.client_id.clone()),
        ("Users", info.users.join(", ")),
        ("Structures", info.structures.join(", ")),
    ])
}
