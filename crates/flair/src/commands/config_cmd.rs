//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use flair_config::{Config, Profile};
use flair_core::UnitSystem;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_secret() -> Result<String, CliError> {
    let secret = rpassword::prompt_password("Client secret: ").map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "client_secret".into(),
            reason: "client secret cannot be empty".into(),
        });
    }
    Ok(secret)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),
        ConfigCommand::Show => show(global),
        ConfigCommand::SetSecret => set_secret(global),
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let path = flair_config::config_path();
    eprintln!("Flair CLI configuration");
    eprintln!("   Config path: {}\n", path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let client_id: String = Input::new()
        .with_prompt("Client id")
        .interact_text()
        .map_err(prompt_err)?;

    let secret = prompt_secret()?;

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the client secret?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let client_secret = if store_selection == 0 {
        flair_config::store_client_secret(&profile_name, &SecretString::from(secret))?;
        eprintln!("   ✓ Client secret stored in system keyring");
        None
    } else {
        Some(secret)
    };

    let unit_choices = &["Metric (°C)", "Imperial (°F)"];
    let units = match Select::new()
        .with_prompt("Temperature units")
        .items(unit_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?
    {
        0 => UnitSystem::Metric,
        _ => UnitSystem::Imperial,
    };

    let mut cfg = flair_config::load_config_or_default();
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            client_id: Some(client_id),
            client_secret,
            units: Some(units),
            ..Profile::default()
        },
    );
    cfg.default_profile = Some(profile_name.clone());
    let written = flair_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: flair validate");
    Ok(())
}

// ── Show ────────────────────────────────────────────────────────────

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = redacted(flair_config::load_config()?);
    let out = output::render_single(
        global.output,
        &cfg,
        |c| {
            let body = toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}"));
            format!("# {}\n{body}", flair_config::config_path().display())
        },
        |c| c.active_profile_name().to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.client_secret.is_some() {
            profile.client_secret = Some(REDACTED.into());
        }
    }
    cfg
}

// ── SetSecret ───────────────────────────────────────────────────────

fn set_secret(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = flair_config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);
    config::require_profile(&cfg, &profile_name)?;

    let secret = prompt_secret()?;
    flair_config::store_client_secret(&profile_name, &SecretString::from(secret))?;

    eprintln!("✓ Client secret stored in system keyring for profile '{profile_name}'");
    Ok(())
}
