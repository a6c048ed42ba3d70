//! Layering of global flags over the profile loaded by `flair-config`.
//!
//! Precedence is flag (or its env var) > profile > `[defaults]`.

use std::time::Duration;

use secrecy::SecretString;

use flair_config::{Config, Profile};
use flair_core::{ConnectionConfig, CoordinatorConfig, Credentials, UnitSystem};

use crate::cli::{GlobalOpts, UnitsArg};
use crate::error::CliError;

/// Everything a connected command needs.
#[derive(Debug, Clone)]
pub struct Session {
    pub profile_name: String,
    pub connection: ConnectionConfig,
    pub coordinator: CoordinatorConfig,
    pub units: UnitSystem,
}

impl From<UnitsArg> for UnitSystem {
    fn from(arg: UnitsArg) -> Self {
        match arg {
            UnitsArg::Metric => Self::Metric,
            UnitsArg::Imperial => Self::Imperial,
        }
    }
}

/// The profile name selected by `--profile` or the config file.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Load the config file and build a [`Session`].
pub fn load_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let config = flair_config::load_config()?;
    resolve_session(global, &config)
}

pub fn resolve_session(global: &GlobalOpts, config: &Config) -> Result<Session, CliError> {
    let profile_name = active_profile_name(global, config);

    // An explicitly named profile must exist unless the flags carry a full
    // set of credentials.
    let stored = config.profiles.get(&profile_name);
    if stored.is_none() && global.profile.is_some() && global.client_id.is_none() {
        return Err(CliError::ProfileNotFound {
            available: available_profiles(config),
            name: profile_name,
        });
    }

    let mut profile = stored.cloned().unwrap_or_default();
    if let Some(ref id) = global.client_id {
        profile.client_id = Some(id.clone());
    }
    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(seconds) = global.timeout {
        profile.timeout = Some(seconds);
    }

    let credentials = match global.client_secret {
        Some(ref secret) => Credentials {
            client_id: profile
                .client_id
                .clone()
                .ok_or_else(|| CliError::NoCredentials {
                    profile: profile_name.clone(),
                })?,
            client_secret: SecretString::from(secret.clone()),
        },
        None => flair_config::resolve_credentials(&profile, &profile_name)?,
    };

    let connection = ConnectionConfig {
        api_url: flair_config::resolve_api_url(&profile)?,
        credentials,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(config.defaults.timeout)),
    };

    Ok(Session {
        coordinator: flair_config::profile_to_coordinator_config(&profile, &config.defaults),
        units: global
            .units
            .map_or_else(|| profile.units(&config.defaults), UnitSystem::from),
        connection,
        profile_name,
    })
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// The named profile, or an error listing the alternatives.
pub fn require_profile<'a>(config: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    config
        .profiles
        .get(name)
        .ok_or_else(|| CliError::ProfileNotFound {
            name: name.into(),
            available: available_profiles(config),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["flair"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, profile: Profile) -> Config {
        let mut config = Config::default();
        config.profiles.insert(name.into(), profile);
        config
    }

    #[test]
    fn flags_override_profile() {
        let config = config_with(
            "default",
            Profile {
                client_id: Some("from-file".into()),
                client_secret: Some("file-secret".into()),
                timeout: Some(5),
                ..Profile::default()
            },
        );
        let session = resolve_session(
            &global(&[
                "--client-id",
                "from-flag",
                "--client-secret",
                "flag-secret",
                "--timeout",
                "9",
                "--units",
                "imperial",
            ]),
            &config,
        )
        .unwrap();

        assert_eq!(session.profile_name, "default");
        assert_eq!(session.connection.credentials.client_id, "from-flag");
        assert_eq!(
            session.connection.credentials.client_secret.expose_secret(),
            "flag-secret"
        );
        assert_eq!(session.connection.timeout, Duration::from_secs(9));
        assert_eq!(session.coordinator.request_timeout, Duration::from_secs(9));
        assert_eq!(session.units, UnitSystem::Imperial);
    }

    #[test]
    fn unknown_named_profile_is_reported() {
        let config = config_with("home", Profile::default());
        let err = resolve_session(&global(&["--profile", "cabin"]), &config).unwrap_err();
        assert!(
            matches!(err, CliError::ProfileNotFound { ref available, .. } if available == "home")
        );
    }

    #[test]
    fn secret_without_client_id_needs_credentials() {
        let err = resolve_session(&global(&["--client-secret", "s"]), &Config::default())
            .unwrap_err();
        assert!(matches!(err, CliError::NoCredentials { .. }));
    }
}
