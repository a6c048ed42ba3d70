//! Shared configuration for Flair tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `flair_core` connection and coordinator configs.
//! The CLI layers its own flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use flair_core::{ConnectionConfig, CoordinatorConfig, Credentials, UnitSystem};

/// Keyring service name; entries are `<profile>/client-secret`.
pub const KEYRING_SERVICE: &str = "flair";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// The profile name to use when none is given explicitly.
    pub fn active_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub units: UnitSystem,

    /// Seconds per remote call.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between full refreshes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Seconds after which a snapshot counts as stale. Zero disables.
    #[serde(default = "default_stale_after")]
    pub stale_after: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            units: UnitSystem::default(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            stale_after: default_stale_after(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    flair_core::config::DEFAULT_REQUEST_TIMEOUT.as_secs()
}
fn default_poll_interval() -> u64 {
    flair_core::config::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_stale_after() -> u64 {
    flair_core::config::DEFAULT_STALE_AFTER.as_secs()
}

/// A named Flair account.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// OAuth2 client id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth2 client secret (plaintext; prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,

    /// API host override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<UnitSystem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn units(&self, defaults: &Defaults) -> UnitSystem {
        self.units.unwrap_or(defaults.units)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("co", "flair", "flair").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("flair");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys use `__` as the nesting separator, e.g.
/// `FLAIR_DEFAULTS__UNITS=imperial`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLAIR_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/client-secret"),
    )?)
}

/// Store a client secret in the system keyring.
pub fn store_client_secret(profile_name: &str, secret: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(secret.expose_secret())?;
    Ok(())
}

/// Resolve the client secret from the credential chain.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's client_secret_env → env var lookup
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the client id and secret for `profile`.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> Result<Credentials, ConfigError> {
    let client_id = profile
        .client_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let client_secret = resolve_client_secret(profile, profile_name)?;
    Ok(Credentials {
        client_id,
        client_secret,
    })
}

/// Validate and return the API host for `profile`.
pub fn resolve_api_url(profile: &Profile) -> Result<String, ConfigError> {
    let Some(ref raw) = profile.api_url else {
        return Ok(flair_core::config::DEFAULT_BASE_URL.to_owned());
    };
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

/// Build a `ConnectionConfig` from a profile, no CLI overrides.
pub fn profile_to_connection(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConnectionConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    Ok(ConnectionConfig {
        api_url: resolve_api_url(profile)?,
        credentials,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// Coordinator pacing for a profile, falling back to `defaults`.
pub fn profile_to_coordinator_config(profile: &Profile, defaults: &Defaults) -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval: Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval)),
        request_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        stale_after: Duration::from_secs(defaults.stale_after),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg.active_profile_name(), "default");
        assert_eq!(cfg.defaults.poll_interval, 30);
        assert_eq!(cfg.defaults.timeout, 20);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profiles_parse_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "cabin"

[defaults]
units = "imperial"

[profiles.cabin]
client_id = "abc"
client_secret = "s3cret"
poll_interval = 60
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        let profile = cfg.profile("cabin").unwrap();

        assert_eq!(cfg.active_profile_name(), "cabin");
        assert_eq!(profile.units(&cfg.defaults), UnitSystem::Imperial);
        let pacing = profile_to_coordinator_config(profile, &cfg.defaults);
        assert_eq!(pacing.poll_interval, Duration::from_secs(60));
        assert_eq!(pacing.request_timeout, Duration::from_secs(20));
        assert!(matches!(cfg.profile("other"), Err(ConfigError::UnknownProfile { .. })));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                client_id: Some("abc".into()),
                units: Some(UnitSystem::Imperial),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("client_secret"));

        assert_eq!(load_config_from(&path).unwrap().profiles, cfg.profiles);
    }

    #[test]
    fn secret_env_var_wins() {
        // PATH is set in every test environment.
        let expected = std::env::var("PATH").unwrap();
        let profile = Profile {
            client_id: Some("abc".into()),
            client_secret: Some("from-file".into()),
            client_secret_env: Some("PATH".into()),
            ..Profile::default()
        };

        let creds = resolve_credentials(&profile, "env-test").unwrap();
        assert_eq!(creds.client_secret.expose_secret(), expected);
    }

    #[test]
    fn missing_client_id_is_reported() {
        let profile = Profile {
            client_secret: Some("s3cret".into()),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_credentials(&profile, "nobody"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn api_url_is_validated() {
        let bad = Profile {
            api_url: Some("not a url".into()),
            ..Profile::default()
        };
        assert!(matches!(resolve_api_url(&bad), Err(ConfigError::Validation { .. })));

        let custom = Profile {
            api_url: Some("http://127.0.0.1:8080/".into()),
            ..Profile::default()
        };
        assert_eq!(resolve_api_url(&custom).unwrap(), "http://127.0.0.1:8080");

        assert_eq!(resolve_api_url(&Profile::default()).unwrap(), "https://api.flair.co");
    }
}
