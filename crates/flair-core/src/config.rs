// ── Runtime configuration ──
//
// These types describe how to reach the Flair cloud and how the coordinator
// paces itself. They carry credential data but never touch disk: the CLI
// builds them (through flair-config) and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use flair_api::{ClientCredentials, FlairClient, TransportConfig};

use crate::error::CoreError;

pub use flair_api::DEFAULT_BASE_URL;

/// Default polling interval between full refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default bound on every remote call (fetch or write).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Default age after which a snapshot is considered stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

/// Which unit system entity views present temperatures in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
    strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// OAuth2 client credentials for one Flair account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Where and how to reach the Flair API.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// API host (defaults to [`flair_api::DEFAULT_BASE_URL`]).
    pub api_url: String,
    pub credentials: Credentials,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_owned(),
            credentials,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build an API client for this connection.
    pub fn build_client(&self) -> Result<FlairClient, CoreError> {
        let transport = TransportConfig::default().with_timeout(self.timeout);
        let credentials = ClientCredentials::new(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
        );
        Ok(FlairClient::with_base_url(
            &self.api_url,
            credentials,
            &transport,
        )?)
    }
}

/// Pacing of the State Coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How often the poller runs a full refresh. Zero disables polling.
    pub poll_interval: Duration,
    /// Bound on every remote fetch and write.
    pub request_timeout: Duration,
    /// Snapshot age after which views are reported unavailable. Zero disables.
    pub stale_after: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_system_parses_case_insensitively() {
        assert_eq!("Imperial".parse::<UnitSystem>().ok(), Some(UnitSystem::Imperial));
        assert_eq!("metric".parse::<UnitSystem>().ok(), Some(UnitSystem::Metric));
        assert!("kelvin".parse::<UnitSystem>().is_err());
        assert_eq!(UnitSystem::Imperial.to_string(), "imperial");
    }

    #[test]
    fn coordinator_defaults() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, Duration::from_secs(20));
    }
}
