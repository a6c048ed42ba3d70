use std::time::{Duration, Instant};

use secrecy::SecretString;
use serde::Deserialize;

/// Scopes requested with every client-credentials grant.
pub const DEFAULT_SCOPE: &str = "structures.view structures.edit rooms.view rooms.edit \
     pucks.view pucks.edit vents.view vents.edit hvac-units.view hvac-units.edit \
     bridges.view bridges.edit thermostats.view users.view";

/// Tokens are treated as expired this long before the server says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// OAuth2 client credentials issued by Flair for API access.
///
/// The secret never appears in `Debug` output.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }
}

// ── Token endpoint ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

/// A bearer token and the instant it stops being usable.
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    pub secret: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    pub fn from_response(resp: TokenResponse, now: Instant) -> Self {
        Self {
            secret: SecretString::from(resp.access_token),
            expires_at: now + Duration::from_secs(resp.expires_in),
        }
    }

    /// Whether the token can still be sent at `now`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}
