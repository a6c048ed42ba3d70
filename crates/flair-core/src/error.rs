// ── Core error types ──
//
// Errors surfaced by the coordinator and the entity views. Consumers never
// see HTTP status codes or JSON decode failures directly; the
// `From<flair_api::Error>` impl folds them into the coordinator taxonomy.

use thiserror::Error;

/// How a failure should be treated by the poller and by dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Credentials rejected. Polling pauses until re-authentication.
    Auth,
    /// Timeout, connection failure, malformed or generic API failure.
    Transient,
    /// The account returned zero structures.
    EmptyResult,
    /// A write was refused locally or the input was invalid.
    Rejected,
}

/// Unified error type for the core crate.
///
/// `Clone` so a single refresh outcome can be handed to every caller that
/// joined the in-flight request.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Flair API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Coordinator is not running")]
    CoordinatorStopped,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No structures returned for this account")]
    EmptyResult,

    #[error("No users returned for this account")]
    NoUsers,

    #[error("Malformed response from the Flair API: {message}")]
    MalformedResponse { message: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Classify this error for retry and status reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthenticationFailed { .. } => FailureKind::Auth,
            Self::EmptyResult | Self::NoUsers => FailureKind::EmptyResult,
            Self::NotFound { .. }
            | Self::Rejected { .. }
            | Self::ValidationFailed { .. }
            | Self::Config { .. } => FailureKind::Rejected,
            Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::CoordinatorStopped
            | Self::MalformedResponse { .. }
            | Self::Api { .. }
            | Self::Internal(_) => FailureKind::Transient,
        }
    }

    /// Shorthand for `kind() == FailureKind::Auth`.
    pub fn is_auth(&self) -> bool {
        self.kind() == FailureKind::Auth
    }

    pub(crate) fn not_found(entity_type: &str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<flair_api::Error> for CoreError {
    fn from(err: flair_api::Error) -> Self {
        match err {
            flair_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            flair_api::Error::Transport(ref e) => {
                if e.status().map(|s| s.as_u16()) == Some(401) {
                    CoreError::AuthenticationFailed {
                        message: e.to_string(),
                    }
                } else if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else if e.is_decode() {
                    CoreError::MalformedResponse {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            flair_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            flair_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            flair_api::Error::Api { status: 404, message } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            flair_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            flair_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
            flair_api::Error::NoUsers => CoreError::NoUsers,
            flair_api::Error::NoStructures => CoreError::EmptyResult,
        }
    }
}
