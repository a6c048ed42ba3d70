//! CLI error types with miette diagnostics.
//!
//! Folds `CoreError` and `ConfigError` into user-facing errors with help
//! text and a stable exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use flair_config::ConfigError;
use flair_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Flair API")]
    #[diagnostic(
        code(flair::connection_failed),
        help("Check your network connection.\nDetail: {reason}")
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(flair::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed for profile '{profile}'")]
    #[diagnostic(
        code(flair::auth_failed),
        help(
            "The Flair API rejected the client credentials: {message}\n\
             Update the secret with: flair config set-secret --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(flair::no_credentials),
        help(
            "Configure credentials with: flair config init\n\
             Or set FLAIR_CLIENT_ID and FLAIR_CLIENT_SECRET."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(flair::not_found),
        help("Run: flair entities list --all")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("The account has no structures")]
    #[diagnostic(
        code(flair::empty_account),
        help("Add a home in the Flair app, then try again.")
    )]
    EmptyAccount,

    // ── Writes ───────────────────────────────────────────────────────
    #[error("Write rejected: {message}")]
    #[diagnostic(code(flair::rejected))]
    Rejected { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(flair::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(flair::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(flair::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: flair config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Could not access the system keyring: {message}")]
    #[diagnostic(
        code(flair::keyring),
        help("Store the secret in the profile instead, or set FLAIR_CLIENT_SECRET.")
    )]
    Keyring { message: String },

    #[error(transparent)]
    #[diagnostic(code(flair::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to a core error.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },

            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },

            CoreError::EmptyResult | CoreError::NoUsers => Self::EmptyAccount,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                resource_type: entity_type,
                identifier,
            },

            CoreError::Rejected { message } => Self::Rejected { message },

            CoreError::ValidationFailed { message } => Self::Validation {
                field: "value".into(),
                reason: message,
            },

            other @ (CoreError::CoordinatorStopped
            | CoreError::MalformedResponse { .. }
            | CoreError::Api { .. }
            | CoreError::Config { .. }
            | CoreError::Internal(_)) => Self::ApiError {
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Keyring(message) => Self::Keyring { message },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}
