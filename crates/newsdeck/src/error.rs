//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use newsdeck_config::ConfigError;
use newsdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const RATE_LIMITED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {url}")]
    #[diagnostic(
        code(newsdeck::connection_failed),
        help(
            "Check your network connection and the configured API URLs.\n\
             Reason: {reason}\n\
             Try: newsdeck config show"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Upstream is rate limiting requests")]
    #[diagnostic(
        code(newsdeck::rate_limited),
        help("Wait {retry_after_secs}s before retrying, or lower the request volume.")
    )]
    RateLimited { retry_after_secs: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(newsdeck::not_found),
        help("It may have been deleted, or the id may be wrong.")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("Upstream error: {message}")]
    #[diagnostic(code(newsdeck::upstream))]
    Upstream { message: String },

    #[error("'{operation}' is not available from the configured upstream")]
    #[diagnostic(code(newsdeck::unsupported))]
    Unsupported { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(newsdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(newsdeck::config_exists),
        help(
            "Found: {path}\n\
             Use --force to overwrite it."
        )
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(newsdeck::config),
        help("Check the config file and NEWSDECK_* environment variables.")
    )]
    Config(#[from] ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(newsdeck::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(newsdeck::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(newsdeck::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(newsdeck::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    pub fn not_found(resource_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.to_string(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::RateLimited { retry_after_secs } => {
                CliError::RateLimited { retry_after_secs }
            }
            CoreError::Upstream { message, .. } => CliError::Upstream { message },
            CoreError::Unsupported { operation } => CliError::Unsupported { operation },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other @ (CoreError::Decode { .. }
            | CoreError::ServiceDestroyed { .. }
            | CoreError::Cache { .. }
            | CoreError::Internal(_)) => CliError::Internal(other.to_string()),
        }
    }
}
