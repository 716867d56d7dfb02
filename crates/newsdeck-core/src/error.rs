// ── Core error types ──
//
// User-facing errors from newsdeck-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<newsdeck_api::Error>`
// impl translates transport-layer errors into domain variants.
//
// The type is `Clone` because one in-flight fetch result is shared by
// every caller that joined it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Upstream errors ──────────────────────────────────────────────
    #[error("Cannot reach upstream {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Upstream request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Upstream rate limited the request -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Malformed upstream data: {message}")]
    Decode { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported by this upstream: {operation}")]
    Unsupported { operation: String },

    #[error("{service} has been shut down")]
    ServiceDestroyed { service: &'static str },

    // ── Cache errors ─────────────────────────────────────────────────
    #[error("Cache error for {scope}/{key}: {message}")]
    Cache {
        scope: String,
        key: String,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::RateLimited { .. }
        ) || matches!(self, Self::Upstream { status: Some(s), .. } if *s >= 500)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<newsdeck_api::Error> for CoreError {
    fn from(err: newsdeck_api::Error) -> Self {
        match err {
            newsdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Upstream {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            newsdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            newsdeck_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            newsdeck_api::Error::ClientBuild(message) => CoreError::Config { message },
            newsdeck_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            newsdeck_api::Error::Status {
                status,
                url,
                message,
            } => CoreError::Upstream {
                message: format!("{url}: {message}"),
                status: Some(status),
            },
            newsdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rate_limit_maps_to_transient() {
        let err = CoreError::from(newsdeck_api::Error::RateLimited {
            retry_after_secs: 30,
        });
        assert_eq!(err, CoreError::RateLimited { retry_after_secs: 30 });
        assert!(err.is_transient());
    }

    #[test]
    fn api_status_keeps_code() {
        let err = CoreError::from(newsdeck_api::Error::Status {
            status: 502,
            url: "https://example.com/item/1.json".into(),
            message: "bad gateway".into(),
        });
        assert!(matches!(err, CoreError::Upstream { status: Some(502), .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn decode_errors_are_not_transient() {
        let err = CoreError::from(newsdeck_api::Error::Deserialization {
            message: "expected value".into(),
            body: "{".into(),
        });
        assert!(!err.is_transient());
    }

    #[test]
    fn service_destroyed_names_service() {
        let err = CoreError::ServiceDestroyed {
            service: "batched loader",
        };
        assert_eq!(err.to_string(), "batched loader has been shut down");
    }
}
