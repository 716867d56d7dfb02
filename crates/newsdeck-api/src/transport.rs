// Shared transport configuration for building reqwest::Client instances.
//
// The item and search clients share timeout and user-agent settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("newsdeck/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Map a reqwest failure, surfacing timeouts as `Error::Timeout`.
pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else {
        Error::Transport(err)
    }
}

/// Read a response body and decode it, keeping a preview of the body on failure.
pub(crate) async fn decode_body<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

/// Turn a non-success status into an error. 404 is handled by the callers.
pub(crate) async fn status_error(resp: reqwest::Response) -> Error {
    let status = resp.status();
    let url = resp.url().to_string();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Error::RateLimited { retry_after_secs };
    }

    let body = resp.text().await.unwrap_or_default();
    Error::Status {
        status: status.as_u16(),
        url,
        message: body.chars().take(200).collect(),
    }
}

/// Base URLs are joined against, so they must end in `/`.
pub(crate) fn ensure_trailing_slash(mut url: url::Url) -> url::Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
