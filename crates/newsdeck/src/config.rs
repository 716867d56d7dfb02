//! Resolve the effective configuration and build a `NewsClient` from it.
//!
//! Precedence: command-line flags, then `NEWSDECK_*` environment variables,
//! then the config file, then built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use newsdeck_config::{Config, HumanDuration};
use newsdeck_core::{FileStore, HttpUpstream, NewsClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file this invocation reads.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(newsdeck_config::config_path)
}

/// Load the config file and apply command-line overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = newsdeck_config::load_config_from(&resolve_path(global))?;

    if let Some(ref url) = global.hn_url {
        cfg.api.hn_url.clone_from(url);
    }
    if let Some(ref url) = global.algolia_url {
        cfg.api.algolia_url.clone_from(url);
    }
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "--timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        cfg.api.timeout = HumanDuration(Duration::from_secs(secs));
    }
    if global.no_cache {
        cfg.cache.persist = false;
    }
    Ok(cfg)
}

/// Build the client every data command runs against.
pub fn build_client(cfg: &Config) -> Result<NewsClient, CliError> {
    let core = cfg.to_core_config()?;
    let endpoints = cfg.api_endpoints()?;
    let upstream = HttpUpstream::from_endpoints(endpoints.hn, endpoints.algolia, &endpoints.transport)?;

    let client = match cfg.store_dir() {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "persisting cache entries");
            NewsClient::with_store(core, Arc::new(upstream), Arc::new(FileStore::new(dir)))
        }
        None => NewsClient::new(core, Arc::new(upstream)),
    };
    Ok(client)
}
