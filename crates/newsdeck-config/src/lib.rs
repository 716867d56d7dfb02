//! Configuration for newsdeck.
//!
//! A TOML file in the platform config directory, merged over built-in
//! defaults and `NEWSDECK_` environment variables, then validated and
//! translated into `newsdeck_core::CoreConfig` plus the endpoints the HTTP
//! clients need. Durations are written the human way (`50ms`, `5m`, `1h`).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use newsdeck_api::TransportConfig;
use newsdeck_core::{BatchConfig, CacheConfig, CoreConfig, RateLimit};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Human-readable durations ────────────────────────────────────────

/// A `Duration` read from and written as `"50ms"`, `"5m"`, `"1h 30m"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub batch: BatchSection,

    #[serde(default)]
    pub cache: CacheSection,

    /// Provider quotas keyed by provider name (`hn`, `algolia`, ...).
    #[serde(default)]
    pub rate_limits: HashMap<String, RateLimitSection>,

    /// Provider whose quota item fetches run under. Unset = unthrottled.
    #[serde(default)]
    pub item_provider: Option<String>,

    #[serde(default = "default_search_provider")]
    pub search_provider: String,

    /// Presentation defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        let core = CoreConfig::default();
        Self {
            api: ApiSection::default(),
            batch: BatchSection::default(),
            cache: CacheSection::default(),
            rate_limits: core
                .rate_limits
                .into_iter()
                .map(|(provider, limit)| (provider, RateLimitSection::from(limit)))
                .collect(),
            item_provider: core.item_provider,
            search_provider: core.search_provider,
            defaults: Defaults::default(),
        }
    }
}

fn default_search_provider() -> String {
    newsdeck_core::config::ALGOLIA_PROVIDER.into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiSection {
    #[serde(default = "default_hn_url")]
    pub hn_url: String,

    #[serde(default = "default_algolia_url")]
    pub algolia_url: String,

    #[serde(default = "default_timeout")]
    pub timeout: HumanDuration,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            hn_url: default_hn_url(),
            algolia_url: default_algolia_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_hn_url() -> String {
    newsdeck_api::hn::DEFAULT_BASE_URL.into()
}
fn default_algolia_url() -> String {
    newsdeck_api::algolia::DEFAULT_BASE_URL.into()
}
fn default_timeout() -> HumanDuration {
    HumanDuration(TransportConfig::default().timeout)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchSection {
    #[serde(default = "default_batch_size")]
    pub size: usize,

    #[serde(default = "default_batch_delay")]
    pub delay: HumanDuration,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            delay: default_batch_delay(),
        }
    }
}

fn default_batch_size() -> usize {
    BatchConfig::default().size
}
fn default_batch_delay() -> HumanDuration {
    HumanDuration(BatchConfig::default().delay)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl")]
    pub default_ttl: HumanDuration,

    /// Per-scope TTLs (`story`, `user`, `feed`, `search`).
    #[serde(default = "default_scope_ttls")]
    pub ttl: HashMap<String, HumanDuration>,

    /// Keep cache entries on disk between runs.
    #[serde(default)]
    pub persist: bool,

    /// Where persisted entries live. Defaults to the platform cache dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            ttl: default_scope_ttls(),
            persist: false,
            dir: None,
        }
    }
}

fn default_ttl() -> HumanDuration {
    HumanDuration(CacheConfig::default().default_ttl)
}
fn default_scope_ttls() -> HashMap<String, HumanDuration> {
    CacheConfig::default()
        .scope_ttls
        .into_iter()
        .map(|(scope, ttl)| (scope, HumanDuration(ttl)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitSection {
    pub max_requests: usize,
    pub window: HumanDuration,
}

impl From<RateLimit> for RateLimitSection {
    fn from(limit: RateLimit) -> Self {
        Self {
            max_requests: limit.max_requests,
            window: HumanDuration(limit.window),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Translation ─────────────────────────────────────────────────────

/// Base URLs and transport settings for the HTTP clients.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub hn: url::Url,
    pub algolia: url::Url,
    pub transport: TransportConfig,
}

impl Config {
    /// Validate and build the runtime configuration.
    pub fn to_core_config(&self) -> Result<CoreConfig, ConfigError> {
        if self.batch.size == 0 {
            return Err(invalid("batch.size", "must be at least 1"));
        }

        let mut rate_limits = HashMap::with_capacity(self.rate_limits.len());
        for (provider, limit) in &self.rate_limits {
            let field = format!("rate_limits.{provider}");
            if limit.max_requests == 0 {
                return Err(invalid(&field, "max_requests must be at least 1"));
            }
            if limit.window.0.is_zero() {
                return Err(invalid(&field, "window must be longer than zero"));
            }
            rate_limits.insert(
                provider.clone(),
                RateLimit::new(limit.max_requests, limit.window.0),
            );
        }

        if self.search_provider.trim().is_empty() {
            return Err(invalid("search_provider", "must not be empty"));
        }
        let item_provider = self
            .item_provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned);

        Ok(CoreConfig {
            batch: BatchConfig {
                size: self.batch.size,
                delay: self.batch.delay.0,
            },
            cache: CacheConfig {
                default_ttl: self.cache.default_ttl.0,
                scope_ttls: self
                    .cache
                    .ttl
                    .iter()
                    .map(|(scope, ttl)| (scope.clone(), ttl.0))
                    .collect(),
            },
            rate_limits,
            item_provider,
            search_provider: self.search_provider.clone(),
        })
    }

    /// Parse the configured base URLs.
    pub fn api_endpoints(&self) -> Result<ApiEndpoints, ConfigError> {
        let parse = |field: &str, raw: &str| {
            url::Url::parse(raw).map_err(|e| invalid(field, format!("invalid URL '{raw}': {e}")))
        };
        if self.api.timeout.0.is_zero() {
            return Err(invalid("api.timeout", "must be longer than zero"));
        }
        Ok(ApiEndpoints {
            hn: parse("api.hn_url", &self.api.hn_url)?,
            algolia: parse("api.algolia_url", &self.api.algolia_url)?,
            transport: TransportConfig::default().with_timeout(self.api.timeout.0),
        })
    }

    /// Directory for persisted cache entries, if persistence is on.
    pub fn store_dir(&self) -> Option<PathBuf> {
        if !self.cache.persist {
            return None;
        }
        Some(self.cache.dir.clone().unwrap_or_else(cache_dir))
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "newsdeck", "newsdeck")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of persisted cache entries.
pub fn cache_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".cache"),
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("newsdeck");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `NEWSDECK_` variables.
///
/// Nested keys use a double underscore: `NEWSDECK_BATCH__SIZE=10`.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NEWSDECK_").split("__"))
}

/// Load the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(figment_for(path).extract()?)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}
