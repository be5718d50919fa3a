//! Shared configuration for printgate.
//!
//! TOML profiles with environment overrides, and translation to
//! `printgate_core::ServiceConfig`. The CLI adds `GlobalOpts`-aware
//! wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printgate_core::{ServiceConfig, TlsVerification};

/// Service root used when neither a profile nor a flag names one.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:3000";

/// Environment prefix for config overrides (`PRINTGATE_DEFAULTS__TIMEOUT=60`).
pub const ENV_PREFIX: &str = "PRINTGATE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

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

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile to use: `requested` if given, else `default_profile`.
    ///
    /// Returns `Ok(None)` when nothing was requested and the default
    /// profile is not defined, so a bare `--service` still works.
    pub fn select_profile(
        &self,
        requested: Option<&str>,
    ) -> Result<Option<(String, &Profile)>, ConfigError> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .map(|p| Some((name.to_owned(), p)))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }
        Ok(self
            .default_profile
            .as_deref()
            .and_then(|name| self.profiles.get(name).map(|p| (name.to_owned(), p))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
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
    30
}

/// A named device-service profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "http://localhost:3000").
    pub service: String,

    /// Push channel base URL. Defaults to `service`.
    pub push_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Consecutive push reconnection failures tolerated. 0 = forever.
    pub reconnect_attempts: Option<u32>,

    /// Give up on a push-awaiting operation after this many seconds.
    pub session_timeout: Option<u64>,
}

impl Profile {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            push_url: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            reconnect_attempts: None,
            session_timeout: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "printgate", "printgate").map_or_else(
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
    p.push("printgate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and validate a service URL.
pub fn parse_service_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected an http or https URL, got scheme '{other}'"),
        }),
    }
}

/// Build a `ServiceConfig` from a profile, no CLI flag overrides.
pub fn profile_to_service_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ServiceConfig, ConfigError> {
    let url = parse_service_url("service", &profile.service)?;
    let push_url = match profile.push_url.as_deref() {
        Some(raw) => parse_service_url("push_url", raw)?,
        None => url.clone(),
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ServiceConfig::new(url);
    config.push_url = push_url;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(attempts) = profile.reconnect_attempts {
        config.reconnect_attempts = (attempts > 0).then_some(attempts);
    }
    config.session_timeout = profile.session_timeout.map(Duration::from_secs);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut bench = Profile::new("http://10.0.0.5:3000");
        bench.session_timeout = Some(90);
        cfg.profiles.insert("bench".into(), bench);
        cfg.default_profile = Some("bench".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn profile_translation_applies_overrides() {
        let mut profile = Profile::new("http://10.0.0.5:3000");
        profile.push_url = Some("http://10.0.0.5:4000".into());
        profile.reconnect_attempts = Some(0);
        profile.session_timeout = Some(120);

        let config = profile_to_service_config(&profile, &Defaults::default()).unwrap();

        assert_eq!(config.url.as_str(), "http://10.0.0.5:3000/");
        assert_eq!(config.push_url.as_str(), "http://10.0.0.5:4000/");
        assert_eq!(config.reconnect_attempts, None);
        assert_eq!(config.session_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn push_url_defaults_to_service() {
        let config =
            profile_to_service_config(&Profile::new(DEFAULT_SERVICE_URL), &Defaults::default())
                .unwrap();
        assert_eq!(config.push_url, config.url);
        assert_eq!(config.reconnect_attempts, Some(5));
    }

    #[test]
    fn rejects_non_http_service() {
        let err = profile_to_service_config(&Profile::new("ftp://x"), &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "service"));
    }

    #[test]
    fn unknown_requested_profile_is_an_error() {
        let cfg = Config::default();
        assert!(cfg.select_profile(Some("lab")).is_err());
        assert!(cfg.select_profile(None).unwrap().is_none());
    }
}
