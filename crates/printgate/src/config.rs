//! CLI configuration: thin wrapper around `printgate_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--service, --timeout, etc.).

use std::time::Duration;

use printgate_core::{ServiceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use printgate_config::{
    Config, DEFAULT_SERVICE_URL, Profile, config_path, load_config,
    load_config_or_default, parse_service_url, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ServiceConfig` from the config file, profile, and CLI overrides.
///
/// Without a profile, `--service` (or the default local URL) suffices.
pub fn build_service_config(global: &GlobalOpts) -> Result<ServiceConfig, CliError> {
    let cfg = load_config()?;
    let selected = cfg.select_profile(global.profile.as_deref()).map_err(|_| {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        CliError::ProfileNotFound {
            name: global.profile.clone().unwrap_or_default(),
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        }
    })?;

    let mut config = match selected {
        Some((name, profile)) => {
            tracing::debug!(profile = %name, "using profile");
            printgate_config::profile_to_service_config(profile, &cfg.defaults)?
        }
        None => ServiceConfig::new(parse_service_url("service", DEFAULT_SERVICE_URL)?),
    };

    apply_overrides(&mut config, global)?;
    Ok(config)
}

/// CLI flag overrides take priority over profile values.
fn apply_overrides(config: &mut ServiceConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref raw) = global.service {
        let url = parse_service_url("service", raw)?;
        // An explicit service moves the push channel with it unless
        // --push-url says otherwise.
        config.push_url = url.clone();
        config.url = url;
    }
    if let Some(ref raw) = global.push_url {
        config.push_url = parse_service_url("push-url", raw)?;
    }
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = global.session_timeout {
        config.session_timeout = Some(Duration::from_secs(secs));
    }
    Ok(())
}
