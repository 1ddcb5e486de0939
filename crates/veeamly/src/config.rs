//! CLI configuration: thin wrapper around `veeamly_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --port, --username, --insecure, --api-version, --timeout).

use std::time::Duration;

use veeamly_core::{ServerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use veeamly_config::{
    Config, Profile, config_path, load_config_or_default, registry_path, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Build the `ServerConfig` for this invocation.
///
/// A matching profile is the base; flags override it. Without a profile
/// `--host` is mandatory and credentials come from flags / environment.
pub fn resolve_server_config(global: &GlobalOpts) -> Result<(String, ServerConfig), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            let available: Vec<_> = cfg.profiles.keys().cloned().collect();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    apply_overrides(&mut profile, global);
    if profile.host.is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }

    let mut server = veeamly_config::profile_to_server_config(&profile, &profile_name, &cfg.defaults)?;
    if let Some(secs) = global.timeout {
        server.timeout = Duration::from_secs(secs);
    }
    Ok((profile_name, server))
}

/// Fold flag values into the profile before translation.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if global.port.is_some() {
        profile.port = global.port;
    }
    if global.username.is_some() {
        profile.username.clone_from(&global.username);
    }
    if global.api_version.is_some() {
        profile.api_version.clone_from(&global.api_version);
    }
    if global.insecure {
        profile.verify_tls = Some(false);
    }
}

/// Describe the TLS mode for `config show` / diagnostics.
pub fn describe_tls(tls: &TlsVerification) -> String {
    match tls {
        TlsVerification::SystemDefaults => "system CA store".into(),
        TlsVerification::CustomCa(path) => format!("custom CA ({})", path.display()),
        TlsVerification::DangerAcceptInvalid => "not verified".into(),
    }
}
