// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./atenea.toml` > `~/.config/atenea/atenea.toml` > `/etc/atenea/atenea.toml`
//! with environment variable overrides via `ATENEA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AteneaConfig;

/// Sections reachable through `ATENEA_<SECTION>_<KEY>` variables.
///
/// Longer names first so `business_hours_` wins over any shorter prefix.
const ENV_SECTIONS: &[&str] = &[
    "business_hours",
    "presence",
    "dispatch",
    "handoff",
    "service",
    "storage",
    "gateway",
    "bot",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/atenea/atenea.toml` (system-wide)
/// 3. `~/.config/atenea/atenea.toml` (user XDG config)
/// 4. `./atenea.toml` (local directory)
/// 5. `ATENEA_*` environment variables
pub fn load_config() -> Result<AteneaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AteneaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AteneaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AteneaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AteneaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// TOML files layered over the defaults, lowest precedence first.
pub fn config_file_layers() -> Vec<PathBuf> {
    let mut layers = vec![PathBuf::from("/etc/atenea/atenea.toml")];
    if let Some(dir) = dirs::config_dir() {
        layers.push(dir.join("atenea/atenea.toml"));
    }
    layers.push(PathBuf::from("atenea.toml"));
    layers
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(AteneaConfig::default()));
    config_file_layers()
        .into_iter()
        .fold(figment, |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// `gateway_bearer_token` becomes `gateway.bearer_token`, never
/// `gateway.bearer.token`. Keys outside a known section pass through.
pub fn env_key_to_path(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("ATENEA_").map(|key| env_key_to_path(key.as_str()).into())
}
