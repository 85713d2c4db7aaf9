// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Atenea contact-center core.
//!
//! `atenea.toml` layers (system, user, local) are merged over compiled
//! defaults with `ATENEA_*` overrides on top. Every table rejects unknown
//! keys, and a loaded config is validated as a whole: catalog references
//! between `[[channels]]`, `[[channel_states]]`, `[[automatic_messages]]`
//! and `[[dispatch.relays]]` must resolve. Failures come back as miette
//! diagnostics pointing into the offending file.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AteneaConfig;

/// Load the layered configuration and validate it.
pub fn load_and_validate() -> Result<AteneaConfig, Vec<ConfigError>> {
    checked(loader::load_config(), layer_sources)
}

/// Load one explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<AteneaConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load a TOML string (no files, no env) and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<AteneaConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a loaded config, or turns the figment error into diagnostics.
///
/// Sources are read only on failure, for span lookup.
fn checked(
    loaded: Result<AteneaConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<AteneaConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn layer_sources() -> Vec<(String, String)> {
    loader::config_file_layers()
        .iter()
        .filter_map(|path| read_source(path))
        .collect()
}

/// File content keyed by the absolute path figment records in metadata.
fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Some((absolute.display().to_string(), content))
}
