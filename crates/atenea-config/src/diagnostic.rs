// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration errors as miette diagnostics.
//!
//! Figment reports a failure against a key path such as `gateway` +
//! `prot` or `channel_states` + `catgory`. The helpers here map that path
//! back onto the TOML text, including repeated `[[array]]` tables, and
//! suggest the closest valid key or catalog value by Jaro-Winkler
//! similarity.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Tables written as `[[name]]` arrays in atenea.toml.
pub const ARRAY_TABLES: &[&str] = &[
    "channels",
    "consult_types",
    "channel_states",
    "automatic_messages",
    "dispatch.relays",
    "business_hours.days",
];

/// A configuration error with enough context for miette to point at it.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that the table does not accept.
    #[error("unknown key `{key}` in {table}")]
    #[diagnostic(
        code(atenea::config::unknown_key),
        help("{}", choice_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Table label, e.g. `[gateway]` or `[[channel_states]]`.
        table: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(atenea::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required key is absent.
    #[error("{table} is missing `{key}`")]
    #[diagnostic(
        code(atenea::config::missing_key),
        help("{}", missing_key_help(table, key))
    )]
    MissingKey { key: String, table: String },

    /// A value naming a catalog entry (channel code, state category, ...)
    /// that the configuration does not define.
    #[error("`{key}` refers to unknown {catalog} `{value}`")]
    #[diagnostic(
        code(atenea::config::unknown_reference),
        help("{}", choice_help(suggestion.as_deref(), known))
    )]
    UnknownReference {
        key: String,
        value: String,
        catalog: &'static str,
        suggestion: Option<String>,
        known: String,
    },

    /// A semantic check failed after deserialization.
    #[error("validation error: {message}")]
    #[diagnostic(code(atenea::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(atenea::config::other))]
    Other(String),
}

impl ConfigError {
    /// `key = value` names an entry missing from `known`.
    pub fn unknown_reference(
        key: impl Into<String>,
        value: &str,
        catalog: &'static str,
        known: &[&str],
    ) -> Self {
        Self::UnknownReference {
            key: key.into(),
            value: value.to_string(),
            catalog,
            suggestion: suggest_key(value, known),
            known: known.join(", "),
        }
    }
}

fn choice_help(suggestion: Option<&str>, choices: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid values: {choices}"),
        None => format!("valid values: {choices}"),
    }
}

fn missing_key_help(table: &str, key: &str) -> String {
    if table.starts_with("[[") {
        format!("every {table} entry needs `{key} = <value>`")
    } else {
        format!("add `{key} = <value>` under {table} in atenea.toml")
    }
}

/// Human label for the table a figment path points into.
///
/// Numeric segments (array indices) are dropped.
pub fn table_label(path: &[String]) -> String {
    let name = table_name(path);
    if name.is_empty() {
        "the top level".to_string()
    } else if ARRAY_TABLES.contains(&name.as_str()) {
        format!("[[{name}]]")
    } else {
        format!("[{name}]")
    }
}

fn table_name(path: &[String]) -> String {
    path.iter()
        .filter(|s| s.parse::<usize>().is_err())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// Convert a figment error (possibly several) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, &error.path, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    table: table_label(&error.path),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
                table: table_label(&error.path),
            },
            Kind::InvalidType(found, expected) => {
                let (span, src) = match error.path.split_last() {
                    Some((field, table)) => locate(&error, table, field, toml_sources),
                    None => (None, None),
                };
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Finds `field` in the file the error came from; inline sources are all
/// searched.
fn locate(
    error: &figment::Error,
    table: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => Some(path.display().to_string()),
        _ => None,
    };
    toml_sources
        .iter()
        .filter(|(name, _)| origin.as_ref().is_none_or(|o| o == name))
        .find_map(|(name, content)| {
            let offset = find_key_offset(content, table, field)?;
            Some((
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(name, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the table addressed by `path`.
///
/// A numeric segment picks the n-th `[[table]]` block; otherwise the first
/// block holding the key wins. Keys of later tables are never matched.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let index = path.iter().find_map(|s| s.parse::<usize>().ok());
    let blocks = table_blocks(content, &table_name(path));
    match index {
        Some(i) => blocks.get(i).and_then(|block| key_in_block(content, *block, field)),
        None => blocks
            .iter()
            .find_map(|block| key_in_block(content, *block, field)),
    }
}

/// Byte ranges of every body of `table`. The empty name is the top level,
/// which ends at the first header.
fn table_blocks(content: &str, table: &str) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut open = table.is_empty().then_some(0);
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if let Some(name) = header_name(line.trim()) {
            if let Some(start) = open.take() {
                blocks.push((start, offset));
            }
            if name == table {
                open = Some(offset + line.len());
            }
        }
        offset += line.len();
    }
    if let Some(start) = open {
        blocks.push((start, content.len()));
    }
    blocks
}

fn header_name(line: &str) -> Option<&str> {
    let inner = line
        .strip_prefix("[[")
        .and_then(|l| l.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|l| l.strip_suffix(']')))?;
    Some(inner.trim())
}

fn key_in_block(content: &str, (start, end): (usize, usize), field: &str) -> Option<usize> {
    let mut offset = start;
    for line in content[start..end].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    if errors.len() > 1 {
        eprintln!("{} configuration errors", errors.len());
    }
}
