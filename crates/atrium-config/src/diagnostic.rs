// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports what went wrong but not where. This module turns its
//! errors into [`ConfigError`] values that miette renders with a pointer
//! into the offending `atrium.toml`, plus a "did you mean" hint for typos
//! in key names (Jaro-Winkler via `strsim`).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity a known key must reach before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section))]
    #[diagnostic(code(atrium::config::unknown_key), help("{}", unknown_key_help(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        /// Dotted table path the key appeared under (empty at top level).
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(atrium::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}` in {}", section_label(section))]
    #[diagnostic(code(atrium::config::missing_key), help("add `{key} = ...` to this table"))]
    MissingKey { key: String, section: String },

    /// A value that parsed but does not make sense (see `validation`).
    #[error("{message}")]
    #[diagnostic(code(atrium::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(atrium::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? known keys: {valid_keys}"),
        None => format!("known keys: {valid_keys}"),
    }
}

/// TOML text that fed the figment, keyed by file path.
struct Sources<'a>(&'a [(String, String)]);

impl Sources<'_> {
    /// Point at `key` inside the file `error` came from.
    fn locate(
        &self,
        error: &figment::Error,
        table: &[String],
        key: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some(figment::Source::File(path)) =
            error.metadata.as_ref().and_then(|m| m.source.as_ref())
        else {
            return (None, None);
        };
        let path = path.display().to_string();
        let Some((name, content)) = self.0.iter().find(|(p, _)| *p == path) else {
            return (None, None);
        };
        match find_key_offset(content, table, key) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Convert every error figment collected into a [`ConfigError`].
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = Sources(toml_sources);
    err.into_iter().map(|e| convert(&sources, e)).collect()
}

fn convert(sources: &Sources<'_>, error: figment::Error) -> ConfigError {
    // figment paths may include array indices for [[work_groups]]; drop them.
    let table: Vec<String> = error
        .path
        .iter()
        .filter(|p| p.parse::<usize>().is_err())
        .cloned()
        .collect();

    match &error.kind {
        Kind::UnknownField(key, expected) => {
            let (span, src) = sources.locate(&error, &table, key);
            ConfigError::UnknownKey {
                key: key.clone(),
                section: table.join("."),
                suggestion: suggest_key(key, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(key) => ConfigError::MissingKey {
            key: key.to_string(),
            section: table.join("."),
        },
        Kind::InvalidType(found, expected) => {
            let (parent, leaf) = match table.split_last() {
                Some((leaf, parent)) => (parent, leaf.as_str()),
                None => (&[][..], ""),
            };
            let (span, src) = sources.locate(&error, parent, leaf);
            ConfigError::InvalidType {
                key: table.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Byte offset of `key = ...` inside the table named by `table`.
///
/// Only the first segment of `table` is matched against headers, which
/// covers both `[server]` and `[[work_groups]]`. An empty `table` searches
/// the lines before the first header.
pub fn find_key_offset(content: &str, table: &[String], key: &str) -> Option<usize> {
    let wanted = table.first().map(String::as_str);
    let mut current: Option<&str> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            current = Some(trimmed.trim().trim_matches(['[', ']']).trim());
        } else if current == wanted
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest known key to `unknown`, when one is close enough to be a typo.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|k| (strsim::jaro_winkler(unknown, k), *k))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, k)| k.to_string())
}

/// Print each error to stderr the way miette's graphical handler lays it out.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
