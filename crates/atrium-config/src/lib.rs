// SPDX-FileCopyrightText: 2026 Atrium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Atrium claim engine.
//!
//! Layers compiled defaults, `atrium.toml` files and `ATRIUM_*` environment
//! variables, rejects unknown keys, then runs semantic checks (work groups,
//! capacity bounds, phone identity rules). Failures come back as a list of
//! [`ConfigError`]s ready for [`render_errors`].
//!
//! ```no_run
//! let config = match atrium_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         atrium_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("{} work groups", config.work_groups.len());
//! ```

use std::path::{Path, PathBuf};

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AtriumConfig;

/// Load from the standard file locations and validate.
pub fn load_and_validate() -> Result<AtriumConfig, Vec<ConfigError>> {
    checked(loader::load_config(), standard_sources)
}

/// Load from an explicit file (env overrides still apply) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<AtriumConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path.to_path_buf()).into_iter().collect()
    })
}

/// Load from an in-memory TOML document and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<AtriumConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate a loaded config, or explain a figment failure against the
/// TOML text `sources` returns. Sources are only read on failure.
fn checked(
    loaded: Result<AtriumConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<AtriumConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn standard_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join("atrium.toml"))
        .unwrap_or_else(|_| PathBuf::from("atrium.toml"));
    let user = dirs::config_dir().map(|d| d.join("atrium").join("atrium.toml"));
    let system = Some(PathBuf::from("/etc/atrium/atrium.toml"));

    [Some(local), user, system]
        .into_iter()
        .flatten()
        .filter_map(read_source)
        .collect()
}

fn read_source(path: PathBuf) -> Option<(String, String)> {
    let content = std::fs::read_to_string(&path).ok()?;
    Some((path.display().to_string(), content))
}
