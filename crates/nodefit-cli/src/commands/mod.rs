//! CLI command implementations

pub mod inspect;
pub mod recommend;
pub mod simulate;

use std::path::Path;

use anyhow::Result;
use nodefit_core::config::Settings;

/// Loads settings from the optional config file and validates them after
/// the caller's flag overrides have been applied.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    Ok(Settings::load(config_path)?)
}
