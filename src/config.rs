//! Preferences file location
//!
//! The preferences file lives in the working directory unless overridden.
//! Precedence: `--config` on the command line, then the environment, then the
//! default file name.
//!
//! Environment variables (all optional):
//! - STANDUP_CONFIG: Path to the preferences file

use crate::constants::{PREFERENCES_ENV_VAR, PREFERENCES_FILE_NAME};
use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;

/// Parse the STANDUP_CONFIG environment variable
///
/// Returns Some(path) if set to a non-empty value
/// Returns None if not set or empty
pub fn parse_config_path_override() -> Option<PathBuf> {
    match env::var(PREFERENCES_ENV_VAR) {
        Ok(val) if val.trim().is_empty() => {
            warn!("{} is empty. Using default location.", PREFERENCES_ENV_VAR);
            None
        }
        Ok(val) => {
            info!("Preferences path set via environment variable: {}", val);
            Some(PathBuf::from(val.trim()))
        }
        Err(e) => {
            debug!("{} not set ({}).", PREFERENCES_ENV_VAR, e);
            None
        }
    }
}

/// Resolve where the preferences file lives
pub fn resolve_preferences_path(cli_override: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_override {
        info!("Preferences path set via command line: {}", path.display());
        return path;
    }
    parse_config_path_override().unwrap_or_else(|| PathBuf::from(PREFERENCES_FILE_NAME))
}
