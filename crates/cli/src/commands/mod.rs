pub mod config_cmd;
pub mod profiles;
pub mod screen;
pub mod serve;

use promptline_config::{AppConfig, ConfigError};
use std::path::Path;

/// Load config from `path` when given, otherwise from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}
