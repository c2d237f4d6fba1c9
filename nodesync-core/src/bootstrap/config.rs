//! Configuration loading

use std::path::Path;

use crate::{Config, Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "NODESYNC_CONFIG_PATH";

const CWD_CONFIG: &str = "config.yaml";
const SYSTEM_CONFIG: &str = "/etc/nodesync/config.yaml";

/// Pick the config file to load.
///
/// Search order:
/// 1. explicit path (command line)
/// 2. `NODESYNC_CONFIG_PATH`
/// 3. ./config.yaml
/// 4. /etc/nodesync/config.yaml
///
/// An explicit path that does not exist is an error; the fallbacks are
/// skipped silently.
pub fn resolve_config_path(explicit: Option<&str>) -> Result<Option<String>> {
    if let Some(path) = explicit {
        if !Path::new(path).exists() {
            return Err(Error::Config(format!("config file '{path}' does not exist")));
        }
        return Ok(Some(path.to_string()));
    }

    let found = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| Path::new(p).exists())
        .or_else(|| {
            [CWD_CONFIG, SYSTEM_CONFIG]
                .into_iter()
                .find(|p| Path::new(p).exists())
                .map(str::to_string)
        });

    Ok(found)
}

/// Load and validate configuration.
///
/// A config file that fails to parse or validate is fatal; there is no
/// fallback to environment-only settings.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let path = resolve_config_path(explicit)?;

    let config = match &path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(path)?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(Error::Config(format!(
            "configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        )));
    }

    Ok(config)
}
