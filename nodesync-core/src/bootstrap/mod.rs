//! Startup helpers shared by the binary

mod config;

pub use config::{load_config, resolve_config_path, CONFIG_PATH_ENV};
