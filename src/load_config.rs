//! `load_config` module: reads the optional YAML config file and applies environment overrides.
//!
//! Every key in the file is optional; anything left out keeps the value from
//! [`Config::default`]. Afterwards `SVNTEX_REPOSITORY_URL`, `SVNTEX_ROOT_PATH` and
//! `SVNTEX_PUBLISH_DIR` replace the matching fields when set.
//!
//! # Errors
//! Failures use `anyhow::Error` with the offending path in the message and surface at the
//! CLI boundary.
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Config;

pub const ENV_REPOSITORY_URL: &str = "SVNTEX_REPOSITORY_URL";
pub const ENV_ROOT_PATH: &str = "SVNTEX_ROOT_PATH";
pub const ENV_PUBLISH_DIR: &str = "SVNTEX_PUBLISH_DIR";

/// Load `path` if given, otherwise start from defaults; then apply env overrides.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config_file(path.as_ref())?,
        None => {
            info!("No config file given, using built-in defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config);
    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path_ref: &Path) -> Result<Config> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        return Ok(Config::default());
    }

    match serde_yaml::from_str::<Config>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var(ENV_REPOSITORY_URL) {
        info!(repository_url = %url, "{ENV_REPOSITORY_URL} overrides repository URL");
        config.repository_url = url;
    }
    if let Ok(root) = std::env::var(ENV_ROOT_PATH) {
        info!(root_path = %root, "{ENV_ROOT_PATH} overrides root path");
        config.root_path = PathBuf::from(root);
    }
    if let Ok(publish) = std::env::var(ENV_PUBLISH_DIR) {
        info!(publish_dir = %publish, "{ENV_PUBLISH_DIR} overrides publish directory");
        config.publish_dir = PathBuf::from(publish);
    }
}
