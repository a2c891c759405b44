use std::{env, fs, path::PathBuf};

use crate::prelude::*;
use nestify::nest;
use serde::{Deserialize, Serialize};

/// What to do with process records that come without a pid
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPidPolicy {
    /// Refuse the whole snapshot
    #[default]
    Error,
    /// Leave the records out of the forest and report them
    Skip,
}

nest! {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent configuration of the procforest CLI.
    ///
    /// Stored at `~/.config/procforest/config.yaml` following the XDG Base
    /// Directory Specification. Every key is optional, command line flags take
    /// precedence over the values found here.
    pub struct ProcForestConfig {
        pub output: pub struct OutputConfig {
            pub pretty: bool,
            pub include_unreachable: bool,
        },
        pub validation: pub struct ValidationConfig {
            pub missing_pid: MissingPidPolicy,
        },
    }
}

/// Get the path to the configuration file, following the XDG Base Directory Specification
/// at https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
///
/// If config_name is None, returns ~/.config/procforest/config.yaml (default)
/// If config_name is Some, returns ~/.config/procforest/{config_name}.yaml
fn get_configuration_file_path(config_name: Option<&str>) -> Result<PathBuf> {
    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = env::var("HOME").context("Neither XDG_CONFIG_HOME nor HOME is set")?;
            PathBuf::from(home).join(".config")
        }
    };
    let config_dir = config_dir.join("procforest");

    Ok(match config_name {
        Some(name) => config_dir.join(format!("{name}.yaml")),
        None => config_dir.join("config.yaml"),
    })
}

impl ProcForestConfig {
    /// Load the configuration. If it does not exist, return a default configuration.
    pub fn load(config_name: Option<&str>) -> Result<Self> {
        let config_path = get_configuration_file_path(config_name)?;

        match fs::read(&config_path) {
            Ok(config_str) => {
                let config: ProcForestConfig =
                    serde_yaml::from_slice(&config_str).with_context(|| {
                        format!(
                            "Failed to parse procforest config at {}",
                            config_path.display()
                        )
                    })?;
                debug!("Config loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                Ok(ProcForestConfig::default())
            }
            Err(e) => bail!("Failed to load config: {e}"),
        }
    }
}
