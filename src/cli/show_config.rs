use crate::config::ProcForestConfig;
use crate::prelude::*;

pub fn run(config: &ProcForestConfig) -> Result<()> {
    let config_str = serde_yaml::to_string(config)?;
    info!("Configuration in effect:\n{}", config_str.trim_end());
    Ok(())
}
