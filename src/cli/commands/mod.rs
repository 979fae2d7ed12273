//! CLI command implementations

pub mod boards;
pub mod build;
pub mod burn;
pub mod clean;
pub mod ports;
pub mod terminal;
pub mod upload;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;
use std::path::PathBuf;

/// Resolve the project directory for a command invocation.
pub fn project_dir(cli: &crate::cli::Cli) -> anyhow::Result<PathBuf> {
    match &cli.project_dir {
        Some(dir) => {
            if !dir.exists() {
                anyhow::bail!("Project directory does not exist: {:?}", dir);
            }
            Ok(dir.clone())
        }
        None => Ok(std::env::current_dir()?),
    }
}

/// Scan the hardware registry from the configured search roots.
pub fn load_registry(config: &AvrBrewConfig) -> HardwareRegistry {
    HardwareRegistry::scan(&config.hardware_dirs)
}
