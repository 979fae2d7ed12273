//! Clean command implementation

use anyhow::Result;
use std::path::Path;

use crate::project;

pub async fn execute_clean_command(project_dir: &Path) -> Result<()> {
    log::info!("🧹 Cleaning {}", project_dir.display());
    project::clean(project_dir);
    Ok(())
}
