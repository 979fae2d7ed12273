//! Build command implementation

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;
use crate::models::{AppEvent, BuildRequest, RunOutcome};
use crate::project;
use crate::services::BuildService;

pub async fn execute_build_command(
    config: &AvrBrewConfig,
    registry: &HardwareRegistry,
    project_dir: &Path,
    board: &str,
    sources: &[PathBuf],
) -> Result<RunOutcome> {
    log::info!("🔨 AVRBrew build");
    log::info!("📁 Project directory: {}", project_dir.display());

    let sources = if sources.is_empty() {
        project::discover_sources(project_dir)
    } else {
        sources.to_vec()
    };
    if sources.is_empty() {
        anyhow::bail!(
            "No source files found in {} (expected *.ino, *.c, *.cpp or *.S)",
            project_dir.display()
        );
    }

    let request = BuildRequest {
        board: board.to_string(),
        toolchain: config.toolchain.root.clone(),
        sources,
        project_dir: project_dir.to_path_buf(),
        project_name: project::project_name(project_dir),
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let log_handler = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::BuildStarted(board) => {
                    log::info!("Build started for {}", board);
                }
                AppEvent::BuildFinished(board, outcome) => match outcome {
                    RunOutcome::Success => log::info!("✅ Build succeeded for {}", board),
                    RunOutcome::ToolFailed(code) => {
                        log::error!("❌ Build failed for {} (exit {})", board, code)
                    }
                },
                _ => {}
            }
        }
    });

    let mut service = BuildService::new(config.clone());
    service.start(registry, &request, &tx)?;
    let outcome = service.wait(board, &tx).await?;

    drop(tx);
    log_handler.await?;

    if let RunOutcome::ToolFailed(_) = outcome {
        log::error!(
            "See {} for compiler output",
            project::build_log_path(project_dir).display()
        );
    }
    Ok(outcome)
}
