//! Upload command implementation

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;
use crate::models::{AppEvent, RunOutcome, UploadMode, UploadRequest};
use crate::project;
use crate::serial::PortArbiter;
use crate::services::UploadService;

#[allow(clippy::too_many_arguments)]
pub async fn execute_upload_command(
    config: &AvrBrewConfig,
    registry: &HardwareRegistry,
    project_dir: &Path,
    board: &str,
    programmer: Option<&str>,
    port: &str,
    chain_build: bool,
) -> Result<RunOutcome> {
    log::info!("⚡ AVRBrew upload");

    // Upload chains strictly after a successful build; a failed build
    // never reaches the uploader.
    if chain_build {
        let outcome =
            super::build::execute_build_command(config, registry, project_dir, board, &[]).await?;
        if !outcome.success() {
            return Ok(outcome);
        }
    }

    let request = UploadRequest {
        board: board.to_string(),
        programmer: programmer.unwrap_or_default().to_string(),
        port: port.to_string(),
        mode: UploadMode::Upload,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let log_handler = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::UploadStarted(board, port) => {
                    log::info!("Uploading {} via {}", board, port);
                }
                AppEvent::PortSuspended(port) => {
                    log::info!("Terminal session on {} suspended", port);
                }
                AppEvent::PortAvailable(port) => {
                    log::info!("Port {} available again", port);
                }
                AppEvent::UploadFinished(board, outcome) => match outcome {
                    RunOutcome::Success => log::info!("✅ Upload finished for {}", board),
                    RunOutcome::ToolFailed(code) => {
                        log::error!("❌ Upload failed for {} (exit {})", board, code)
                    }
                },
                _ => {}
            }
        }
    });

    let service = UploadService::new(config.clone(), PortArbiter::new());
    let project_name = project::project_name(project_dir);
    let outcome = service
        .upload(registry, &request, project_dir, &project_name, &tx)
        .await?;

    drop(service);
    drop(tx);
    log_handler.await?;

    if let RunOutcome::ToolFailed(_) = outcome {
        log::error!(
            "See {} for uploader output",
            project::upload_log_path(project_dir).display()
        );
    }
    Ok(outcome)
}
