//! Bootloader burn command implementation

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;
use crate::models::{AppEvent, RunOutcome, UploadMode, UploadRequest};
use crate::project;
use crate::serial::PortArbiter;
use crate::services::UploadService;

pub async fn execute_burn_command(
    config: &AvrBrewConfig,
    registry: &HardwareRegistry,
    project_dir: &Path,
    board: &str,
    programmer: &str,
    port: &str,
) -> Result<RunOutcome> {
    log::info!("🔥 AVRBrew bootloader burn");

    let request = UploadRequest {
        board: board.to_string(),
        programmer: programmer.to_string(),
        port: port.to_string(),
        mode: UploadMode::BurnBootloader,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let log_handler = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::UploadPhase(board, phase) => {
                    log::info!("Burn phase for {}: {}", board, phase);
                }
                AppEvent::UploadFinished(board, outcome) => match outcome {
                    RunOutcome::Success => log::info!("✅ Bootloader burned for {}", board),
                    RunOutcome::ToolFailed(code) => {
                        log::error!("❌ Burn failed for {} (exit {})", board, code)
                    }
                },
                _ => {}
            }
        }
    });

    let service = UploadService::new(config.clone(), PortArbiter::new());
    let outcome = service
        .burn_bootloader(registry, &request, project_dir, &tx)
        .await?;

    drop(service);
    drop(tx);
    log_handler.await?;

    if let RunOutcome::ToolFailed(_) = outcome {
        log::error!(
            "See {} for programmer output",
            project::upload_log_path(project_dir).display()
        );
    }
    Ok(outcome)
}
