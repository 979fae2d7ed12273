//! Interactive programmer terminal command implementation
//!
//! Wires the spawned programmer's stdin/stdout pipes to this terminal:
//! the process's pipes are the "serial connection" for the session's
//! lifetime, and interrupting the process is the disconnect.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;
use crate::models::{AppEvent, UploadMode, UploadRequest};
use crate::serial::PortArbiter;
use crate::services::UploadService;

pub async fn execute_terminal_command(
    config: &AvrBrewConfig,
    registry: &HardwareRegistry,
    project_dir: &Path,
    board: &str,
    programmer: Option<&str>,
    port: &str,
) -> Result<()> {
    log::info!("📺 Opening programmer terminal on {}", port);

    let request = UploadRequest {
        board: board.to_string(),
        programmer: programmer.unwrap_or_default().to_string(),
        port: port.to_string(),
        mode: UploadMode::Interactive,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let AppEvent::PortSuspended(port) = event {
                log::info!("Terminal session on {} suspended", port);
            }
        }
    });

    let arbiter = PortArbiter::new();
    let service = UploadService::new(config.clone(), arbiter.clone());
    let mut session = service.interactive(registry, &request, project_dir, &tx)?;
    arbiter.session_connected(port);

    // Pump our stdio through the session's pipes until it ends
    let mut child_stdin = session
        .take_stdin()
        .context("interactive session has no stdin pipe")?;
    let mut child_stdout = session
        .take_stdout()
        .context("interactive session has no stdout pipe")?;

    let input_pump = tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let _ = tokio::io::copy(&mut stdin, &mut child_stdin).await;
    });
    let output_pump = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        let _ = tokio::io::copy(&mut child_stdout, &mut stdout).await;
    });

    let finished = tokio::select! {
        outcome = session.wait() => Some(outcome?),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome,
        None => {
            log::info!("Interrupted, closing session");
            session.stop().await?;
            crate::models::RunOutcome::Success
        }
    };

    input_pump.abort();
    output_pump.abort();
    arbiter.session_closed(port);

    if let crate::models::RunOutcome::ToolFailed(code) = outcome {
        anyhow::bail!("Terminal session ended with exit status {}", code);
    }
    Ok(())
}
