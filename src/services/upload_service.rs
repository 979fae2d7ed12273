//! Upload orchestration
//!
//! Gets a built firmware image onto the device, burns a bootloader, or
//! opens an interactive programmer session. Handles the protocol choice
//! between a board's embedded bootloader and an external programmer, the
//! 1200-baud touch reset for self-resetting USB boards, the two-phase
//! bootloader burn, and the port courtesy protocol around all of it.

use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::errors::{AvrBrewError, Result};
use crate::hardware::HardwareRegistry;
use crate::models::{AppEvent, RunOutcome, UploadMode, UploadRequest};
use crate::project;
use crate::runner::{OutputDestination, ProcessPlan, ProcessRunner, RunningProcess};
use crate::serial::PortArbiter;

/// Protocol/speed pair an invocation will talk to the device with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProtocol {
    pub protocol: String,
    pub speed: Option<String>,
    /// True when the board's own bootloader protocol was chosen over an
    /// external programmer
    pub via_bootloader: bool,
}

/// Upload orchestrator
pub struct UploadService {
    config: AvrBrewConfig,
    arbiter: PortArbiter,
}

impl UploadService {
    pub fn new(config: AvrBrewConfig, arbiter: PortArbiter) -> Self {
        Self { config, arbiter }
    }

    pub fn arbiter(&self) -> &PortArbiter {
        &self.arbiter
    }

    /// Choose between the board's bootloader protocol and the selected
    /// programmer's. Upload and Interactive prefer the board's own
    /// `upload.protocol`; BurnBootloader always uses the explicit
    /// programmer, since the point is to install a bootloader.
    pub fn resolve_protocol(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
    ) -> Result<ResolvedProtocol> {
        let board = registry.board(&request.board)?;

        if request.mode != UploadMode::BurnBootloader {
            if let Some(protocol) = board.upload_protocol() {
                return Ok(ResolvedProtocol {
                    protocol: protocol.to_string(),
                    speed: board.upload_speed().map(str::to_string),
                    via_bootloader: true,
                });
            }
        }

        if request.programmer.is_empty() {
            return Err(AvrBrewError::NoProtocol(request.board.clone()));
        }
        let programmer = registry.programmer(&request.programmer)?;
        let protocol = programmer
            .programmer_protocol()
            .ok_or_else(|| AvrBrewError::MissingProperty {
                entry: programmer.id.clone(),
                property: "protocol".to_string(),
            })?;
        Ok(ResolvedProtocol {
            protocol: protocol.to_string(),
            speed: programmer.programmer_speed().map(str::to_string),
            via_bootloader: false,
        })
    }

    /// The avrdude argument prefix shared by every mode: verbosity,
    /// config file, part, protocol, port and speed. Argument conventions
    /// match the standard AVR programming tool.
    fn base_args(&self, mcu: &str, resolved: &ResolvedProtocol, port: &str) -> Vec<String> {
        let mut args = Vec::new();
        for _ in 0..self.config.upload.verbosity {
            args.push("-v".to_string());
        }
        args.push("-C".to_string());
        args.push(self.config.toolchain.avrdude_conf.display().to_string());
        args.push("-p".to_string());
        args.push(mcu.to_string());
        args.push("-c".to_string());
        args.push(resolved.protocol.clone());
        args.push("-P".to_string());
        args.push(port.to_string());
        if let Some(speed) = &resolved.speed {
            args.push("-b".to_string());
            args.push(speed.clone());
        }
        args
    }

    /// Assemble the one-shot firmware upload invocation.
    pub fn assemble_upload(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
        project_name: &str,
    ) -> Result<ProcessPlan> {
        let board = registry.board(&request.board)?;
        let resolved = self.resolve_protocol(registry, request)?;

        let mut args = self.base_args(board.build_mcu()?, &resolved, &request.port);
        if resolved.via_bootloader {
            // Skip the chip erase cycle; the bootloader handles it and an
            // auto reset would knock it out of programming mode
            args.push("-D".to_string());
        }
        let hex = project::hex_artifact(&request.board, project_name);
        args.push("-U".to_string());
        args.push(format!("flash:w:{}:i", hex.display()));

        Ok(ProcessPlan {
            executable: self.config.toolchain.avrdude.clone(),
            args,
            working_dir: project_dir.to_path_buf(),
            output: OutputDestination::LogFile(project::upload_log_path(project_dir)),
        })
    }

    /// Assemble the bootloader burn as (fuse-write phase, optional
    /// loader-write phase). The second phase exists only when the board
    /// declares a bootloader image and/or post-burn lock bits.
    pub fn assemble_burn_phases(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
    ) -> Result<(ProcessPlan, Option<ProcessPlan>)> {
        let board = registry.board(&request.board)?;
        let resolved = self.resolve_protocol(registry, request)?;
        let mcu = board.build_mcu()?;

        // Phase 1: unlock and write fuses. lock/efuse only when declared;
        // high and low fuses are required for any burn.
        let mut fuse_args = self.base_args(mcu, &resolved, &request.port);
        if let Some(unlock) = board.bootloader_unlock_bits() {
            fuse_args.push("-U".to_string());
            fuse_args.push(format!("lock:w:{}:m", unlock));
        }
        if let Some(efuse) = board.bootloader_extended_fuses() {
            fuse_args.push("-U".to_string());
            fuse_args.push(format!("efuse:w:{}:m", efuse));
        }
        fuse_args.push("-U".to_string());
        fuse_args.push(format!("hfuse:w:{}:m", board.require("bootloader.high_fuses")?));
        fuse_args.push("-U".to_string());
        fuse_args.push(format!("lfuse:w:{}:m", board.require("bootloader.low_fuses")?));

        let fuse_phase = ProcessPlan {
            executable: self.config.toolchain.avrdude.clone(),
            args: fuse_args,
            working_dir: project_dir.to_path_buf(),
            output: OutputDestination::LogFile(project::upload_log_path(project_dir)),
        };

        // Phase 2: write the bootloader image and lock the boot section
        let image = match (board.bootloader_path(), board.bootloader_file()) {
            (Some(path), Some(file)) => Some(
                board
                    .library()
                    .join("bootloaders")
                    .join(path)
                    .join(file),
            ),
            _ => None,
        };
        let lock_bits = board.bootloader_lock_bits();

        let loader_phase = if image.is_some() || lock_bits.is_some() {
            let mut loader_args = self.base_args(mcu, &resolved, &request.port);
            if let Some(image) = &image {
                loader_args.push("-U".to_string());
                loader_args.push(format!("flash:w:{}:i", image.display()));
            }
            if let Some(lock) = lock_bits {
                loader_args.push("-U".to_string());
                loader_args.push(format!("lock:w:{}:m", lock));
            }
            Some(ProcessPlan {
                executable: self.config.toolchain.avrdude.clone(),
                args: loader_args,
                working_dir: project_dir.to_path_buf(),
                output: OutputDestination::LogFileAppend(project::upload_log_path(project_dir)),
            })
        } else {
            None
        };

        Ok((fuse_phase, loader_phase))
    }

    /// Assemble the interactive terminal session invocation. stdin/stdout
    /// are piped back to the caller; the process's lifetime is the
    /// session's lifetime.
    pub fn assemble_interactive(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
    ) -> Result<ProcessPlan> {
        let board = registry.board(&request.board)?;
        let resolved = self.resolve_protocol(registry, request)?;

        let mut args = self.base_args(board.build_mcu()?, &resolved, &request.port);
        args.push("-t".to_string());

        Ok(ProcessPlan {
            executable: self.config.toolchain.avrdude.clone(),
            args,
            working_dir: project_dir.to_path_buf(),
            output: OutputDestination::Piped,
        })
    }

    /// Touch the port at 1200 baud to drop a self-resetting board into
    /// its bootloader, then wait (bounded) for USB re-enumeration to
    /// bring the device path back. Exceeding the bound proceeds anyway:
    /// the device may already be ready.
    pub async fn touch_reset(&self, port: &str) {
        log::info!("Touching {} at 1200 baud to trigger reset", port);
        match serialport::new(port, 1200).open() {
            Ok(handle) => {
                tokio::time::sleep(Duration::from_millis(self.config.upload.touch_hold_ms)).await;
                drop(handle);
            }
            Err(e) => {
                log::warn!("Could not open {} for touch reset: {}", port, e);
                return;
            }
        }

        for _ in 0..self.config.upload.reset_retries {
            tokio::time::sleep(Duration::from_millis(self.config.upload.reset_poll_ms)).await;
            if Path::new(port).exists() {
                log::debug!("Port {} reappeared", port);
                return;
            }
        }
        log::warn!(
            "Port {} did not reappear within {} polls, proceeding anyway",
            port,
            self.config.upload.reset_retries
        );
    }

    /// Upload a previously built firmware image.
    ///
    /// Fails closed on resolution errors; a non-zero uploader exit is
    /// only visible via the log content and the returned outcome.
    pub async fn upload(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
        project_name: &str,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<RunOutcome> {
        if request.port.is_empty() {
            return Err(AvrBrewError::NoPort);
        }
        let plan = self.assemble_upload(registry, request, project_dir, project_name)?;
        let leonardish = registry.board(&request.board)?.is_leonardish();
        let via_bootloader = self.resolve_protocol(registry, request)?.via_bootloader;

        if self.arbiter.port_needed_for_upload(&request.port) {
            let _ = tx.send(AppEvent::PortSuspended(request.port.clone()));
        }

        if leonardish && via_bootloader {
            self.touch_reset(&request.port).await;
        }

        let _ = tx.send(AppEvent::UploadStarted(
            request.board.clone(),
            request.port.clone(),
        ));
        let mut process = ProcessRunner::spawn(&plan)?;
        let outcome = process.wait().await?;
        let _ = tx.send(AppEvent::UploadFinished(request.board.clone(), outcome));

        if outcome.success() {
            self.schedule_port_available(&request.port, tx);
        }
        Ok(outcome)
    }

    /// Burn a bootloader: fuse write, then (if declared) loader write,
    /// strictly in that order. The loader phase never starts before the
    /// fuse phase's success is observed.
    pub async fn burn_bootloader(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<RunOutcome> {
        if request.port.is_empty() {
            return Err(AvrBrewError::NoPort);
        }
        let (fuse_phase, loader_phase) =
            self.assemble_burn_phases(registry, request, project_dir)?;

        if self.arbiter.port_needed_for_upload(&request.port) {
            let _ = tx.send(AppEvent::PortSuspended(request.port.clone()));
        }

        let _ = tx.send(AppEvent::UploadPhase(
            request.board.clone(),
            "fuse write".to_string(),
        ));
        let mut process = ProcessRunner::spawn(&fuse_phase)?;
        let outcome = process.wait().await?;
        if !outcome.success() {
            let _ = tx.send(AppEvent::UploadFinished(request.board.clone(), outcome));
            return Ok(outcome);
        }

        let outcome = if let Some(loader_phase) = loader_phase {
            let _ = tx.send(AppEvent::UploadPhase(
                request.board.clone(),
                "loader write".to_string(),
            ));
            let mut process = ProcessRunner::spawn(&loader_phase)?;
            process.wait().await?
        } else {
            outcome
        };

        let _ = tx.send(AppEvent::UploadFinished(request.board.clone(), outcome));
        if outcome.success() {
            self.schedule_port_available(&request.port, tx);
        }
        Ok(outcome)
    }

    /// Open an interactive programmer session. The returned handle's
    /// stdin/stdout pipes are the session's "serial connection";
    /// stopping the process is the disconnect.
    pub fn interactive(
        &self,
        registry: &HardwareRegistry,
        request: &UploadRequest,
        project_dir: &Path,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<RunningProcess> {
        if request.port.is_empty() {
            return Err(AvrBrewError::NoPort);
        }
        let plan = self.assemble_interactive(registry, request, project_dir)?;

        if self.arbiter.port_needed_for_upload(&request.port) {
            let _ = tx.send(AppEvent::PortSuspended(request.port.clone()));
        }

        ProcessRunner::spawn(&plan)
    }

    /// Signal "port available again" after the settle delay, so a
    /// suspended terminal session knows it may safely reconnect. The
    /// delay exists because the device may still be resetting.
    fn schedule_port_available(&self, port: &str, tx: &mpsc::UnboundedSender<AppEvent>) {
        let arbiter = self.arbiter.clone();
        let tx = tx.clone();
        let port = port.to_string();
        let settle = Duration::from_millis(self.config.upload.settle_ms);
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            arbiter.port_available_after_upload(&port);
            let _ = tx.send(AppEvent::PortAvailable(port));
        });
    }
}
