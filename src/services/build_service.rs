//! Build orchestration
//!
//! Turns a project plus board selection into a build-driver invocation:
//! resolves the board's core and variant paths against the hardware
//! registry, assembles the flat `key=value` argument list the external
//! driver expects, and launches it with output redirected to
//! `build/build.log`.

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::errors::{AvrBrewError, Result};
use crate::hardware::{HardwareEntry, HardwareRegistry};
use crate::models::{AppEvent, BuildRequest, RunOutcome};
use crate::project;
use crate::runner::{OutputDestination, ProcessPlan, ProcessRunner, RunningProcess};

/// Resolved paths a build depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBoard {
    pub core_path: PathBuf,
    /// None when the board declares no variant or the variant directory
    /// does not exist; the build proceeds without it
    pub variant_path: Option<PathBuf>,
}

/// Build orchestrator. Holds at most one in-flight build process.
pub struct BuildService {
    config: AvrBrewConfig,
    current: Option<RunningProcess>,
}

impl BuildService {
    pub fn new(config: AvrBrewConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Locate the board's core (required) and variant (optional) source
    /// directories. The board's own vendor package is searched first,
    /// then every registered hardware directory.
    pub fn resolve_board(
        &self,
        registry: &HardwareRegistry,
        board: &HardwareEntry,
    ) -> Result<ResolvedBoard> {
        let core = board.build_core()?;

        let mut search = vec![board.library()];
        search.extend(registry.directories().iter().cloned());

        let core_path = search
            .iter()
            .map(|dir| dir.join("cores").join(core))
            .find(|p| p.exists())
            .ok_or_else(|| AvrBrewError::CoreNotFound {
                board: board.id.clone(),
                core: core.to_string(),
            })?;

        // Variant is optional where core is not: a missing variant
        // directory drops the variant arguments instead of failing.
        let variant_path = board.build_variant().and_then(|variant| {
            search
                .iter()
                .map(|dir| dir.join("variants").join(variant))
                .find(|p| p.exists())
        });

        Ok(ResolvedBoard {
            core_path,
            variant_path,
        })
    }

    /// Resolve the request and assemble the build-driver invocation
    /// without launching it. Argument names and ordering are a contract
    /// with the external driver script.
    pub fn assemble(
        &self,
        registry: &HardwareRegistry,
        request: &BuildRequest,
    ) -> Result<ProcessPlan> {
        let board = registry.board(&request.board)?;
        let resolved = self.resolve_board(registry, board)?;

        let lib_path = self
            .config
            .library_dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(":");

        let mut args = vec![
            format!("toolchain={}", self.config.toolchain.root.display()),
            format!("project={}", request.project_name),
            format!("board={}", request.board),
            format!("mcu={}", board.build_mcu()?),
            format!("f_cpu={}", board.build_f_cpu()?),
            format!("max_size={}", board.upload_maximum_size()?),
            format!("core={}", board.build_core()?),
        ];
        if resolved.variant_path.is_some() {
            // Unwrap is safe: guarded by the declared variant above
            args.push(format!("variant={}", board.build_variant().unwrap_or_default()));
        }
        args.push(format!("libs={}", lib_path));
        args.push(format!("core_path={}", resolved.core_path.display()));
        if let Some(variant_path) = &resolved.variant_path {
            args.push(format!("variant_path={}", variant_path.display()));
        }
        if let Some(vid) = board.usb_vid() {
            args.push(format!("usb_vid={}", vid));
        }
        if let Some(pid) = board.usb_pid() {
            args.push(format!("usb_pid={}", pid));
        }
        args.push("--".to_string());
        for source in &request.sources {
            args.push(source.display().to_string());
        }

        Ok(ProcessPlan {
            executable: self.config.toolchain.build_driver.clone(),
            args,
            working_dir: request.project_dir.clone(),
            output: OutputDestination::LogFile(project::build_log_path(&request.project_dir)),
        })
    }

    /// Resolve and launch a build. Resolution failures are terminal and
    /// local: no process is launched and the error says why, clearly
    /// distinguishable from a compiler failure, which is only visible in
    /// the log file afterward.
    pub fn start(
        &mut self,
        registry: &HardwareRegistry,
        request: &BuildRequest,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<()> {
        if self.current.is_some() {
            return Err(AvrBrewError::BuildInProgress);
        }

        let plan = self.assemble(registry, request)?;
        log::info!("Building {} for board {}", request.project_name, request.board);
        let process = ProcessRunner::spawn(&plan)?;
        let _ = tx.send(AppEvent::BuildStarted(request.board.clone()));
        self.current = Some(process);
        Ok(())
    }

    /// Await the in-flight build and report its typed outcome. A failed
    /// build never chains further; callers only continue on `Success`.
    pub async fn wait(
        &mut self,
        board: &str,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) -> Result<RunOutcome> {
        let Some(mut process) = self.current.take() else {
            return Err(AvrBrewError::Build("no build in flight".to_string()));
        };
        let outcome = process.wait().await?;
        let _ = tx.send(AppEvent::BuildFinished(board.to_string(), outcome));
        Ok(outcome)
    }

    /// Whether a build process is currently tracked.
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Teardown: terminate the tracked process and wait for it to exit
    /// before the in-memory state is discarded.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut process) = self.current.take() {
            process.stop().await?;
        }
        Ok(())
    }
}
