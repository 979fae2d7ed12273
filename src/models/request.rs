//! Request and outcome value types for build and upload operations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a single build invocation needs.
///
/// Reconstructed per invocation from the hardware registry plus project
/// state; never persisted.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Board identifier as declared in boards.txt
    pub board: String,
    /// Root of the cross-compilation toolchain
    pub toolchain: PathBuf,
    /// Source file paths, relative to the project directory
    pub sources: Vec<PathBuf>,
    /// Project working directory
    pub project_dir: PathBuf,
    /// Base name used for build artifacts
    pub project_name: String,
}

/// What an upload-side invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadMode {
    /// One-shot firmware upload, logged to build/upload.log
    Upload,
    /// Two-phase bootloader burn via an external programmer
    BurnBootloader,
    /// Long-lived avrdude terminal session with pass-through stdio
    Interactive,
}

/// Everything a single upload-side invocation needs.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Board identifier as declared in boards.txt
    pub board: String,
    /// Explicit programmer identifier; empty means "use the board's own
    /// bootloader protocol"
    pub programmer: String,
    /// Target serial device path
    pub port: String,
    pub mode: UploadMode,
}

/// Typed completion of one external tool invocation.
///
/// The log file remains the diagnosis channel; this value only records
/// whether a follow-up phase may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit status zero
    Success,
    /// Non-zero exit; details live in the invocation's log output
    ToolFailed(i32),
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}
