//! Project directory conventions
//!
//! Artifact and log locations under a project directory, sketch source
//! discovery, and the clean operation.

use glob::glob;
use std::path::{Path, PathBuf};

/// Build log, also tailed by the UI layer for live display
pub const BUILD_LOG: &str = "build/build.log";
/// Upload log for batch avrdude invocations
pub const UPLOAD_LOG: &str = "build/upload.log";
/// Disassembly log, written by the outer IDE layer
pub const DISASM_LOG: &str = "build/disasm.log";

/// Source extensions that count as sketch sources
const SOURCE_PATTERNS: &[&str] = &["*.ino", "*.c", "*.cpp", "*.S"];

/// Base name used for build artifacts, from the project directory name.
pub fn project_name(project_dir: &Path) -> String {
    project_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "sketch".to_string())
}

pub fn build_log_path(project_dir: &Path) -> PathBuf {
    project_dir.join(BUILD_LOG)
}

pub fn upload_log_path(project_dir: &Path) -> PathBuf {
    project_dir.join(UPLOAD_LOG)
}

pub fn disasm_log_path(project_dir: &Path) -> PathBuf {
    project_dir.join(DISASM_LOG)
}

/// Built firmware image for a board, relative to the project directory.
/// The build driver writes its final binary under `build/<board>/`.
pub fn hex_artifact(board: &str, project_name: &str) -> PathBuf {
    PathBuf::from("build")
        .join(board)
        .join(format!("{}.hex", project_name))
}

/// Collect sketch sources when the caller does not name them explicitly:
/// `*.ino`, `*.c`, `*.cpp` and `*.S` in the project directory and its
/// `src/` subdirectory, as paths relative to the project directory.
pub fn discover_sources(project_dir: &Path) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for dir in [project_dir.to_path_buf(), project_dir.join("src")] {
        for pattern in SOURCE_PATTERNS {
            let Ok(paths) = glob(&dir.join(pattern).to_string_lossy()) else {
                continue;
            };
            for path in paths.flatten() {
                if let Ok(relative) = path.strip_prefix(project_dir) {
                    sources.push(relative.to_path_buf());
                }
            }
        }
    }
    sources.sort();
    sources
}

/// Remove the project's build directory. Best-effort: a missing directory
/// or a failed removal is logged, not propagated.
pub fn clean(project_dir: &Path) {
    let build_dir = project_dir.join("build");
    match std::fs::remove_dir_all(&build_dir) {
        Ok(()) => log::info!("Removed {}", build_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {}: {}", build_dir.display(), e),
    }
}
