//! Application events for CLI and orchestration components

use crate::models::request::RunOutcome;

/// Application events for communication between components
#[derive(Debug)]
pub enum AppEvent {
    // Build events
    BuildStarted(String),              // board id
    BuildOutput(String, String),       // board id, line
    BuildFinished(String, RunOutcome), // board id, outcome

    // Upload events
    UploadStarted(String, String),      // board id, port
    UploadPhase(String, String),        // board id, phase label
    UploadFinished(String, RunOutcome), // board id, outcome

    // Serial port events
    PortsChanged,        // device set changed, re-query to see how
    PortSuspended(String), // port handed over to an upload
    PortAvailable(String), // port settled after an upload, safe to reconnect

    // General events
    Tick,
    Error(String),
    Warning(String),
    Info(String),
}
