//! Custom error types for AVRBrew

use std::fmt;

/// Main error type for AVRBrew operations
#[derive(Debug)]
pub enum AvrBrewError {
    /// Configuration related errors
    Config(String),
    /// Board identifier not present in the hardware registry
    UnknownBoard(String),
    /// Programmer identifier not present in the hardware registry
    UnknownProgrammer(String),
    /// Board entry lacks a property the requested operation needs
    MissingProperty { entry: String, property: String },
    /// Core source directory could not be located under any hardware root
    CoreNotFound { board: String, core: String },
    /// Neither the board nor the selected programmer declares a protocol
    NoProtocol(String),
    /// No target serial port was given for an operation that needs one
    NoPort,
    /// A build is already in flight on this orchestrator
    BuildInProgress,
    /// Build operation errors
    Build(String),
    /// Upload/burn operation errors
    Upload(String),
    /// Serial port errors
    Serial(String),
    /// General I/O errors
    Io(std::io::Error),
}

impl fmt::Display for AvrBrewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvrBrewError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AvrBrewError::UnknownBoard(id) => {
                write!(f, "Board '{}' is not declared by any hardware package", id)
            }
            AvrBrewError::UnknownProgrammer(id) => {
                write!(
                    f,
                    "Programmer '{}' is not declared by any hardware package",
                    id
                )
            }
            AvrBrewError::MissingProperty { entry, property } => {
                write!(f, "Entry '{}' does not declare '{}'", entry, property)
            }
            AvrBrewError::CoreNotFound { board, core } => {
                write!(
                    f,
                    "Core '{}' for board '{}' was not found under any hardware directory",
                    core, board
                )
            }
            AvrBrewError::NoProtocol(board) => {
                write!(
                    f,
                    "No upload protocol: board '{}' declares none and no programmer is selected",
                    board
                )
            }
            AvrBrewError::NoPort => write!(f, "No serial port selected"),
            AvrBrewError::BuildInProgress => {
                write!(f, "A build is already running for this project")
            }
            AvrBrewError::Build(msg) => write!(f, "Build error: {}", msg),
            AvrBrewError::Upload(msg) => write!(f, "Upload error: {}", msg),
            AvrBrewError::Serial(msg) => write!(f, "Serial port error: {}", msg),
            AvrBrewError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for AvrBrewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvrBrewError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AvrBrewError {
    fn from(err: std::io::Error) -> Self {
        AvrBrewError::Io(err)
    }
}

impl AvrBrewError {
    /// Whether this error was detected before any external process launch.
    ///
    /// Resolution failures must be distinguishable from tool failures, which
    /// are only visible through the log file after the fact.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            AvrBrewError::UnknownBoard(_)
                | AvrBrewError::UnknownProgrammer(_)
                | AvrBrewError::MissingProperty { .. }
                | AvrBrewError::CoreNotFound { .. }
                | AvrBrewError::NoProtocol(_)
                | AvrBrewError::NoPort
        )
    }
}

/// Result type alias for AVRBrew operations
pub type Result<T> = std::result::Result<T, AvrBrewError>;
