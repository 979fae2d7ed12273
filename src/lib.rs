//! AVRBrew - Build and Upload Manager for AVR Firmware Projects
//!
//! AVRBrew turns a project's declarative hardware description (the vendor
//! `boards.txt` / `programmers.txt` ecosystem) into concrete build-driver and
//! avrdude invocations, tracks the serial ports devices live on, and
//! sequences multi-phase upload and bootloader-burn flows.

pub mod cli;
pub mod config;
pub mod errors;
pub mod hardware;
pub mod models;
pub mod project;
pub mod runner;
pub mod serial;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;

/// AVRBrew version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// AVRBrew application name
pub const APP_NAME: &str = "avrbrew";
