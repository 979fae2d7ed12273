//! Orchestration services for build, upload and bootloader burning

pub mod build_service;
pub mod upload_service;

pub use build_service::*;
pub use upload_service::*;
