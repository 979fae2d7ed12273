//! Error types for AVRBrew

pub mod types;

pub use types::*;
