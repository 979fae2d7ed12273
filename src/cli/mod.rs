//! Command line interface for AVRBrew

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
