//! Configuration management for AVRBrew

pub mod app_config;

pub use app_config::*;
