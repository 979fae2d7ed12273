//! Utility modules for AVRBrew

pub mod logging;
