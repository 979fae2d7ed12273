//! Data models for AVRBrew

pub mod events;
pub mod request;

pub use events::*;
pub use request::*;
