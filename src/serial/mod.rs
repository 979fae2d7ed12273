//! Serial device discovery and port sharing

pub mod arbiter;
pub mod ports;

pub use arbiter::*;
pub use ports::*;
