//! Hardware description registry
//!
//! Parses the vendor `boards.txt` / `programmers.txt` ecosystem into
//! structured property tables, read-only after the initial scan.

pub mod entry;
pub mod registry;

pub use entry::*;
pub use registry::*;
