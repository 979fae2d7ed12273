//! Board and programmer registry
//!
//! Scans hardware search roots once at startup for vendor packages (one
//! level of subdirectories) and parses their `boards.txt` and
//! `programmers.txt` files. The parser is deliberately permissive: one
//! `ident.property = value` assignment per line, anything else skipped.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{AvrBrewError, Result};
use crate::hardware::entry::HardwareEntry;

/// Which table a lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Board,
    Programmer,
}

/// Property tables for all declared boards and programmers.
///
/// Built once, immutable afterward. On-disk changes to hardware
/// definitions are not observed live.
#[derive(Debug)]
pub struct HardwareRegistry {
    /// Vendor package directories, in scan order
    directories: Vec<PathBuf>,
    boards: BTreeMap<String, HardwareEntry>,
    programmers: BTreeMap<String, HardwareEntry>,
}

impl HardwareRegistry {
    /// Scan the given search roots and build the registry.
    ///
    /// Each root contributes its immediate subdirectories as vendor
    /// packages. Missing roots and missing description files are not
    /// errors; a package may simply lack programmers.
    pub fn scan(search_roots: &[PathBuf]) -> Self {
        let mut directories = Vec::new();
        for root in search_roots {
            directories.extend(subdirectories(root));
        }

        let property_line = Regex::new(r"^\s*(\w+)\.(\S+?)\s*=\s*(\S.*\S|\S)\s*$")
            .expect("property line pattern is valid");

        let mut boards = BTreeMap::new();
        for dir in &directories {
            parse_description_file(&dir.join("boards.txt"), dir, &property_line, &mut boards);
        }

        let mut programmers = BTreeMap::new();
        for dir in &directories {
            parse_description_file(
                &dir.join("programmers.txt"),
                dir,
                &property_line,
                &mut programmers,
            );
        }

        log::info!(
            "Hardware registry: {} package(s), {} board(s), {} programmer(s)",
            directories.len(),
            boards.len(),
            programmers.len()
        );

        Self {
            directories,
            boards,
            programmers,
        }
    }

    /// Vendor package directories in scan order, used to locate cores,
    /// variants and bootloader images.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Map access; absence is an expected outcome for speculative lookups.
    pub fn lookup(&self, kind: EntryKind, id: &str) -> Option<&HardwareEntry> {
        match kind {
            EntryKind::Board => self.boards.get(id),
            EntryKind::Programmer => self.programmers.get(id),
        }
    }

    /// Lookup for a build/upload request, where absence fails the request.
    pub fn board(&self, id: &str) -> Result<&HardwareEntry> {
        self.boards
            .get(id)
            .ok_or_else(|| AvrBrewError::UnknownBoard(id.to_string()))
    }

    /// Lookup for a burn/upload request that names an explicit programmer.
    pub fn programmer(&self, id: &str) -> Result<&HardwareEntry> {
        self.programmers
            .get(id)
            .ok_or_else(|| AvrBrewError::UnknownProgrammer(id.to_string()))
    }

    pub fn boards(&self) -> impl Iterator<Item = &HardwareEntry> {
        self.boards.values()
    }

    pub fn programmers(&self) -> impl Iterator<Item = &HardwareEntry> {
        self.programmers.values()
    }
}

/// Immediate subdirectories of a path, in name order. A missing or
/// unreadable root contributes nothing.
fn subdirectories(path: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let sub = entry.path();
            if sub.is_dir() {
                dirs.push(sub);
            }
        }
    }
    dirs.sort();
    dirs
}

/// Parse one description file into the given table.
///
/// On first sight of an identifier within this file the entry is
/// reinitialized with its provenience and library synthesized from the
/// containing vendor directory, so a later package fully replaces an
/// earlier package's entry of the same name. Lines that do not match the
/// assignment pattern are skipped silently.
fn parse_description_file(
    file: &Path,
    dir: &Path,
    property_line: &Regex,
    table: &mut BTreeMap<String, HardwareEntry>,
) {
    let Ok(content) = std::fs::read_to_string(file) else {
        return;
    };

    let provenience = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let library = dir.to_path_buf();

    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    for line in content.lines() {
        let Some(captures) = property_line.captures(line) else {
            continue;
        };
        let id = &captures[1];
        let property = &captures[2];
        let value = &captures[3];

        if seen.insert(id.to_string()) {
            table.insert(id.to_string(), HardwareEntry::new(id, &provenience, &library));
        }
        table
            .get_mut(id)
            .expect("entry initialized on first sight")
            .set(property, value);
    }
}
