//! A single board or programmer declaration

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::errors::{AvrBrewError, Result};

/// Property key synthesized from the containing vendor directory's name,
/// used for UI grouping and disambiguation.
pub const PROP_PROVENIENCE: &str = "provenience";
/// Property key synthesized from the containing vendor directory's path,
/// used to resolve `cores/`, `variants/` and `bootloaders/` subpaths.
pub const PROP_LIBRARY: &str = "library";

/// One board or programmer declaration: dotted property keys mapped to
/// string values, plus the two synthesized keys above.
///
/// The key names are a de facto contract with the external toolchain
/// ecosystem and are preserved bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareEntry {
    /// Identifier the entry was declared under
    pub id: String,
    properties: BTreeMap<String, String>,
}

impl HardwareEntry {
    pub fn new(id: &str, provenience: &str, library: &PathBuf) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(PROP_PROVENIENCE.to_string(), provenience.to_string());
        properties.insert(PROP_LIBRARY.to_string(), library.display().to_string());
        Self {
            id: id.to_string(),
            properties,
        }
    }

    /// Add or overwrite a property. Later lines for the same identifier win.
    pub fn set(&mut self, property: &str, value: &str) {
        self.properties
            .insert(property.to_string(), value.to_string());
    }

    /// Raw property access; absence is a valid outcome for speculative reads.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(|s| s.as_str())
    }

    /// Property access for keys an operation cannot proceed without.
    pub fn require(&self, property: &str) -> Result<&str> {
        self.get(property).ok_or_else(|| AvrBrewError::MissingProperty {
            entry: self.id.clone(),
            property: property.to_string(),
        })
    }

    /// Iterate all properties in deterministic (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // Synthesized keys

    pub fn provenience(&self) -> &str {
        self.get(PROP_PROVENIENCE).unwrap_or_default()
    }

    /// Absolute path of the vendor package that declared this entry
    pub fn library(&self) -> PathBuf {
        PathBuf::from(self.get(PROP_LIBRARY).unwrap_or_default())
    }

    // Board build properties

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn build_core(&self) -> Result<&str> {
        self.require("build.core")
    }

    pub fn build_variant(&self) -> Option<&str> {
        // An explicitly empty variant means "no variant"
        self.get("build.variant").filter(|v| !v.is_empty())
    }

    pub fn build_mcu(&self) -> Result<&str> {
        self.require("build.mcu")
    }

    pub fn build_f_cpu(&self) -> Result<&str> {
        self.require("build.f_cpu")
    }

    pub fn usb_vid(&self) -> Option<&str> {
        self.get("build.vid")
    }

    pub fn usb_pid(&self) -> Option<&str> {
        self.get("build.pid")
    }

    // Board upload properties

    pub fn upload_maximum_size(&self) -> Result<&str> {
        self.require("upload.maximum_size")
    }

    pub fn upload_protocol(&self) -> Option<&str> {
        self.get("upload.protocol")
    }

    pub fn upload_speed(&self) -> Option<&str> {
        self.get("upload.speed")
    }

    // Board bootloader properties

    pub fn bootloader_path(&self) -> Option<&str> {
        self.get("bootloader.path")
    }

    pub fn bootloader_file(&self) -> Option<&str> {
        self.get("bootloader.file")
    }

    pub fn bootloader_unlock_bits(&self) -> Option<&str> {
        self.get("bootloader.unlock_bits")
    }

    pub fn bootloader_lock_bits(&self) -> Option<&str> {
        self.get("bootloader.lock_bits")
    }

    pub fn bootloader_extended_fuses(&self) -> Option<&str> {
        self.get("bootloader.extended_fuses")
    }

    pub fn bootloader_high_fuses(&self) -> Option<&str> {
        self.get("bootloader.high_fuses")
    }

    pub fn bootloader_low_fuses(&self) -> Option<&str> {
        self.get("bootloader.low_fuses")
    }

    /// Whether this board self-resets into its bootloader when the port is
    /// touched at 1200 baud (USB-native boards with a caterina loader).
    pub fn is_leonardish(&self) -> bool {
        self.bootloader_path()
            .map(|p| p.starts_with("caterina"))
            .unwrap_or(false)
    }

    // Programmer properties

    pub fn programmer_protocol(&self) -> Option<&str> {
        self.get("protocol")
    }

    pub fn programmer_speed(&self) -> Option<&str> {
        self.get("speed")
    }
}
