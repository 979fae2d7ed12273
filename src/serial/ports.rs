//! Serial port enumeration and change watching
//!
//! Answers "what serial ports exist right now" by listing the device
//! directory and keeping call-up devices. A polling watcher task
//! broadcasts a payload-free change event whenever the answer would
//! differ; consumers re-query on receipt.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::AppEvent;

/// Call-up device naming prefix
const CALLUP_PREFIX: &str = "cu.";

/// List serial device paths under the given device directory.
///
/// Deterministic given filesystem state; always re-lists, never caches.
pub fn list_ports(device_dir: &Path) -> Vec<String> {
    let mut ports = Vec::new();
    if let Ok(entries) = std::fs::read_dir(device_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(CALLUP_PREFIX) {
                ports.push(device_dir.join(&name).display().to_string());
            }
        }
    }
    ports.sort();
    ports
}

/// Watches the device directory and emits `AppEvent::PortsChanged` when
/// the port set differs from the previous poll.
pub struct PortWatcher {
    handle: JoinHandle<()>,
}

impl PortWatcher {
    /// Spawn the watcher task. The event is a hint, not a diff: receivers
    /// call [`list_ports`] to see what actually changed.
    pub fn spawn(
        device_dir: PathBuf,
        interval: Duration,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut previous: BTreeSet<String> = list_ports(&device_dir).into_iter().collect();
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; skip it so the initial
            // snapshot does not count as a change.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current: BTreeSet<String> = list_ports(&device_dir).into_iter().collect();
                if current != previous {
                    log::debug!(
                        "Serial device set changed: {} -> {} port(s)",
                        previous.len(),
                        current.len()
                    );
                    previous = current;
                    if tx.send(AppEvent::PortsChanged).is_err() {
                        // All receivers gone, nothing left to notify
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// Stop watching. Safe to call while a poll is in flight.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PortWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
