//! Serial port listing and watching command implementation

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::AvrBrewConfig;
use crate::models::AppEvent;
use crate::serial::{PortWatcher, list_ports};

pub async fn execute_ports_command(config: &AvrBrewConfig, watch: bool) -> Result<()> {
    let device_dir = &config.serial.device_dir;
    let ports = list_ports(device_dir);

    if ports.is_empty() {
        println!("No serial ports found under {}", device_dir.display());
    } else {
        for port in &ports {
            println!("{}", port);
        }
    }

    if !watch {
        return Ok(());
    }

    log::info!("Watching {} for device changes (Ctrl-C to stop)", device_dir.display());
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let _watcher = PortWatcher::spawn(
        device_dir.clone(),
        Duration::from_millis(config.serial.watch_interval_ms),
        tx,
    );

    // The event is a hint, not a diff: re-query on every receipt
    while let Some(event) = rx.recv().await {
        if matches!(event, AppEvent::PortsChanged) {
            println!("--- ports changed ---");
            for port in list_ports(device_dir) {
                println!("{}", port);
            }
        }
    }

    Ok(())
}
