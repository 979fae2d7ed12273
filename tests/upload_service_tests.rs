//! Upload orchestration integration tests
//!
//! Covers protocol selection, avrdude argument assembly, the two-phase
//! bootloader burn, the touch-reset bound and the port courtesy protocol,
//! all against a fake avrdude script.

mod test_fixtures;

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;

use avrbrew::errors::AvrBrewError;
use avrbrew::hardware::HardwareRegistry;
use avrbrew::models::{AppEvent, RunOutcome, UploadMode, UploadRequest};
use avrbrew::serial::PortArbiter;
use avrbrew::services::UploadService;

use test_fixtures::{
    create_project, create_vendor_package, fake_tool, read_calls, test_config,
};

struct Sandbox {
    _dir: TempDir,
    root: PathBuf,
    registry: HardwareRegistry,
    project: PathBuf,
    calls_log: PathBuf,
}

fn sandbox() -> Sandbox {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    create_vendor_package(&root.join("hardware"), "arduino").unwrap();
    let project = create_project(&root, "blink").unwrap();
    std::fs::create_dir_all(root.join("tools")).unwrap();
    let calls_log = root.join("avrdude-calls.txt");

    let registry = HardwareRegistry::scan(&[root.join("hardware")]);
    Sandbox {
        _dir: dir,
        root,
        registry,
        project,
        calls_log,
    }
}

fn request(board: &str, programmer: &str, port: &str, mode: UploadMode) -> UploadRequest {
    UploadRequest {
        board: board.to_string(),
        programmer: programmer.to_string(),
        port: port.to_string(),
        mode,
    }
}

fn service(sb: &Sandbox) -> UploadService {
    UploadService::new(test_config(&sb.root), PortArbiter::new())
}

#[test]
fn upload_prefers_board_bootloader_protocol() {
    let sb = sandbox();
    let service = service(&sb);

    let resolved = service
        .resolve_protocol(
            &sb.registry,
            &request("uno", "avrisp", "/dev/cu.usb1", UploadMode::Upload),
        )
        .unwrap();

    assert_eq!(resolved.protocol, "arduino");
    assert_eq!(resolved.speed.as_deref(), Some("115200"));
    assert!(resolved.via_bootloader);
}

#[test]
fn upload_falls_back_to_programmer_without_board_protocol() {
    let sb = sandbox();
    let service = service(&sb);

    let resolved = service
        .resolve_protocol(
            &sb.registry,
            &request("breadboard", "usbtinyisp", "/dev/cu.usb1", UploadMode::Upload),
        )
        .unwrap();

    assert_eq!(resolved.protocol, "usbtiny");
    assert_eq!(resolved.speed, None);
    assert!(!resolved.via_bootloader);
}

#[test]
fn burn_always_uses_the_programmer() {
    let sb = sandbox();
    let service = service(&sb);

    // uno declares upload.protocol=arduino, but a burn installs the
    // bootloader and cannot go through it
    let resolved = service
        .resolve_protocol(
            &sb.registry,
            &request("uno", "avrisp", "/dev/cu.usb1", UploadMode::BurnBootloader),
        )
        .unwrap();

    assert_eq!(resolved.protocol, "stk500v1");
    assert_eq!(resolved.speed.as_deref(), Some("19200"));
    assert!(!resolved.via_bootloader);
}

#[test]
fn no_protocol_anywhere_fails_closed() {
    let sb = sandbox();
    let service = service(&sb);

    let err = service
        .resolve_protocol(
            &sb.registry,
            &request("breadboard", "", "/dev/cu.usb1", UploadMode::Upload),
        )
        .unwrap_err();
    assert!(matches!(err, AvrBrewError::NoProtocol(_)));

    let err = service
        .resolve_protocol(
            &sb.registry,
            &request("uno", "nonexistent", "/dev/cu.usb1", UploadMode::BurnBootloader),
        )
        .unwrap_err();
    assert!(matches!(err, AvrBrewError::UnknownProgrammer(_)));
}

#[test]
fn upload_invocation_matches_avrdude_conventions() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    let service = UploadService::new(config.clone(), PortArbiter::new());

    let plan = service
        .assemble_upload(
            &sb.registry,
            &request("uno", "", "/dev/cu.usbmodem1", UploadMode::Upload),
            &sb.project,
            "blink",
        )
        .unwrap();

    let conf = config.toolchain.avrdude_conf.display().to_string();
    let expected: Vec<String> = [
        "-v", "-v", "-v", "-v",
        "-C", conf.as_str(),
        "-p", "atmega328p",
        "-c", "arduino",
        "-P", "/dev/cu.usbmodem1",
        "-b", "115200",
        "-D",
        "-U", "flash:w:build/uno/blink.hex:i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(plan.args, expected);
    assert_eq!(plan.executable, config.toolchain.avrdude);
}

#[test]
fn programmer_upload_performs_full_chip_erase() {
    let sb = sandbox();
    let service = service(&sb);

    let plan = service
        .assemble_upload(
            &sb.registry,
            &request("breadboard", "usbtinyisp", "/dev/cu.usb1", UploadMode::Upload),
            &sb.project,
            "blink",
        )
        .unwrap();

    // -D only belongs to bootloader uploads
    assert!(!plan.args.contains(&"-D".to_string()));
    assert!(plan.args.contains(&"flash:w:build/breadboard/blink.hex:i".to_string()));
}

#[test]
fn burn_phases_cover_fuses_then_loader() {
    let sb = sandbox();
    let service = service(&sb);

    let (fuse, loader) = service
        .assemble_burn_phases(
            &sb.registry,
            &request("uno", "avrisp", "/dev/cu.usb1", UploadMode::BurnBootloader),
            &sb.project,
        )
        .unwrap();

    let fuse_writes: Vec<&String> = fuse
        .args
        .iter()
        .filter(|a| a.contains(":w:"))
        .collect();
    assert_eq!(
        fuse_writes,
        vec![
            "lock:w:0x3F:m",
            "efuse:w:0x05:m",
            "hfuse:w:0xde:m",
            "lfuse:w:0xff:m",
        ]
    );

    let loader = loader.expect("uno declares a bootloader image");
    let image = sb
        .root
        .join("hardware/arduino/bootloaders/optiboot/optiboot_atmega328.hex");
    let loader_writes: Vec<String> = loader
        .args
        .iter()
        .filter(|a| a.contains(":w:"))
        .cloned()
        .collect();
    assert_eq!(
        loader_writes,
        vec![format!("flash:w:{}:i", image.display()), "lock:w:0x0F:m".to_string()]
    );
}

#[test]
fn burn_without_image_or_lock_bits_has_one_phase() {
    let sb = sandbox();
    let service = service(&sb);

    let (fuse, loader) = service
        .assemble_burn_phases(
            &sb.registry,
            &request("breadboard", "avrisp", "/dev/cu.usb1", UploadMode::BurnBootloader),
            &sb.project,
        )
        .unwrap();

    assert!(loader.is_none());
    // No unlock or extended fuses declared either
    let fuse_writes: Vec<&String> = fuse.args.iter().filter(|a| a.contains(":w:")).collect();
    assert_eq!(fuse_writes, vec!["hfuse:w:0xd9:m", "lfuse:w:0xe2:m"]);
}

#[tokio::test]
async fn empty_port_is_rejected_before_any_work() {
    let sb = sandbox();
    let service = service(&sb);
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = service
        .upload(
            &sb.registry,
            &request("uno", "", "", UploadMode::Upload),
            &sb.project,
            "blink",
            &tx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AvrBrewError::NoPort));

    let err = service
        .burn_bootloader(
            &sb.registry,
            &request("uno", "avrisp", "", UploadMode::BurnBootloader),
            &sb.project,
            &tx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AvrBrewError::NoPort));
}

#[cfg(unix)]
#[tokio::test]
async fn upload_runs_avrdude_and_reports_outcome() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 0).unwrap();
    let service = UploadService::new(config, PortArbiter::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = service
        .upload(
            &sb.registry,
            &request("breadboard", "usbtinyisp", "/dev/cu.usb1", UploadMode::Upload),
            &sb.project,
            "blink",
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Success);
    let calls = read_calls(&sb.calls_log);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("-c usbtiny"));
    assert!(calls[0].contains("flash:w:build/breadboard/blink.hex:i"));

    assert!(matches!(rx.recv().await, Some(AppEvent::UploadStarted(..))));
    assert!(matches!(
        rx.recv().await,
        Some(AppEvent::UploadFinished(_, RunOutcome::Success))
    ));
    // The settle delay elapses, then the port is signaled available
    assert!(matches!(rx.recv().await, Some(AppEvent::PortAvailable(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_upload_does_not_signal_port_available() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 1).unwrap();
    let service = UploadService::new(config, PortArbiter::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = service
        .upload(
            &sb.registry,
            &request("breadboard", "usbtinyisp", "/dev/cu.usb1", UploadMode::Upload),
            &sb.project,
            "blink",
            &tx,
        )
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::ToolFailed(1));

    assert!(matches!(rx.recv().await, Some(AppEvent::UploadStarted(..))));
    assert!(matches!(
        rx.recv().await,
        Some(AppEvent::UploadFinished(_, RunOutcome::ToolFailed(1)))
    ));
    drop(service);
    drop(tx);
    // Channel closes without a PortAvailable signal
    assert!(rx.recv().await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn touch_reset_bound_terminates_and_upload_proceeds() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 0).unwrap();
    let service = UploadService::new(config, PortArbiter::new());
    let (tx, _rx) = mpsc::unbounded_channel();

    // The port path never exists, so the reset handshake cannot
    // complete. It must give up in bounded time and the upload must
    // still run.
    let ghost_port = sb.root.join("dev/cu.ghost").display().to_string();
    let started = Instant::now();
    let outcome = service
        .upload(
            &sb.registry,
            &request("leonardo", "", &ghost_port, UploadMode::Upload),
            &sb.project,
            "blink",
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Success);
    // 3 retries at 10ms each; well under a second even with overhead
    assert!(started.elapsed() < Duration::from_secs(5));
    let calls = read_calls(&sb.calls_log);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("-c avr109"));
    assert!(calls[0].contains("-D"));
}

#[cfg(unix)]
#[tokio::test]
async fn burn_runs_loader_phase_only_after_fuse_success() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 0).unwrap();
    let service = UploadService::new(config, PortArbiter::new());
    let (tx, _rx) = mpsc::unbounded_channel();

    let outcome = service
        .burn_bootloader(
            &sb.registry,
            &request("uno", "avrisp", "/dev/cu.usb1", UploadMode::BurnBootloader),
            &sb.project,
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Success);
    let calls = read_calls(&sb.calls_log);
    assert_eq!(calls.len(), 2, "fuse phase then loader phase");
    assert!(calls[0].contains("hfuse:w:0xde:m"));
    assert!(!calls[0].contains("flash:w:"));
    assert!(calls[1].contains("flash:w:"));
    assert!(calls[1].contains("lock:w:0x0F:m"));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_fuse_phase_never_reaches_the_loader() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 1).unwrap();
    let service = UploadService::new(config, PortArbiter::new());
    let (tx, _rx) = mpsc::unbounded_channel();

    let outcome = service
        .burn_bootloader(
            &sb.registry,
            &request("uno", "avrisp", "/dev/cu.usb1", UploadMode::BurnBootloader),
            &sb.project,
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::ToolFailed(1));
    let calls = read_calls(&sb.calls_log);
    assert_eq!(calls.len(), 1, "loader phase must not run");
}

#[cfg(unix)]
#[tokio::test]
async fn upload_suspends_and_reconnects_a_terminal_session() {
    let sb = sandbox();
    let config = test_config(&sb.root);
    fake_tool(&config.toolchain.avrdude, &sb.calls_log, 0).unwrap();
    let arbiter = PortArbiter::new();
    let service = UploadService::new(config, arbiter.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let port = "/dev/cu.usbmodem1";
    arbiter.session_connected(port);

    let outcome = service
        .upload(
            &sb.registry,
            &request("breadboard", "usbtinyisp", port, UploadMode::Upload),
            &sb.project,
            "blink",
            &tx,
        )
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Success);

    // Suspension happens before the tool runs and is announced
    assert!(matches!(rx.recv().await, Some(AppEvent::PortSuspended(_))));
    assert!(matches!(rx.recv().await, Some(AppEvent::UploadStarted(..))));
    assert!(matches!(rx.recv().await, Some(AppEvent::UploadFinished(..))));

    // After the settle signal the session is connected again
    assert!(matches!(rx.recv().await, Some(AppEvent::PortAvailable(_))));
    assert!(arbiter.is_connected(port));
    assert!(!arbiter.wants_reconnect(port));
}
