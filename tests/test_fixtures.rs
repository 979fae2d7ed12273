//! Test fixtures for avrbrew integration tests
//!
//! Builds throwaway vendor hardware packages, projects and fake external
//! tools inside temporary directories.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use avrbrew::config::{AvrBrewConfig, SerialConfig, ToolchainConfig, UploadConfig};

/// boards.txt content shared by most tests: a classic bootloader board,
/// a self-resetting USB board and a bare breadboard chip.
pub const BOARDS_TXT: &str = "\
# See: http://code.google.com/p/arduino/wiki/Platforms

uno.name=Arduino Uno
uno.upload.protocol=arduino
uno.upload.maximum_size=32256
uno.upload.speed=115200
uno.bootloader.low_fuses=0xff
uno.bootloader.high_fuses=0xde
uno.bootloader.extended_fuses=0x05
uno.bootloader.unlock_bits=0x3F
uno.bootloader.lock_bits=0x0F
uno.bootloader.path=optiboot
uno.bootloader.file=optiboot_atmega328.hex
uno.build.mcu=atmega328p
uno.build.f_cpu=16000000L
uno.build.core=arduino
uno.build.variant=standard

leonardo.name=Arduino Leonardo
leonardo.upload.protocol=avr109
leonardo.upload.maximum_size=28672
leonardo.upload.speed=57600
leonardo.bootloader.path=caterina
leonardo.bootloader.file=Caterina-Leonardo.hex
leonardo.build.mcu=atmega32u4
leonardo.build.f_cpu=16000000L
leonardo.build.vid=0x2341
leonardo.build.pid=0x8036
leonardo.build.core=arduino
leonardo.build.variant=leonardo

breadboard.name=Bare ATmega328 on a breadboard
breadboard.upload.maximum_size=32768
breadboard.bootloader.low_fuses=0xe2
breadboard.bootloader.high_fuses=0xd9
breadboard.build.mcu=atmega328p
breadboard.build.f_cpu=8000000L
breadboard.build.core=arduino
";

pub const PROGRAMMERS_TXT: &str = "\
usbtinyisp.name=USBtinyISP
usbtinyisp.protocol=usbtiny

avrisp.name=AVR ISP
avrisp.protocol=stk500v1
avrisp.speed=19200
";

/// Create one vendor package under `<hardware_root>/<name>` with the
/// default boards/programmers declarations and the matching core,
/// variant and bootloader directories.
pub fn create_vendor_package(hardware_root: &Path, name: &str) -> std::io::Result<PathBuf> {
    let package = hardware_root.join(name);
    fs::create_dir_all(&package)?;
    fs::write(package.join("boards.txt"), BOARDS_TXT)?;
    fs::write(package.join("programmers.txt"), PROGRAMMERS_TXT)?;

    fs::create_dir_all(package.join("cores/arduino"))?;
    fs::create_dir_all(package.join("variants/standard"))?;
    fs::create_dir_all(package.join("variants/leonardo"))?;
    fs::create_dir_all(package.join("bootloaders/caterina"))?;
    fs::create_dir_all(package.join("bootloaders/optiboot"))?;
    fs::write(
        package.join("bootloaders/caterina/Caterina-Leonardo.hex"),
        ":00000001FF\n",
    )?;
    fs::write(
        package.join("bootloaders/optiboot/optiboot_atmega328.hex"),
        ":00000001FF\n",
    )?;
    Ok(package)
}

/// Create a minimal sketch project directory.
pub fn create_project(root: &Path, name: &str) -> std::io::Result<PathBuf> {
    let project = root.join(name);
    fs::create_dir_all(project.join("src"))?;
    fs::write(
        project.join(format!("{}.ino", name)),
        "void setup() {}\nvoid loop() {}\n",
    )?;
    fs::write(project.join("src/helpers.cpp"), "// helpers\n")?;
    Ok(project)
}

/// Write a fake external tool: a shell script that records its argument
/// vector (one invocation per line) into `calls_log` and exits with the
/// given status.
#[cfg(unix)]
pub fn fake_tool(path: &Path, calls_log: &Path, exit_code: i32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\nexit {}\n",
        calls_log.display(),
        exit_code
    );
    fs::write(path, script)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// Like [`fake_tool`], but sleeps before exiting so tests can observe an
/// in-flight process.
#[cfg(unix)]
pub fn slow_fake_tool(path: &Path, sleep_secs: u32, exit_code: i32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let script = format!("#!/bin/sh\nsleep {}\nexit {}\n", sleep_secs, exit_code);
    fs::write(path, script)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// Configuration pointing every external path into the test sandbox,
/// with timing tuned down so tests stay fast.
pub fn test_config(sandbox: &Path) -> AvrBrewConfig {
    AvrBrewConfig {
        hardware_dirs: vec![sandbox.join("hardware")],
        library_dirs: vec![sandbox.join("libraries"), sandbox.join("contrib")],
        toolchain: ToolchainConfig {
            root: sandbox.join("toolchain"),
            build_driver: sandbox.join("tools/BuildProject"),
            avrdude: sandbox.join("tools/avrdude"),
            avrdude_conf: sandbox.join("toolchain/etc/avrdude.conf"),
        },
        serial: SerialConfig {
            device_dir: sandbox.join("dev"),
            watch_interval_ms: 20,
        },
        upload: UploadConfig {
            verbosity: 4,
            touch_hold_ms: 10,
            reset_retries: 3,
            reset_poll_ms: 10,
            settle_ms: 10,
        },
    }
}

/// Read the fake tool's call log as one Vec of argument strings per
/// invocation.
pub fn read_calls(calls_log: &Path) -> Vec<String> {
    fs::read_to_string(calls_log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
