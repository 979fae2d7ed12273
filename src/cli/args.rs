//! Command line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "avrbrew")]
#[command(about = "🔧 Build and upload manager for AVR firmware projects")]
pub struct Cli {
    /// Path to the project directory (defaults to the current directory)
    #[arg(global = true, value_name = "PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Path to an avrbrew.toml configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List boards and programmers declared by the hardware packages
    Boards,
    /// List serial ports, optionally watching for device changes
    Ports {
        /// Keep running and report when the device set changes
        #[arg(long)]
        watch: bool,
    },
    /// Build the project for a board
    Build {
        /// Board identifier as declared in boards.txt
        #[arg(short, long)]
        board: String,
        /// Source files (discovered from the project directory if omitted)
        #[arg(long, value_name = "FILE")]
        source: Vec<PathBuf>,
    },
    /// Upload the built firmware to a device
    Upload {
        /// Board identifier as declared in boards.txt
        #[arg(short, long)]
        board: String,
        /// Programmer identifier; omit to use the board's own bootloader
        #[arg(long)]
        programmer: Option<String>,
        /// Target serial port (e.g. /dev/cu.usbmodem14101)
        #[arg(short = 'P', long)]
        port: String,
        /// Build first and only upload on success
        #[arg(long)]
        chain_build: bool,
    },
    /// Burn a bootloader onto a device using an external programmer
    BurnBootloader {
        /// Board identifier as declared in boards.txt
        #[arg(short, long)]
        board: String,
        /// Programmer identifier (required; burning never uses the
        /// board's own bootloader protocol)
        #[arg(long)]
        programmer: String,
        /// Target serial port
        #[arg(short = 'P', long)]
        port: String,
    },
    /// Open an interactive programmer terminal session
    Terminal {
        /// Board identifier as declared in boards.txt
        #[arg(short, long)]
        board: String,
        /// Programmer identifier; omit to use the board's own bootloader
        #[arg(long)]
        programmer: Option<String>,
        /// Target serial port
        #[arg(short = 'P', long)]
        port: String,
    },
    /// Remove the project's build directory
    Clean,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
