//! Boards/programmers listing command implementation

use anyhow::Result;

use crate::config::AvrBrewConfig;
use crate::hardware::HardwareRegistry;

pub async fn execute_boards_command(config: &AvrBrewConfig) -> Result<()> {
    let registry = HardwareRegistry::scan(&config.hardware_dirs);

    if registry.directories().is_empty() {
        anyhow::bail!(
            "No hardware packages found. Configure hardware_dirs in {}",
            AvrBrewConfig::default_path().display()
        );
    }

    let mut boards: Vec<_> = registry.boards().collect();
    boards.sort_by_key(|b| (b.provenience().to_string(), b.id.clone()));

    println!("Boards:");
    let mut provenience = String::new();
    for board in boards {
        // Grouped by vendor package, like the IDE's board menu
        if board.provenience() != provenience {
            provenience = board.provenience().to_string();
            println!("  [{}]", provenience);
        }
        println!(
            "    {:<24} {}",
            board.id,
            board.name().unwrap_or("(unnamed)")
        );
    }

    println!("\nProgrammers:");
    for programmer in registry.programmers() {
        println!(
            "    {:<24} {}",
            programmer.id,
            programmer.name().unwrap_or("(unnamed)")
        );
    }

    Ok(())
}
