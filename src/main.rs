//! AVRBrew CLI entry point

use anyhow::Result;
use avrbrew::cli::{Cli, Commands, commands};
use avrbrew::config::AvrBrewConfig;
use avrbrew::models::RunOutcome;
use avrbrew::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init_cli_logging(cli.verbose, cli.quiet)?;

    let config = AvrBrewConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command.clone() else {
        // Listing the boards is the cheapest useful default
        return commands::boards::execute_boards_command(&config).await;
    };

    match command {
        Commands::Boards => commands::boards::execute_boards_command(&config).await,
        Commands::Ports { watch } => {
            commands::ports::execute_ports_command(&config, watch).await
        }
        Commands::Build { board, source } => {
            let project_dir = commands::project_dir(&cli)?;
            let registry = commands::load_registry(&config);
            let outcome = commands::build::execute_build_command(
                &config,
                &registry,
                &project_dir,
                &board,
                &source,
            )
            .await?;
            exit_on_tool_failure(outcome, "Build")
        }
        Commands::Upload {
            board,
            programmer,
            port,
            chain_build,
        } => {
            let project_dir = commands::project_dir(&cli)?;
            let registry = commands::load_registry(&config);
            let outcome = commands::upload::execute_upload_command(
                &config,
                &registry,
                &project_dir,
                &board,
                programmer.as_deref(),
                &port,
                chain_build,
            )
            .await?;
            exit_on_tool_failure(outcome, "Upload")
        }
        Commands::BurnBootloader {
            board,
            programmer,
            port,
        } => {
            let project_dir = commands::project_dir(&cli)?;
            let registry = commands::load_registry(&config);
            let outcome = commands::burn::execute_burn_command(
                &config,
                &registry,
                &project_dir,
                &board,
                &programmer,
                &port,
            )
            .await?;
            exit_on_tool_failure(outcome, "Bootloader burn")
        }
        Commands::Terminal {
            board,
            programmer,
            port,
        } => {
            let project_dir = commands::project_dir(&cli)?;
            let registry = commands::load_registry(&config);
            commands::terminal::execute_terminal_command(
                &config,
                &registry,
                &project_dir,
                &board,
                programmer.as_deref(),
                &port,
            )
            .await
        }
        Commands::Clean => {
            let project_dir = commands::project_dir(&cli)?;
            commands::clean::execute_clean_command(&project_dir).await
        }
    }
}

/// Map a tool failure to a CLI error; resolution errors already
/// propagated as errors with their own messages.
fn exit_on_tool_failure(outcome: RunOutcome, what: &str) -> Result<()> {
    match outcome {
        RunOutcome::Success => Ok(()),
        RunOutcome::ToolFailed(code) => {
            anyhow::bail!("{} failed with exit status {}", what, code)
        }
    }
}
