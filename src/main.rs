use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundtrack::AppCommand;
use fundtrack::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the example configuration to the default location
    Setup,
    /// Run the HTTP API and web client
    Serve,
    /// Display the fund list with current NAVs and market values
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => fundtrack::cli::setup::setup(),
        Some(Commands::Serve) => fundtrack::run_command(AppCommand::Serve, config_path).await,
        Some(Commands::Summary) => fundtrack::run_command(AppCommand::Summary, config_path).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
