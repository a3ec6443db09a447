use anyhow::Result;
use clap::Parser;

mod agent;
mod cli;
mod commands;
mod focus;
mod platform;

use cli::{Args, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => agent::get_agent_config_path()?,
    };
    let config = agent::AgentConfig::load_or_default(&config_path)?;

    commands::utils::init_logging(args.verbose, &config.logging.level);

    match args.command {
        Commands::Init { force } => commands::agent::init(&config_path, &config, force),
        Commands::Modes { command } => commands::run_mode_command(command, &config),
        Commands::Authorize => commands::agent::authorize(&config),
        Commands::Revoke => commands::agent::revoke(&config),
        Commands::Check => commands::agent::check(&config),
        Commands::Run { flow } => commands::agent::run(config, flow),
        Commands::Status => commands::agent::status(&config),
    }
}
