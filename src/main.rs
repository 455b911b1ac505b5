use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finfaq::core::log::init_logging;
use std::net::SocketAddr;

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

impl From<Commands> for finfaq::AppCommand {
    fn from(cmd: Commands) -> finfaq::AppCommand {
        match cmd {
            Commands::Serve { bind } => finfaq::AppCommand::Serve { bind },
            Commands::Faq { question } => finfaq::AppCommand::Faq { question },
            Commands::Price { symbol, market } => finfaq::AppCommand::Price { symbol, market },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP service
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Answer a question from the fact store
    Faq {
        /// Question text, matched exactly
        question: String,
    },
    /// Look up the price of a symbol
    Price {
        /// Asset identifier, e.g. bitcoin
        symbol: String,
        /// Quote currency [default: usd]
        #[arg(short, long)]
        market: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finfaq::cli::setup(),
        Some(cmd) => finfaq::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
