use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flosskey_cli::cli::{commands, run_daemon, CliConfig};
use flosskey_core::tracing_setup::init_tracing;

#[derive(Parser)]
#[command(name = "flosskey")]
#[command(about = "Background notification poller for Misskey accounts")]
struct Cli {
    /// Path to JSON config file (defaults to ~/.flosskey/config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll all accounts until interrupted (default)
    Run,

    /// Run a single cycle for every account and exit
    Check,

    /// List configured accounts and report invalid entries
    Accounts,

    /// Store an account's access token in the OS keyring
    SetToken {
        #[arg(long, short = 'i')]
        instance: String,
        #[arg(long, short = 's')]
        schedule_id: u32,
        /// Token value; read from stdin when omitted
        token: Option<String>,
    },

    /// Forget an account's watermark so its next cycle starts from scratch
    ResetWatermark {
        #[arg(long, short = 'i')]
        instance: String,
        #[arg(long, short = 's')]
        schedule_id: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.unwrap_or_else(CliConfig::default_path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            run_daemon(&config_path).await?;
            Ok(0)
        }
        Commands::Check => {
            let config = CliConfig::load(&config_path)?;
            let failures = commands::check(&config).await?;
            Ok(if failures == 0 { 0 } else { 2 })
        }
        Commands::Accounts => {
            let config = CliConfig::load(&config_path)?;
            commands::list_accounts(&config)?;
            Ok(0)
        }
        Commands::SetToken {
            instance,
            schedule_id,
            token,
        } => {
            let token = match token {
                Some(token) => token,
                None => read_token_from_stdin()?,
            };
            commands::set_token(&instance, schedule_id, &token)?;
            Ok(0)
        }
        Commands::ResetWatermark {
            instance,
            schedule_id,
        } => {
            let config = CliConfig::load(&config_path)?;
            commands::reset_watermark(&config, &instance, schedule_id).await?;
            Ok(0)
        }
    }
}

fn read_token_from_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read token from stdin")?;
    Ok(line.trim().to_string())
}
