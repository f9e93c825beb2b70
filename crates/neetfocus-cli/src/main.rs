use clap::{Parser, Subcommand};
use neetfocus_core::{CoreError, StoreError};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "neetfocus", version, about = "NEET study timer and session log")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the focus timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Log a study session by hand
    Log(commands::log::LogArgs),
    /// List or delete logged sessions
    Sessions {
        #[command(subcommand)]
        action: commands::sessions::SessionsAction,
    },
    /// Streak, goal progress and subject breakdowns
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Daily study goal
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// API token management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Log(args) => commands::log::run(args),
        Commands::Sessions { action } => commands::sessions::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        if is_auth_expired(e.as_ref()) {
            eprintln!("hint: run `neetfocus auth login --token <TOKEN>`");
        }
        std::process::exit(1);
    }
}

fn is_auth_expired(err: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(store) = err.downcast_ref::<StoreError>() {
        return store.is_auth_expired();
    }
    matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::Store(StoreError::AuthExpired))
    )
}
