//! Plated CLI - Database migrations.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! plated-cli migrate
//!
//! # List applied and pending migrations
//! plated-cli migrate --status
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (also read from `.env`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "plated-cli")]
#[command(author, version, about = "Plated CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Report migration state without applying anything
        #[arg(long)]
        status: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plated_cli=info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::migrate::MigrationError> {
    match cli.command {
        Commands::Migrate { status: true } => commands::migrate::status().await,
        Commands::Migrate { status: false } => commands::migrate::run().await,
    }
}
