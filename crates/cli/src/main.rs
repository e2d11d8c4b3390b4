//! Civic Pulse CLI - Database migrations, demo data and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run schema and session-store migrations
//! civic-cli migrate
//!
//! # Insert demo accounts and issues
//! civic-cli seed --password civicpulse-demo
//!
//! # Create an account, or an administrator
//! civic-cli user create -e jo@example.org -n "Jo Park" -p "long-password" -r admin
//!
//! # Change an existing user's role
//! civic-cli user promote -e jo@example.org
//! ```
//!
//! # Environment Variables
//!
//! - `CIVIC_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "civic-cli")]
#[command(author, version, about = "Civic Pulse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations (schema and session store)
    Migrate,
    /// Insert demo accounts and issues
    Seed {
        /// Password given to newly created demo accounts
        #[arg(short, long, default_value = "civicpulse-demo")]
        password: String,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Debug, Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`citizen` or `admin`)
        #[arg(short, long, default_value = "citizen")]
        role: String,
    },
    /// Change the role of an existing account
    Promote {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`citizen` or `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { password } => commands::seed::run(&password).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::user::create(&email, &name, &password, &role).await?;
            }
            UserAction::Promote { email, role } => {
                commands::user::promote(&email, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_create_defaults_to_citizen() {
        let cli = Cli::try_parse_from([
            "civic-cli", "user", "create", "-e", "jo@example.org", "-n", "Jo", "-p", "long-enough",
        ])
        .unwrap();
        match cli.command {
            Commands::User {
                action: UserAction::Create { role, .. },
            } => assert_eq!(role, "citizen"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_promote_defaults_to_admin() {
        let cli = Cli::try_parse_from(["civic-cli", "user", "promote", "-e", "jo@example.org"]).unwrap();
        match cli.command {
            Commands::User {
                action: UserAction::Promote { email, role },
            } => {
                assert_eq!(email, "jo@example.org");
                assert_eq!(role, "admin");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_seed_has_default_password() {
        let cli = Cli::try_parse_from(["civic-cli", "seed"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { password } if password == "civicpulse-demo"));
    }
}
