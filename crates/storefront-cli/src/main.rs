//! Storefront CLI - sign in and call the storefront API from a terminal.

mod app;
mod commands;

use std::path::PathBuf;

use api_transport::api::ChatProvider;
use clap::{Parser, Subcommand};
use client_config_and_utils::{init_logging, Config, Paths};

/// Storefront command-line interface.
#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Command-line client for the storefront API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, session and logs. Defaults to ~/.storefront
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the browser
    Login,
    /// Sign out and forget the stored session
    Logout {
        /// Where the identity provider should send the browser afterwards
        #[arg(long)]
        redirect: Option<String>,
    },
    /// Show the current session
    Status,
    /// Fetch a user by ID
    User {
        id: String,
    },
    /// Fetch the signed-in user's record
    Me,
    /// Ask the shopping assistant a question
    Chat {
        question: String,
        /// Model provider (chatgpt, gemini)
        #[arg(short, long, default_value = "chatgpt")]
        provider: ChatProvider,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, Some(paths.log_file()));

    let app = app::App::init(config, paths)?;

    match cli.command {
        Commands::Login => commands::login(&app).await,
        Commands::Logout { redirect } => commands::logout(&app, redirect.as_deref()).await,
        Commands::Status => commands::status(&app),
        Commands::User { id } => commands::user(&app, &id).await,
        Commands::Me => commands::me(&app).await,
        Commands::Chat { question, provider } => commands::chat(&app, &question, provider).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_provider() {
        let cli = Cli::try_parse_from(["storefront", "chat", "hello", "-p", "gemini"]).unwrap();
        match cli.command {
            Commands::Chat { question, provider } => {
                assert_eq!(question, "hello");
                assert_eq!(provider, ChatProvider::Gemini);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "storefront",
            "status",
            "--log-level",
            "debug",
            "--base-dir",
            "/tmp/sf",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/sf")));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["storefront", "chat", "hi", "-p", "bard"]).is_err());
    }
}
