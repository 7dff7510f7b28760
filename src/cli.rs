//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be supplied via environment variables instead of the config
//! file.

use clap::Parser;

/// Command-line arguments for the autoposter service.
///
/// # Examples
///
/// ```sh
/// # Run with the default config path
/// autoposter
///
/// # Explicit config and token override
/// autoposter -c /etc/autoposter/config.yaml --bot-token 123456:ABC
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Telegram bot token (overrides the config file)
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub bot_token: Option<String>,

    /// Path to the processed-URL database file
    #[arg(long, default_value = "processed-urls.db")]
    pub db_path: String,
}
