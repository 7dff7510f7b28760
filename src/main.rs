//! # Autoposter
//!
//! A long-running service that scrapes articles from a fixed set of news
//! sites, deduplicates them against a durable store of already-posted URLs,
//! and delivers new items to Telegram channels. Long reads are split across
//! a photo caption and follow-up messages or threaded discussion-group
//! comments.
//!
//! ## Usage
//!
//! ```sh
//! autoposter -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! One cycle per hour, per feed:
//! 1. **Scrape**: the feed's registered scraper fetches the listing page
//!    (and article pages where needed) and yields normalized items
//! 2. **Filter**: items already in the processed-URL store or lacking an
//!    image are dropped
//! 3. **Deliver**: each surviving item is posted according to its delivery
//!    shape, then marked processed
//!
//! Failures are logged and scoped to the item, feed, or cycle that raised
//! them; only a shutdown signal stops the loop.

use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod ai;
mod cli;
mod config;
mod error;
mod models;
mod poster;
mod scrapers;
mod service;
mod splitter;
mod store;
mod telegram;
mod utils;

use ai::OpenRouterClient;
use cli::Cli;
use service::AutoPoster;
use store::ProcessedItemStore;
use telegram::TelegramBot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("autoposter starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(config = %args.config, db_path = %args.db_path, "Parsed CLI arguments");

    // ---- Load configuration ----
    let mut app_config = config::load_config(&args.config)?;
    if let Some(token) = args.bot_token {
        app_config.bot.token = token;
    }
    if app_config.feeds.is_empty() {
        warn!("No feeds configured; the service will idle");
    }
    if let Some(cutoff) = app_config.start_date_time {
        debug!(%cutoff, "Start cutoff present in config (not applied as a filter)");
    }

    // ---- Shared HTTP client (optional proxy) ----
    let mut http_builder = reqwest::Client::builder();
    if let Some(proxy_url) = &app_config.bot.proxy_url {
        info!(proxy = %proxy_url, "Routing outbound traffic through proxy");
        http_builder = http_builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }
    let http = http_builder.build()?;

    // ---- Wire components ----
    let store = ProcessedItemStore::open(&args.db_path).await?;
    let scrapers = scrapers::build_registry(&http);
    info!(scrapers = scrapers.len(), feeds = app_config.feeds.len(), "Components wired");

    let bot = TelegramBot::new(&app_config.bot.token, http.clone());

    let _ai_helper = match app_config.openrouter.take() {
        Some(ai_config) => {
            info!(model = %ai_config.model, "AI text helper configured");
            Some(OpenRouterClient::new(ai_config)?)
        }
        None => None,
    };

    let poster = AutoPoster::new(scrapers, Box::new(bot), store, app_config.feeds.clone());

    // ---- Cooperative shutdown ----
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_cancel.cancel();
        }
    });

    poster.run(cancel).await;

    info!("autoposter exited cleanly");
    Ok(())
}
