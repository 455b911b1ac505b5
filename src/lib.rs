pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

use crate::core::config::AppConfig;
use crate::core::fact::FactStore;
use crate::providers::CoinGeckoProvider;
use crate::server::AppState;
use crate::server::handlers::{PriceRequest, answer_question, lookup_price};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Serve { bind: Option<SocketAddr> },
    Faq { question: String },
    Price { symbol: String, market: Option<String> },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Loads the configured fact file, or the built-in FAQ. Any malformed entry
/// aborts startup.
pub fn load_facts(config: &AppConfig) -> Result<FactStore> {
    let facts = match &config.facts_path {
        Some(path) => FactStore::from_path(path)
            .with_context(|| format!("Failed to load facts from {path}"))?,
        None => FactStore::builtin().context("Failed to load built-in facts")?,
    };
    info!(facts = facts.len(), "Fact store ready");
    Ok(facts)
}

pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let facts = load_facts(config)?;
    let prices = CoinGeckoProvider::new(&config.providers.coingecko)?;
    Ok(AppState {
        facts: Arc::new(facts),
        prices: Arc::new(prices),
    })
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("finfaq starting...");
    let config = load_config(config_path)?;

    match command {
        AppCommand::Serve { bind } => {
            let state = build_state(&config)?;
            let addr = bind.unwrap_or(config.server.bind);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            server::serve(listener, state).await
        }
        AppCommand::Faq { question } => {
            let facts = load_facts(&config)?;
            let response = answer_question(&facts, &question);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        AppCommand::Price { symbol, market } => {
            let provider = CoinGeckoProvider::new(&config.providers.coingecko)?;
            let request = PriceRequest {
                symbol,
                market: market.unwrap_or_else(|| crate::core::price::DEFAULT_MARKET.to_string()),
            };
            let response = lookup_price(&provider, request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}
