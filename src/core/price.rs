//! Pricing abstractions and core types

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt::Display;
use thiserror::Error;

pub const DEFAULT_MARKET: &str = "usd";
pub const PRICE_NOT_FOUND: &str = "Price not found";

/// A symbol/market pair, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceQuery {
    symbol: String,
    market: String,
}

impl PriceQuery {
    pub fn new(symbol: &str, market: Option<&str>) -> Self {
        PriceQuery {
            symbol: symbol.to_lowercase(),
            market: market.unwrap_or(DEFAULT_MARKET).to_lowercase(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn market(&self) -> &str {
        &self.market
    }
}

impl Display for PriceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.market)
    }
}

/// A quoted price. The upstream number is kept as-is so integers stay integers
/// when echoed back.
pub type Price = serde_json::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum PriceOutcome {
    Found(Price),
    NotFound,
}

impl PriceOutcome {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PriceOutcome::Found(price) => price.as_f64(),
            PriceOutcome::NotFound => None,
        }
    }
}

impl Serialize for PriceOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriceOutcome::Found(price) => price.serialize(serializer),
            PriceOutcome::NotFound => serializer.serialize_str(PRICE_NOT_FOUND),
        }
    }
}

/// The price source could not be asked, or its answer could not be read.
#[derive(Debug, Error)]
pub enum LookupFailure {
    #[error("Request error for {query}: {source}")]
    Request {
        query: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {status} for {query}")]
    Status {
        query: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse price response for {query}: {source}")]
    Decode {
        query: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected price value for {query}: {value}")]
    UnexpectedValue {
        query: String,
        value: serde_json::Value,
    },
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn get_price(&self, query: &PriceQuery) -> Result<PriceOutcome, LookupFailure>;
}
