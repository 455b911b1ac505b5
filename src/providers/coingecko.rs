use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

use super::util::with_retry;
use crate::core::config::CoinGeckoProviderConfig;
use crate::core::price::{LookupFailure, PriceOutcome, PriceQuery, PriceSource};

// {"bitcoin": {"usd": 65000, "eur": 60000}, ...}
type SimplePriceResponse = HashMap<String, HashMap<String, Value>>;

/// Price source backed by a CoinGecko-compatible `/simple/price` endpoint.
pub struct CoinGeckoProvider {
    price_url: Url,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl CoinGeckoProvider {
    pub fn new(config: &CoinGeckoProviderConfig) -> anyhow::Result<Self> {
        let price_url = Url::parse(&format!(
            "{}/simple/price",
            config.base_url.trim_end_matches('/')
        ))
        .with_context(|| format!("Invalid CoinGecko base URL: {}", config.base_url))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("finfaq/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(CoinGeckoProvider {
            price_url,
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn request_url(&self, query: &PriceQuery) -> Url {
        let mut url = self.price_url.clone();
        url.query_pairs_mut()
            .append_pair("ids", query.symbol())
            .append_pair("vs_currencies", query.market());
        url
    }

    async fn fetch_body(&self, url: Url, query: &PriceQuery) -> Result<String, LookupFailure> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|source| LookupFailure::Request {
                query: query.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupFailure::Status {
                query: query.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| LookupFailure::Request {
            query: query.to_string(),
            source,
        })
    }
}

fn extract_price(data: &SimplePriceResponse, query: &PriceQuery) -> Result<PriceOutcome, LookupFailure> {
    let Some(value) = data
        .get(query.symbol())
        .and_then(|markets| markets.get(query.market()))
    else {
        return Ok(PriceOutcome::NotFound);
    };

    match value {
        Value::Number(price) => Ok(PriceOutcome::Found(price.clone())),
        Value::Null => Ok(PriceOutcome::NotFound),
        other => Err(LookupFailure::UnexpectedValue {
            query: query.to_string(),
            value: other.clone(),
        }),
    }
}

#[async_trait]
impl PriceSource for CoinGeckoProvider {
    #[instrument(
        name = "CoinGeckoPriceFetch",
        skip(self),
        fields(query = %query)
    )]
    async fn get_price(&self, query: &PriceQuery) -> Result<PriceOutcome, LookupFailure> {
        let url = self.request_url(query);
        debug!("Requesting price data from {}", url);

        let body = with_retry(
            || self.fetch_body(url.clone(), query),
            self.retries,
            self.retry_delay_ms,
        )
        .await?;

        let data: SimplePriceResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(source) => {
                error!(
                    error = ?source,
                    response = %body,
                    "Failed to parse price response"
                );
                return Err(LookupFailure::Decode {
                    query: query.to_string(),
                    source,
                });
            }
        };

        let outcome = extract_price(&data, query)?;
        debug!(outcome = ?outcome, "Resolved price");
        Ok(outcome)
    }
}
