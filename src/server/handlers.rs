use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::AppState;
use crate::core::fact::FactStore;
use crate::core::price::{DEFAULT_MARKET, LookupFailure, PriceOutcome, PriceQuery, PriceSource};

pub const FALLBACK_ANSWER: &str = "I don't know that yet.";

#[derive(Debug, Deserialize)]
pub struct FaqParams {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FaqResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    pub symbol: String,
    #[serde(default = "default_market")]
    pub market: String,
}

fn default_market() -> String {
    DEFAULT_MARKET.to_string()
}

/// Echoes the symbol and market as the caller sent them.
#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    pub market: String,
    pub price: PriceOutcome,
}

/// A price lookup that failed upstream. Rendered as `502 Bad Gateway` so it
/// can never be mistaken for the not-found sentinel.
#[derive(Debug)]
pub struct ApiError(LookupFailure);

impl From<LookupFailure> for ApiError {
    fn from(err: LookupFailure) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "Price lookup failed");
        let body = Json(json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_GATEWAY, body).into_response()
    }
}

pub fn answer_question(facts: &FactStore, question: &str) -> FaqResponse {
    let answer = match facts.lookup(question) {
        Some(answer) => answer.to_string(),
        None => {
            debug!(question, "No fact for question");
            FALLBACK_ANSWER.to_string()
        }
    };
    FaqResponse { answer }
}

pub async fn lookup_price(
    prices: &dyn PriceSource,
    request: PriceRequest,
) -> Result<PriceResponse, LookupFailure> {
    let query = PriceQuery::new(&request.symbol, Some(&request.market));
    let price = prices.get_price(&query).await?;
    Ok(PriceResponse {
        symbol: request.symbol,
        market: request.market,
        price,
    })
}

pub async fn faq(State(state): State<AppState>, Query(params): Query<FaqParams>) -> Json<FaqResponse> {
    Json(answer_question(&state.facts, &params.question))
}

pub async fn stock(
    State(state): State<AppState>,
    Json(request): Json<PriceRequest>,
) -> Result<Json<PriceResponse>, ApiError> {
    Ok(Json(lookup_price(state.prices.as_ref(), request).await?))
}

// Same operation as `stock`, exposed under the crypto path.
pub async fn crypto(
    state: State<AppState>,
    request: Json<PriceRequest>,
) -> Result<Json<PriceResponse>, ApiError> {
    stock(state, request).await
}
