use crate::chart::ChartPayload;
use crate::config::AppConfig;
use crate::dashboard::{handle_leverage_request, handle_simulation_request};
use crate::error::ApiError;
use crate::market_data::PriceFetcher;
use crate::page::render_index;
use crate::simulation::DEFAULT_LEVERAGE;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub type SharedConfig = Arc<AppConfig>;
pub type SharedFetcher = Arc<dyn PriceFetcher>;

#[derive(Debug, Deserialize)]
pub struct SimulateParams {
    pub ticker: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct LeverageParams {
    #[serde(default)]
    pub start_index: usize,
    pub leverage: Option<f64>,
}

#[instrument(skip(config))]
pub async fn index_handler(State(config): State<SharedConfig>) -> Result<Html<String>, ApiError> {
    debug!("Rendering dashboard page");
    Ok(Html(render_index(&config.defaults)?))
}

pub async fn empty_figure_handler() -> Json<ChartPayload> {
    Json(ChartPayload::empty())
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

#[instrument(skip(config, fetcher))]
pub async fn simulate_handler(
    State(config): State<SharedConfig>,
    State(fetcher): State<SharedFetcher>,
    Query(params): Query<SimulateParams>,
) -> Json<ChartPayload> {
    let ticker = params
        .ticker
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| config.defaults.ticker.clone());
    let start = params.start.unwrap_or(config.defaults.start_date);
    let end = params.end.unwrap_or(config.defaults.end_date);

    info!(%ticker, %start, %end, multiplier = config.multiplier, "Running simulation");
    let payload = handle_simulation_request(fetcher.as_ref(), &ticker, start, end, config.multiplier).await;
    Json(payload)
}

#[instrument(skip(body), fields(bytes = body.len()))]
pub async fn leverage_handler(
    Query(params): Query<LeverageParams>,
    body: String,
) -> Result<Json<ChartPayload>, ApiError> {
    let leverage = params.leverage.unwrap_or(DEFAULT_LEVERAGE);
    if !leverage.is_finite() {
        return Err(ApiError::bad_request("leverage must be a finite number"));
    }

    let payload = handle_leverage_request(&body, params.start_index, leverage)?;
    Ok(Json(payload))
}
