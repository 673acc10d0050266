use crate::error::DataUnavailable;
use crate::market_data::{check_range, normalize_ticker, PriceBar, PriceFetcher, PriceSeries};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// --- Chart API response ---

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: Option<String>,
    pub currency: Option<String>,
    /// Exchange offset from UTC in seconds; bar dates are taken in exchange time.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

/// Converts a chart response into bars inside `[start, end)`.
pub fn parse_chart(
    ticker: &str,
    response: ChartResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataUnavailable> {
    if let Some(err) = response.chart.error {
        return Err(DataUnavailable::Provider {
            code: err.code,
            description: err.description,
        });
    }

    let no_data = || DataUnavailable::NoData {
        ticker: ticker.to_string(),
        start,
        end,
    };

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(no_data)?;

    let timestamps = match result.timestamp {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(no_data()),
    };

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataUnavailable::InvalidResponse("missing quote indicators".to_string()))?;

    if quote.close.len() != timestamps.len() {
        return Err(DataUnavailable::InvalidResponse(format!(
            "{} timestamps but {} closes",
            timestamps.len(),
            quote.close.len()
        )));
    }

    let column = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten().unwrap_or(f64::NAN);
    let offset = result.meta.gmtoffset;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let Some(close) = quote.close[i] else {
            continue;
        };
        let date = DateTime::from_timestamp(timestamp + offset, 0)
            .ok_or_else(|| DataUnavailable::InvalidResponse(format!("bad timestamp {} at index {}", timestamp, i)))?
            .date_naive();

        bars.push(PriceBar {
            date,
            open: column(&quote.open, i),
            high: column(&quote.high, i),
            low: column(&quote.low, i),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }

    let mut series = PriceSeries::from_unordered(ticker, bars);
    series.retain_range(start, end);
    if series.is_empty() {
        return Err(no_data());
    }
    Ok(series)
}

pub struct YahooChartClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooChartClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, random_agent: bool) -> Result<Self, DataUnavailable> {
        let client = Client::builder().timeout(timeout).build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
        ];

        Ok(YahooChartClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agents,
            random_agent,
        })
    }

    fn get_user_agent(&self) -> &str {
        if self.random_agent {
            if let Some(agent) = self.user_agents.choose(&mut rand::rng()) {
                return agent;
            }
        }
        &self.user_agents[0]
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{}", self.base_url, symbol)
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[async_trait]
impl PriceFetcher for YahooChartClient {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataUnavailable> {
        check_range(start, end)?;
        let symbol = normalize_ticker(ticker)?;

        let url = self.chart_url(&symbol);
        let period1 = day_start_timestamp(start).to_string();
        let period2 = day_start_timestamp(end).to_string();
        debug!(%url, %period1, %period2, "Requesting chart data");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ])
            .header("Accept", "application/json, text/plain, */*")
            .header("User-Agent", self.get_user_agent())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(symbol = %symbol, status = status.as_u16(), "Chart request failed");
            if let Ok(ChartResponse { chart: ChartEnvelope { error: Some(err), .. } }) =
                serde_json::from_str::<ChartResponse>(&body)
            {
                return Err(DataUnavailable::Provider {
                    code: err.code,
                    description: err.description,
                });
            }
            return Err(DataUnavailable::Status { status: status.as_u16() });
        }

        let parsed: ChartResponse =
            serde_json::from_str(&body).map_err(|e| DataUnavailable::InvalidResponse(e.to_string()))?;
        let series = parse_chart(&symbol, parsed, start, end)?;

        debug!(symbol = %symbol, bars = series.len(), "Parsed chart data");
        Ok(series)
    }
}
