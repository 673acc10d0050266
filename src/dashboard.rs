use crate::chart::ChartPayload;
use crate::error::SimulationError;
use crate::market_data::PriceFetcher;
use crate::simulation::{leverage_sweep, parse_csv_bars, simulate_series};
use chrono::NaiveDate;
use tracing::{info, instrument, warn};

/// Fetches `ticker` over `[start, end)`, amplifies the closes and returns both
/// traces. A failed fetch becomes an error figure rather than an `Err`.
#[instrument(skip(fetcher))]
pub async fn handle_simulation_request(
    fetcher: &dyn PriceFetcher,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    multiplier: f64,
) -> ChartPayload {
    let series = match fetcher.fetch(ticker, start, end).await {
        Ok(series) => series,
        Err(e) => {
            warn!(error = %e, "Price data unavailable");
            return ChartPayload::error(ticker, e.to_string());
        }
    };

    let simulated = simulate_series(&series, multiplier);
    info!(
        bars = series.len(),
        first_close = series.bars.first().map(|b| b.close),
        last_simulated = simulated.points.last().map(|p| p.simulated_close),
        "Simulation complete"
    );

    ChartPayload::simulation(ticker, &series, &simulated)
}

/// Runs the leverage sweep over an uploaded CSV history.
#[instrument(skip(csv_text), fields(bytes = csv_text.len()))]
pub fn handle_leverage_request(
    csv_text: &str,
    start_index: usize,
    leverage: f64,
) -> Result<ChartPayload, SimulationError> {
    let bars = parse_csv_bars(csv_text)?;
    let outcomes = leverage_sweep(&bars, start_index, leverage)?;
    info!(rows = bars.len(), outcomes = outcomes.len(), "Leverage sweep complete");
    Ok(ChartPayload::leverage(&outcomes, leverage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataUnavailable;
    use crate::market_data::{check_range, PriceBar, PriceSeries};
    use async_trait::async_trait;

    struct FixedFetcher {
        closes: Vec<f64>,
    }

    #[async_trait]
    impl PriceFetcher for FixedFetcher {
        async fn fetch(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries, DataUnavailable> {
            check_range(start, end)?;
            if !ticker.eq_ignore_ascii_case("AAPL") {
                return Err(DataUnavailable::UnknownTicker { ticker: ticker.to_string() });
            }
            let bars = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 100,
                })
                .collect();
            Ok(PriceSeries::from_unordered(ticker.to_ascii_uppercase(), bars))
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_simulation_request_builds_both_traces() {
        let fetcher = FixedFetcher {
            closes: vec![100.0, 102.0, 101.0, 101.0, 105.0],
        };
        let payload = handle_simulation_request(&fetcher, "AAPL", day("2024-01-01"), day("2024-02-01"), 3.0).await;

        assert!(!payload.is_error());
        assert_eq!(payload.data[0].y, vec![100.0, 102.0, 101.0, 101.0, 105.0]);
        assert_eq!(payload.data[1].y, vec![100.0, 106.0, 103.0, 103.0, 115.0]);
        assert_eq!(payload.data[0].x[0], "2024-01-01");
    }

    #[tokio::test]
    async fn test_title_uses_ticker_as_entered() {
        let fetcher = FixedFetcher { closes: vec![100.0, 101.0] };
        let payload = handle_simulation_request(&fetcher, "aapl", day("2024-01-01"), day("2024-02-01"), 3.0).await;

        assert!(!payload.is_error());
        assert_eq!(
            payload.layout.title.as_ref().map(|t| t.text.as_str()),
            Some("aapl Stock Price - Actual vs Simulated")
        );
    }

    #[tokio::test]
    async fn test_invalid_ticker_yields_error_chart() {
        let fetcher = FixedFetcher { closes: vec![1.0] };
        let payload = handle_simulation_request(&fetcher, "ZZZZ", day("2024-01-01"), day("2024-02-01"), 3.0).await;

        assert!(payload.is_error());
        assert!(payload.data.is_empty());
        assert_eq!(payload.error.as_deref(), Some("unknown ticker ZZZZ"));
        assert_eq!(
            payload.layout.title.as_ref().map(|t| t.text.as_str()),
            Some("ZZZZ Stock Price - Actual vs Simulated")
        );
    }

    #[tokio::test]
    async fn test_inverted_range_yields_error_chart() {
        let fetcher = FixedFetcher { closes: vec![1.0] };
        let payload = handle_simulation_request(&fetcher, "AAPL", day("2024-07-31"), day("2020-01-01"), 3.0).await;
        assert!(payload.error.unwrap().starts_with("empty date range"));
    }

    #[test]
    fn test_leverage_request() {
        let mut csv_text = String::from("Date,Close,Open,High,Low\n");
        for d in 1..=11 {
            csv_text.push_str(&format!("2024-01-{:02},110,100,111,99\n", d));
        }
        let payload = handle_leverage_request(&csv_text, 0, 1.0).unwrap();
        assert_eq!(payload.data[0].x, vec!["2024-01-01", "2024-01-02"]);
        assert!((payload.data[0].y[0] - 1.1_f64.powi(11)).abs() < 1e-9);
        assert!((payload.data[0].y[1] - 1.1_f64.powi(10)).abs() < 1e-9);

        assert!(matches!(handle_leverage_request("", 0, 3.0), Err(SimulationError::NoData)));
        let header_only = handle_leverage_request("Date,Close,Open,High,Low\n", 0, 3.0).unwrap();
        assert!(header_only.data[0].x.is_empty());
    }
}
