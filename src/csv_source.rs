use crate::error::DataUnavailable;
use crate::market_data::{check_range, normalize_ticker, PriceBar, PriceFetcher, PriceSeries};
use crate::simulation::parse_date;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Serves price history from `{data_dir}/{TICKER}.csv` files, the layout of
/// exchange "historical data" downloads.
pub struct CsvDirectoryFetcher {
    data_dir: PathBuf,
}

impl CsvDirectoryFetcher {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }
}

/// Column positions resolved from the header row.
struct Columns {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DataUnavailable> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let date = find(&["date"]).ok_or_else(|| DataUnavailable::InvalidResponse("missing Date column".to_string()))?;
        let close = find(&["close", "close/last", "adj close"])
            .ok_or_else(|| DataUnavailable::InvalidResponse("missing Close column".to_string()))?;

        Ok(Self {
            date,
            close,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            volume: find(&["volume"]),
        })
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().trim_start_matches('$').replace(',', "").parse().ok()
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).unwrap_or_default()
}

/// Parses a price history file. Rows with an unreadable date or close are skipped.
pub fn parse_price_csv(ticker: &str, content: &str) -> Result<PriceSeries, DataUnavailable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns = Columns::from_headers(reader.headers()?)?;

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(date) = parse_date(field(&record, Some(columns.date))) else {
            continue;
        };
        let Some(close) = parse_price(field(&record, Some(columns.close))) else {
            continue;
        };
        let price_or_close = |index| parse_price(field(&record, index)).unwrap_or(close);

        bars.push(PriceBar {
            date,
            open: price_or_close(columns.open),
            high: price_or_close(columns.high),
            low: price_or_close(columns.low),
            close,
            volume: field(&record, columns.volume).replace(',', "").parse().unwrap_or(0),
        });
    }

    Ok(PriceSeries::from_unordered(ticker, bars))
}

#[async_trait]
impl PriceFetcher for CsvDirectoryFetcher {
    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataUnavailable> {
        check_range(start, end)?;
        let symbol = normalize_ticker(ticker)?;
        let path = self.file_for(&symbol);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataUnavailable::UnknownTicker { ticker: symbol });
            }
            Err(e) => return Err(e.into()),
        };

        let mut series = parse_price_csv(&symbol, &content)?;
        let total = series.len();
        series.retain_range(start, end);
        debug!(symbol = %symbol, total, kept = series.len(), "Loaded price file");

        if series.is_empty() {
            return Err(DataUnavailable::NoData { ticker: symbol, start, end });
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const EXPORT: &str = "Date,Close/Last,Volume,Open,High,Low\n\
        08/01/2024,$218.36,\"62,500,000\",$224.37,$224.48,$217.02\n\
        07/31/2024,$222.08,50036260,$221.44,$223.82,$220.63\n\
        07/30/2024,$218.80,41601350,$219.19,$220.33,$216.12\n";

    #[test]
    fn test_parse_exchange_export() {
        let series = parse_price_csv("AAPL", EXPORT).unwrap();
        assert_eq!(series.dates(), vec![day("2024-07-30"), day("2024-07-31"), day("2024-08-01")]);
        assert_eq!(series.closes(), vec![218.80, 222.08, 218.36]);
        assert_eq!(series.bars[1].open, 221.44);
        assert_eq!(series.bars[2].volume, 62_500_000);
    }

    #[test]
    fn test_parse_requires_close_column() {
        let err = parse_price_csv("AAPL", "Date,Open\n2024-01-02,1.0\n").unwrap_err();
        assert!(matches!(err, DataUnavailable::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AAPL.csv"), EXPORT).unwrap();
        let fetcher = CsvDirectoryFetcher::new(dir.path());

        let series = fetcher.fetch("aapl", day("2024-07-31"), day("2024-08-01")).await.unwrap();
        assert_eq!(series.ticker, "AAPL");
        assert_eq!(series.closes(), vec![222.08]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_ticker_and_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("AAPL.csv"), EXPORT).unwrap();
        let fetcher = CsvDirectoryFetcher::new(dir.path());

        let err = fetcher.fetch("MSFT", day("2024-01-01"), day("2024-12-31")).await.unwrap_err();
        assert!(matches!(err, DataUnavailable::UnknownTicker { ref ticker } if ticker == "MSFT"));

        let err = fetcher.fetch("AAPL", day("2020-01-01"), day("2020-02-01")).await.unwrap_err();
        assert!(matches!(err, DataUnavailable::NoData { .. }));
    }
}
