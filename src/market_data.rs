use crate::error::DataUnavailable;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Core Data Structures ---

/// One trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars for one ticker, ascending by date with no duplicate dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from bars in any order. Later bars win on duplicate dates.
    pub fn from_unordered(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.reverse();
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Keeps bars inside `[start, end)`.
    pub fn retain_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.bars.retain(|b| b.date >= start && b.date < end);
    }
}

/// A source of daily price history.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Bars covering `[start, end)`, ascending by date.
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataUnavailable>;
}

pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), DataUnavailable> {
    if start >= end {
        return Err(DataUnavailable::EmptyRange { start, end });
    }
    Ok(())
}

/// Tickers are used in URLs and file names, so only symbol characters pass.
pub fn normalize_ticker(ticker: &str) -> Result<String, DataUnavailable> {
    let ticker = ticker.trim().to_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= 16
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        && !ticker.contains("..");

    if valid {
        Ok(ticker)
    } else {
        Err(DataUnavailable::UnknownTicker { ticker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: day(date),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn test_from_unordered_sorts_and_dedups() {
        let series = PriceSeries::from_unordered(
            "MSFT",
            vec![bar("2024-01-03", 3.0), bar("2024-01-02", 2.0), bar("2024-01-03", 4.0)],
        );
        assert_eq!(series.dates(), vec![day("2024-01-02"), day("2024-01-03")]);
        assert_eq!(series.closes(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_retain_range_is_half_open() {
        let mut series = PriceSeries::from_unordered(
            "MSFT",
            vec![bar("2024-01-01", 1.0), bar("2024-01-02", 2.0), bar("2024-01-03", 3.0)],
        );
        series.retain_range(day("2024-01-02"), day("2024-01-03"));
        assert_eq!(series.closes(), vec![2.0]);
    }

    #[test]
    fn test_check_range() {
        assert!(check_range(day("2020-01-01"), day("2024-07-31")).is_ok());
        assert!(matches!(
            check_range(day("2024-07-31"), day("2024-07-31")),
            Err(DataUnavailable::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert!(normalize_ticker("").is_err());
        assert!(normalize_ticker("../etc/passwd").is_err());
        assert!(normalize_ticker("AA PL").is_err());
    }
}
