use crate::error::SimulationError;
use crate::market_data::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_LEVERAGE: f64 = 3.0;

/// Rows at the tail of an uploaded file that never start a leverage run.
pub const LEVERAGE_TAIL_ROWS: usize = 10;

// --- Amplifier ---

/// Walks the close prices forward, adding each day's change scaled by
/// `multiplier` onto the previous simulated value. Seeded at `prices[0]`.
pub fn amplify(prices: &[f64], multiplier: f64) -> Vec<f64> {
    let Some(&first) = prices.first() else {
        return Vec::new();
    };

    let mut simulated = Vec::with_capacity(prices.len());
    simulated.push(first);

    for window in prices.windows(2) {
        let previous = simulated[simulated.len() - 1];
        let delta = window[1] - window[0];
        // The zero branch is redundant (0 * multiplier == 0) but kept as written.
        if delta != 0.0 {
            simulated.push(previous + delta * multiplier);
        } else {
            simulated.push(previous);
        }
    }

    simulated
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedPoint {
    pub date: NaiveDate,
    pub simulated_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSeries {
    pub ticker: String,
    pub multiplier: f64,
    pub points: Vec<SimulatedPoint>,
}

impl SimulatedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.simulated_close).collect()
    }
}

/// Amplifies the close column of `series`, keeping its date keys.
pub fn simulate_series(series: &PriceSeries, multiplier: f64) -> SimulatedSeries {
    let simulated = amplify(&series.closes(), multiplier);
    let points = series
        .bars
        .iter()
        .zip(simulated)
        .map(|(bar, simulated_close)| SimulatedPoint {
            date: bar.date,
            simulated_close,
        })
        .collect();

    SimulatedSeries {
        ticker: series.ticker.clone(),
        multiplier,
        points,
    }
}

// --- Leverage sweep over uploaded CSV rows ---

/// One row of an uploaded price history. Columns are read as
/// `date, close, open, high, low`; numbers that fail to parse are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvBar {
    pub date: String,
    pub close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
}

impl CsvBar {
    /// Stands in for a blank line, which still takes up a row.
    fn blank() -> Self {
        Self {
            date: String::new(),
            close: f64::NAN,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
        }
    }

    fn is_usable(&self) -> bool {
        !self.open.is_nan() && !self.close.is_nan() && self.open != 0.0 && parse_date(&self.date).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageOutcome {
    pub start_date: String,
    pub final_value: f64,
}

/// Accepts ISO dates and the `MM/DD/YYYY` form used by exchange CSV exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

fn parse_number(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(f64::NAN)
}

/// Parses an uploaded CSV. The header row is skipped, rows stay in file order.
/// Every line after the header is a row, so blank lines (including the one
/// after a trailing newline) become unusable bars.
pub fn parse_csv_bars(text: &str) -> Result<Vec<CsvBar>, SimulationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let row_count = text.split('\n').count().saturating_sub(1);
    let mut bars = Vec::with_capacity(row_count);
    for record in reader.records() {
        let record = record?;
        // bars[k] is line k + 2; the reader skips blank lines
        if let Some(line) = record.position().map(|p| p.line() as usize) {
            while bars.len() + 2 < line {
                bars.push(CsvBar::blank());
            }
        }
        bars.push(CsvBar {
            date: record.get(0).unwrap_or_default().to_string(),
            close: parse_number(record.get(1)),
            open: parse_number(record.get(2)),
            high: parse_number(record.get(3)),
            low: parse_number(record.get(4)),
        });
    }
    if bars.len() < row_count {
        bars.resize_with(row_count, CsvBar::blank);
    }

    Ok(bars)
}

/// For every start row from `start_index` up to the last ten rows, compounds
/// $1 through each following usable row with `leverage` times its intraday
/// return.
pub fn leverage_sweep(
    bars: &[CsvBar],
    start_index: usize,
    leverage: f64,
) -> Result<Vec<LeverageOutcome>, SimulationError> {
    if bars.is_empty() {
        return Err(SimulationError::NoData);
    }
    if start_index >= bars.len() {
        return Err(SimulationError::StartOutOfRange {
            index: start_index,
            len: bars.len(),
        });
    }

    let last_start = bars.len().saturating_sub(LEVERAGE_TAIL_ROWS);
    let usable: Vec<bool> = bars.iter().map(CsvBar::is_usable).collect();

    let outcomes = (start_index..last_start)
        .map(|i| {
            let mut value = 1.0;
            for (bar, _) in bars[i..].iter().zip(&usable[i..]).filter(|(_, ok)| **ok) {
                let daily_change = (bar.close - bar.open) / bar.open;
                value += value * daily_change * leverage;
            }
            LeverageOutcome {
                start_date: bars[i].date.clone(),
                final_value: value,
            }
        })
        .collect();

    Ok(outcomes)
}
