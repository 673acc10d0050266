use crate::market_data::PriceSeries;
use crate::simulation::{LeverageOutcome, SimulatedSeries};
use serde::{Deserialize, Serialize};

pub const ACTUAL_TRACE_NAME: &str = "Actual Close";
pub const SIMULATED_TRACE_NAME: &str = "Simulated Close";
pub const LEVERAGE_TRACE_NAME: &str = "Leverage Simulation";

/// A line trace in Plotly's figure format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub mode: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl Trace {
    pub fn line(name: &str, x: Vec<String>, y: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            kind: "scatter".to_string(),
            mode: "lines".to_string(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub title: Title,
}

impl Axis {
    fn titled(text: &str) -> Self {
        Self {
            title: Title { text: text.to_string() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub xref: String,
    pub yref: String,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "showarrow")]
    pub show_arrow: bool,
}

impl Annotation {
    fn centered(text: &str) -> Self {
        Self {
            text: text.to_string(),
            xref: "paper".to_string(),
            yref: "paper".to_string(),
            x: 0.5,
            y: 0.5,
            show_arrow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// What the page hands to `Plotly.react`. `error` is set when the figure
/// stands in for data that could not be loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPayload {
    pub data: Vec<Trace>,
    pub layout: Layout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn simulation_title(ticker: &str) -> String {
    format!("{} Stock Price - Actual vs Simulated", ticker)
}

impl ChartPayload {
    /// The blank figure shown before the first run.
    pub fn empty() -> Self {
        Self::default()
    }

    fn price_layout(ticker: &str) -> Layout {
        Layout {
            title: Some(Title { text: simulation_title(ticker) }),
            xaxis: Some(Axis::titled("Date")),
            yaxis: Some(Axis::titled("Price")),
            annotations: Vec::new(),
        }
    }

    /// Titled with `ticker` as the user typed it, matching the error figure.
    pub fn simulation(ticker: &str, actual: &PriceSeries, simulated: &SimulatedSeries) -> Self {
        let dates: Vec<String> = actual.dates().iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();

        Self {
            data: vec![
                Trace::line(ACTUAL_TRACE_NAME, dates.clone(), actual.closes()),
                Trace::line(SIMULATED_TRACE_NAME, dates, simulated.values()),
            ],
            layout: Self::price_layout(ticker),
            error: None,
        }
    }

    /// No traces, the usual title, and the message printed across the plot.
    pub fn error(ticker: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut layout = Self::price_layout(ticker);
        layout.annotations.push(Annotation::centered(&message));

        Self {
            data: Vec::new(),
            layout,
            error: Some(message),
        }
    }

    pub fn leverage(outcomes: &[LeverageOutcome], leverage: f64) -> Self {
        let x = outcomes.iter().map(|o| o.start_date.clone()).collect();
        let y = outcomes.iter().map(|o| o.final_value).collect();

        Self {
            data: vec![Trace::line(LEVERAGE_TRACE_NAME, x, y)],
            layout: Layout {
                title: Some(Title {
                    text: format!("{}x Leverage - Final Value of $1 by Start Date", leverage),
                }),
                xaxis: Some(Axis::titled("Start Date")),
                yaxis: Some(Axis::titled("Final Value ($)")),
                annotations: Vec::new(),
            },
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
