use crate::chart::ChartPayload;
use crate::config::UiDefaults;
use crate::simulation::DEFAULT_LEVERAGE;
use askama::Template;

pub const PAGE_TITLE: &str = "Stock Price Simulation Dashboard";

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: &'static str,
    pub ticker: String,
    pub start: String,
    pub end: String,
    pub leverage: f64,
    pub empty_figure: String,
}

impl IndexTemplate {
    pub fn new(defaults: &UiDefaults) -> Self {
        Self {
            title: PAGE_TITLE,
            ticker: defaults.ticker.clone(),
            start: defaults.start_date.format("%Y-%m-%d").to_string(),
            end: defaults.end_date.format("%Y-%m-%d").to_string(),
            leverage: DEFAULT_LEVERAGE,
            empty_figure: serde_json::to_string(&ChartPayload::empty()).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

/// The dashboard page, pre-filled with `defaults` and showing an empty chart.
pub fn render_index(defaults: &UiDefaults) -> Result<String, askama::Error> {
    IndexTemplate::new(defaults).render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_defaults() {
        let html = render_index(&UiDefaults::default()).unwrap();
        assert!(html.contains("<h1>Stock Price Simulation Dashboard</h1>"));
        assert!(html.contains(r#"value="AAPL""#));
        assert!(html.contains(r#"value="2020-01-01""#));
        assert!(html.contains(r#"value="2024-07-31""#));
        assert!(html.contains("Run Simulation"));
        assert!(html.contains(r#"const emptyFigure = {"data":[],"layout":{}};"#));
        assert!(html.contains(r#"value="3""#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_index_escapes_ticker() {
        let defaults = UiDefaults {
            ticker: "\"><script>".to_string(),
            ..UiDefaults::default()
        };
        let html = render_index(&defaults).unwrap();
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!html.contains("\"><script>"));
    }
}
