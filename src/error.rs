use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;

/// Why a price series could not be produced for a request.
#[derive(Debug, thiserror::Error)]
pub enum DataUnavailable {
    #[error("empty date range: {start} is not before {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown ticker {ticker}")]
    UnknownTicker { ticker: String },

    #[error("provider error [{code}]: {description}")]
    Provider { code: String, description: String },

    #[error("provider responded with status {status}")]
    Status { status: u16 },

    #[error("no data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures of the CSV leverage sweep.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("no price rows loaded")]
    NoData,

    #[error("starting row {index} is out of range for {len} rows")]
    StartOutOfRange { index: usize, len: usize },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config value {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        Self::internal(format!("failed to render page: {}", err))
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        let status = match &err {
            SimulationError::NoData
            | SimulationError::StartOutOfRange { .. }
            | SimulationError::Csv(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_messages() {
        let start = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let err = DataUnavailable::EmptyRange { start, end };
        assert_eq!(err.to_string(), "empty date range: 2024-07-31 is not before 2020-01-01");

        let err = DataUnavailable::Provider {
            code: "Not Found".to_string(),
            description: "No data found, symbol may be delisted".to_string(),
        };
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn test_simulation_error_maps_to_bad_request() {
        let api: ApiError = SimulationError::StartOutOfRange { index: 12, len: 5 }.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "starting row 12 is out of range for 5 rows");

        let api: ApiError = SimulationError::NoData.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
    }
}
