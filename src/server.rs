use crate::api::{self, SharedConfig, SharedFetcher};
use crate::config::{AppConfig, DataProvider};
use crate::csv_source::CsvDirectoryFetcher;
use crate::error::{ConfigError, DataUnavailable};
use crate::yahoo::YahooChartClient;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::{io, net::SocketAddr, sync::Arc};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub fetcher: SharedFetcher,
}

impl FromRef<AppState> for SharedConfig {
    fn from_ref(app_state: &AppState) -> SharedConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SharedFetcher {
    fn from_ref(app_state: &AppState) -> SharedFetcher {
        app_state.fetcher.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build data provider: {0}")]
    Provider(#[from] DataUnavailable),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

impl AppState {
    pub fn new(config: AppConfig, fetcher: SharedFetcher) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
        }
    }
}

/// The price source named by the configuration.
pub fn build_fetcher(config: &AppConfig) -> Result<SharedFetcher, DataUnavailable> {
    let fetcher: SharedFetcher = match config.data_provider {
        DataProvider::Yahoo => Arc::new(YahooChartClient::new(
            config.yahoo_base_url.clone(),
            config.request_timeout,
            config.random_agent,
        )?),
        DataProvider::Csv => Arc::new(CsvDirectoryFetcher::new(config.data_dir.clone())),
    };
    Ok(fetcher)
}

pub fn build_router(state: AppState) -> Result<Router, ServerError> {
    let simulate_route = match &state.config.rate_limit {
        Some(limit) => {
            let governor_conf = Arc::new(
                GovernorConfigBuilder::default()
                    .per_second(limit.replenish_every_secs)
                    .burst_size(limit.burst_size)
                    .finish()
                    .ok_or_else(|| ConfigError::Invalid {
                        key: "rate_limit".to_string(),
                        reason: "replenish_every_secs and burst_size must be positive".to_string(),
                    })?,
            );
            get(api::simulate_handler).layer(GovernorLayer::new(governor_conf))
        }
        None => get(api::simulate_handler),
    };

    let app = Router::new()
        .route("/", get(api::index_handler))
        .route("/health", get(api::health_handler))
        .route("/api/figure", get(api::empty_figure_handler))
        .route("/api/simulate", simulate_route)
        .route("/api/leverage", post(api::leverage_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    Ok(app)
}

/// Builds the app from `config` and serves it until the listener fails.
pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    config.validate()?;

    let fetcher = build_fetcher(&config)?;
    tracing::info!(provider = ?config.data_provider, multiplier = config.multiplier, "Data provider ready");

    let addr = config.bind_address();
    let app = build_router(AppState::new(config, fetcher))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(ServerError::Serve)
}
