//! # pricesim
//!
//! A stock price dashboard that overlays an amplified "simulated" close series
//! on the actual one. Each day's change in close is multiplied (3x by default)
//! and compounded onto the previous simulated value, starting from the first
//! actual close.
//!
//! - [`simulation`] holds the amplifier and the CSV leverage sweep
//! - [`market_data`] defines the price series and the [`market_data::PriceFetcher`] seam,
//!   implemented by [`yahoo`] and [`csv_source`]
//! - [`dashboard`] turns a request into a [`chart::ChartPayload`]
//! - [`server`] wires it all into an axum app built from [`config::AppConfig`]

pub mod api;
pub mod chart;
pub mod config;
pub mod csv_source;
pub mod dashboard;
pub mod error;
pub mod market_data;
pub mod page;
pub mod server;
pub mod simulation;
pub mod yahoo;

