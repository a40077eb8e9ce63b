//! Crypto exchange gateway.
//!
//! Direct REST integration with the Binance spot API: ticker prices,
//! account balances and signed order placement.

pub mod client;
pub mod config;
pub mod error;
pub mod signing;

pub use client::BinanceGateway;
pub use config::{BinanceConfig, ConfigError, Credentials};
