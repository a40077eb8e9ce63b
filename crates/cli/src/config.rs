use anyhow::{Context, Result};
use limitbot_brokers_common::SimulatedExchange;
use limitbot_brokers_crypto::BinanceConfig;
use limitbot_core::{canonical_decimal, OrderRequest, Side};
use limitbot_engine::RetryPolicy;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Contents of the optional `limitbot.toml`.
///
/// Every table and field is optional. Credentials never live here; they come
/// from `BINANCE_API_KEY` / `BINANCE_API_SECRET`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub exchange: BinanceConfig,
    pub order: OrderSection,
    pub retry: RetrySection,
    pub paper: PaperSection,
}

/// The order placed when no subcommand is given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrderSection {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl Default for OrderSection {
    fn default() -> Self {
        Self {
            symbol: "BNBUSDT".to_string(),
            side: Side::Sell,
            quantity: Decimal::ONE,
            price: Decimal::new(25, 2),
        }
    }
}

impl OrderSection {
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest::limit(&self.symbol, self.side, self.quantity, self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
    pub give_up_on_rejection: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            delay_ms: policy.delay.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_attempts: policy.max_attempts,
            give_up_on_rejection: policy.give_up_on_rejection,
        }
    }
}

impl RetrySection {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
            give_up_on_rejection: self.give_up_on_rejection,
        }
    }
}

/// Market state for `--paper` runs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaperSection {
    /// Symbol -> price.
    pub prices: BTreeMap<String, String>,
    /// Asset -> free balance.
    pub balances: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Simulated exchange seeded from `[paper]`; the configured order's
    /// symbol is always tradable.
    pub fn paper_exchange(&self) -> SimulatedExchange {
        let mut exchange = SimulatedExchange::new();
        if !self.paper.prices.contains_key(&self.order.symbol) {
            exchange = exchange.with_price(&self.order.symbol, &canonical_decimal(self.order.price));
        }
        for (symbol, price) in &self.paper.prices {
            exchange = exchange.with_price(symbol, price);
        }
        for (asset, free) in &self.paper.balances {
            exchange = exchange.with_balance(asset, free, "0");
        }
        exchange
    }
}
