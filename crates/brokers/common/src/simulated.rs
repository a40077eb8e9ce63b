use async_trait::async_trait;
use chrono::Utc;
use limitbot_core::*;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

/// A simulated exchange for tests and paper trading.
///
/// Quotes prices and balances from memory, accepts well-formed limit orders
/// on known symbols, and can be scripted to fail reads or order submissions.
pub struct SimulatedExchange {
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    prices: HashMap<String, String>,
    balances: Vec<AssetBalance>,
    /// Returned by price and balance queries when set.
    read_failure: Option<GatewayError>,
    /// Consumed one per order submission before any order is accepted.
    scripted_order_failures: VecDeque<GatewayError>,
    /// Returned by every order submission once the script is exhausted.
    permanent_order_failure: Option<GatewayError>,
    submitted: Vec<OrderRequest>,
    accepted: Vec<OrderAck>,
    next_order_id: u64,
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedExchange {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                next_order_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: &str) -> Self {
        self.state
            .get_mut()
            .prices
            .insert(symbol.to_string(), price.to_string());
        self
    }

    pub fn with_balance(mut self, asset: &str, free: &str, locked: &str) -> Self {
        self.state
            .get_mut()
            .balances
            .push(AssetBalance::new(asset, free, locked));
        self
    }

    /// Make every price and balance query fail with `error`.
    pub fn failing_reads(mut self, error: GatewayError) -> Self {
        self.state.get_mut().read_failure = Some(error);
        self
    }

    /// Reject the next `count` order submissions with `error`.
    pub fn failing_orders(mut self, count: usize, error: GatewayError) -> Self {
        let script = &mut self.state.get_mut().scripted_order_failures;
        script.extend(std::iter::repeat(error).take(count));
        self
    }

    /// Reject every order submission with `error`.
    pub fn rejecting_all_orders(mut self, error: GatewayError) -> Self {
        self.state.get_mut().permanent_order_failure = Some(error);
        self
    }

    /// Every order request received, accepted or not.
    pub async fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn accepted_orders(&self) -> Vec<OrderAck> {
        self.state.lock().await.accepted.clone()
    }

    pub async fn order_attempts(&self) -> usize {
        self.state.lock().await.submitted.len()
    }
}

fn invalid_symbol() -> GatewayError {
    GatewayError::Api {
        status: 400,
        code: -1121,
        message: "Invalid symbol.".to_string(),
    }
}

fn filter_failure(message: &str) -> GatewayError {
    GatewayError::Order {
        status: 400,
        code: -1013,
        message: format!("Filter failure: {}", message),
    }
}

#[async_trait]
impl ExchangeGateway for SimulatedExchange {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, GatewayError> {
        let state = self.state.lock().await;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        state
            .prices
            .get(symbol)
            .map(|price| TickerPrice {
                symbol: symbol.to_string(),
                price: price.clone(),
            })
            .ok_or_else(invalid_symbol)
    }

    async fn account_balances(&self) -> Result<Vec<AssetBalance>, GatewayError> {
        let state = self.state.lock().await;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        Ok(state.balances.clone())
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, GatewayError> {
        let mut state = self.state.lock().await;
        state.submitted.push(request.clone());

        if let Some(err) = state.scripted_order_failures.pop_front() {
            debug!(symbol = %request.symbol, error = %err, "Scripted order failure");
            return Err(err);
        }
        if let Some(err) = &state.permanent_order_failure {
            return Err(err.clone());
        }
        if !state.prices.contains_key(&request.symbol) {
            return Err(invalid_symbol());
        }
        if request.quantity <= Decimal::ZERO {
            return Err(filter_failure("LOT_SIZE"));
        }
        if request.price <= Decimal::ZERO {
            return Err(filter_failure("PRICE_FILTER"));
        }

        let order_id = state.next_order_id;
        state.next_order_id += 1;

        let ack = OrderAck {
            symbol: request.symbol.clone(),
            order_id,
            client_order_id: format!("sim-{}", order_id),
            transact_time: Utc::now().timestamp_millis(),
            price: request.price,
            orig_qty: request.quantity,
            executed_qty: Decimal::ZERO,
            status: OrderStatus::New,
            time_in_force: request.time_in_force,
            order_type: request.order_type,
            side: request.side,
            fills: Vec::new(),
        };
        state.accepted.push(ack.clone());
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate_limited() -> GatewayError {
        GatewayError::Api {
            status: 429,
            code: -1003,
            message: "Too many requests.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_accepts_limit_order_on_known_symbol() {
        let exchange = SimulatedExchange::new().with_price("BNBUSDT", "0.25");
        let order = OrderRequest::limit("BNBUSDT", Side::Sell, dec!(1), dec!(0.25));

        let ack = exchange.create_order(&order).await.unwrap();
        assert_eq!(ack.order_id, 1);
        assert_eq!(ack.status, OrderStatus::New);
        assert_eq!(ack.price, dec!(0.25));
        assert_eq!(exchange.accepted_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let exchange = SimulatedExchange::new()
            .with_price("BNBUSDT", "0.25")
            .failing_orders(2, rate_limited());
        let order = OrderRequest::limit("BNBUSDT", Side::Buy, dec!(1), dec!(0.25));

        assert!(exchange.create_order(&order).await.is_err());
        assert!(exchange.create_order(&order).await.is_err());
        assert!(exchange.create_order(&order).await.is_ok());
        assert_eq!(exchange.order_attempts().await, 3);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_an_api_error() {
        let exchange = SimulatedExchange::new();
        let err = exchange.symbol_price("NOPE").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Api);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected_as_order_error() {
        let exchange = SimulatedExchange::new().with_price("BNBUSDT", "0.25");
        let order = OrderRequest::limit("BNBUSDT", Side::Sell, dec!(0), dec!(0.25));
        let err = exchange.create_order(&order).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::OrderRejected);
    }

    #[tokio::test]
    async fn test_read_failures_apply_to_balances() {
        let exchange = SimulatedExchange::new()
            .with_balance("BNB", "3.5", "0")
            .failing_reads(rate_limited());
        assert!(exchange.account_balances().await.is_err());
    }
}
