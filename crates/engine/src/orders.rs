use limitbot_core::{ExchangeGateway, GatewayError, OrderAck, OrderRequest, Side};
use rust_decimal::Decimal;
use tracing::info;

use crate::log_gateway_error;

/// Submit `request` once. No retry, no deduplication.
pub async fn submit_order<G>(gateway: &G, request: &OrderRequest) -> Result<OrderAck, GatewayError>
where
    G: ExchangeGateway + ?Sized,
{
    match gateway.create_order(request).await {
        Ok(ack) => {
            info!(
                gateway = gateway.name(),
                symbol = %ack.symbol,
                order_id = ack.order_id,
                side = %ack.side,
                price = %ack.price,
                quantity = %ack.orig_qty,
                status = ?ack.status,
                "Limit order placed"
            );
            Ok(ack)
        }
        Err(err) => {
            log_gateway_error("create_order", &err);
            Err(err)
        }
    }
}

/// Place a good-till-canceled limit sell.
pub async fn sell_limit<G>(
    gateway: &G,
    symbol: &str,
    quantity: Decimal,
    price: Decimal,
) -> Result<OrderAck, GatewayError>
where
    G: ExchangeGateway + ?Sized,
{
    submit_order(gateway, &OrderRequest::limit(symbol, Side::Sell, quantity, price)).await
}

/// Place a good-till-canceled limit buy.
pub async fn buy_limit<G>(
    gateway: &G,
    symbol: &str,
    quantity: Decimal,
    price: Decimal,
) -> Result<OrderAck, GatewayError>
where
    G: ExchangeGateway + ?Sized,
{
    submit_order(gateway, &OrderRequest::limit(symbol, Side::Buy, quantity, price)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use limitbot_brokers_common::SimulatedExchange;
    use limitbot_core::{FailureKind, OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_sell_limit_builds_gtc_limit_sell() {
        let exchange = SimulatedExchange::new().with_price("BNBUSDT", "600");
        let ack = sell_limit(&exchange, "BNBUSDT", dec!(1), dec!(0.25)).await.unwrap();
        assert_eq!(ack.side, Side::Sell);

        let submitted = exchange.submitted_orders().await;
        assert_eq!(submitted.len(), 1);
        let order = &submitted[0];
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.time_in_force, TimeInForce::Gtc);
        assert_eq!(order.price_str(), "0.25");
        assert_eq!(order.quantity_str(), "1");
    }

    #[tokio::test]
    async fn test_buy_limit_builds_limit_buy() {
        let exchange = SimulatedExchange::new().with_price("BTCUSDT", "65000");
        buy_limit(&exchange, "BTCUSDT", dec!(0.001), dec!(60000)).await.unwrap();

        let submitted = exchange.submitted_orders().await;
        assert_eq!(submitted[0].side, Side::Buy);
        assert_eq!(submitted[0].price_str(), "60000");
    }

    #[tokio::test]
    async fn test_each_call_is_an_independent_submission() {
        let exchange = SimulatedExchange::new().with_price("BNBUSDT", "600");
        let first = sell_limit(&exchange, "BNBUSDT", dec!(1), dec!(700)).await.unwrap();
        let second = sell_limit(&exchange, "BNBUSDT", dec!(1), dec!(700)).await.unwrap();
        assert_ne!(first.order_id, second.order_id);
        assert_eq!(exchange.accepted_orders().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_returned_with_kind() {
        let exchange = SimulatedExchange::new()
            .with_price("BNBUSDT", "600")
            .rejecting_all_orders(GatewayError::Order {
                status: 400,
                code: -2010,
                message: "Account has insufficient balance for requested action.".to_string(),
            });
        let err = sell_limit(&exchange, "BNBUSDT", dec!(1), dec!(0.25)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::OrderRejected);
    }
}
