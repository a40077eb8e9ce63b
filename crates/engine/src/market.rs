use limitbot_core::{ExchangeGateway, GatewayError};
use tracing::debug;

use crate::log_gateway_error;

/// Current price of `symbol`, exactly as the exchange reported it.
///
/// No local validation of the symbol and no retry; failures are logged and returned.
pub async fn symbol_price<G>(gateway: &G, symbol: &str) -> Result<String, GatewayError>
where
    G: ExchangeGateway + ?Sized,
{
    match gateway.symbol_price(symbol).await {
        Ok(ticker) => {
            debug!(symbol, price = %ticker.price, "Fetched price");
            Ok(ticker.price)
        }
        Err(err) => {
            log_gateway_error("symbol_price", &err);
            Err(err)
        }
    }
}
