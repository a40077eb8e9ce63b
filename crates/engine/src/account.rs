use limitbot_core::{ExchangeGateway, GatewayError};
use tracing::debug;

use crate::log_gateway_error;

/// Balance reported when the account holds none of an asset.
pub const ZERO_BALANCE: &str = "0";

/// Free (available) balance of `asset`.
///
/// An asset missing from the account is `Ok("0")`; `Err` means the query itself failed.
pub async fn free_balance<G>(gateway: &G, asset: &str) -> Result<String, GatewayError>
where
    G: ExchangeGateway + ?Sized,
{
    let balances = match gateway.account_balances().await {
        Ok(balances) => balances,
        Err(err) => {
            log_gateway_error("free_balance", &err);
            return Err(err);
        }
    };

    let free = balances
        .into_iter()
        .find(|b| b.asset == asset)
        .map(|b| b.free)
        .unwrap_or_else(|| ZERO_BALANCE.to_string());

    debug!(asset, %free, "Fetched balance");
    Ok(free)
}
