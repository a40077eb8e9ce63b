use async_trait::async_trait;
use chrono::Utc;
use limitbot_core::*;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{BinanceConfig, Credentials};
use crate::error::{classify_response, transport_error};
use crate::signing::{encode_query, sign};

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";
const ACCOUNT_PATH: &str = "/api/v3/account";
const ORDER_PATH: &str = "/api/v3/order";

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

/// Binance spot gateway.
///
/// Public endpoints are plain GETs; account and order endpoints carry a
/// `timestamp`, `recvWindow` and an HMAC-SHA256 `signature` over the query.
pub struct BinanceGateway {
    http: Client,
    config: BinanceConfig,
    credentials: Option<Credentials>,
}

impl BinanceGateway {
    pub fn new(config: BinanceConfig, credentials: Credentials) -> Result<Self, GatewayError> {
        Self::build(config, Some(credentials))
    }

    /// Gateway for market data only. Account and order calls fail without
    /// touching the network.
    pub fn public(config: BinanceConfig) -> Result<Self, GatewayError> {
        Self::build(config, None)
    }

    fn build(config: BinanceConfig, credentials: Option<Credentials>) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unexpected(format!("HTTP client setup failed: {}", e)))?;

        info!(
            base_url = %config.base_url,
            signed = credentials.is_some(),
            "Binance gateway ready"
        );

        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    fn url(&self, path: &str, query: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if query.is_empty() {
            format!("{}{}", base, path)
        } else {
            format!("{}{}?{}", base, path, query)
        }
    }

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = self.url(path, &encode_query(params));
        debug!(%url, "GET");

        let response = self.http.get(url).send().await.map_err(transport_error)?;
        read_response(response).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, GatewayError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            GatewayError::Unexpected(format!("{} requires API credentials", path))
        })?;

        params.push(("recvWindow", self.config.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query = encode_query(&params);
        let signature = sign(credentials.api_secret(), &query)?;
        debug!(%method, path, %query, "Signed request");

        let url = self.url(path, &format!("{}&signature={}", query, signature));
        let response = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, credentials.api_key())
            .send()
            .await
            .map_err(transport_error)?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    decode_body(status, &body)
}

/// Turns a status and body into the expected payload or a classified error.
pub fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, GatewayError> {
    if !(200..300).contains(&status) {
        return Err(classify_response(status, body));
    }

    serde_json::from_str(body)
        .map_err(|e| GatewayError::Unexpected(format!("Malformed response: {}", e)))
}

/// Query parameters for a new order, with price and quantity as exact decimal strings.
pub fn order_params(request: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
        ("type", request.order_type.as_str().to_string()),
    ];
    if matches!(
        request.order_type,
        OrderType::Limit | OrderType::StopLossLimit | OrderType::TakeProfitLimit
    ) {
        params.push(("timeInForce", request.time_in_force.as_str().to_string()));
    }
    params.push(("quantity", request.quantity_str()));
    params.push(("price", request.price_str()));
    params.push(("newOrderRespType", "FULL".to_string()));
    params
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    fn name(&self) -> &str {
        "binance"
    }

    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, GatewayError> {
        self.public_get(TICKER_PRICE_PATH, &[("symbol", symbol.to_string())])
            .await
    }

    async fn account_balances(&self) -> Result<Vec<AssetBalance>, GatewayError> {
        let account: AccountInfo = self
            .signed(Method::GET, ACCOUNT_PATH, vec![("omitZeroBalances", "true".to_string())])
            .await?;
        Ok(account.balances)
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, GatewayError> {
        self.signed(Method::POST, ORDER_PATH, order_params(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gateway(base_url: &str) -> BinanceGateway {
        let config = BinanceConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        BinanceGateway::new(config, Credentials::new("key", "secret").unwrap()).unwrap()
    }

    #[test]
    fn test_limit_sell_params() {
        let order = OrderRequest::limit("BNBUSDT", Side::Sell, dec!(1), dec!(0.25));
        let query = encode_query(&order_params(&order));
        assert_eq!(
            query,
            "symbol=BNBUSDT&side=SELL&type=LIMIT&timeInForce=GTC&quantity=1&price=0.25&newOrderRespType=FULL"
        );
    }

    #[test]
    fn test_price_is_never_float_formatted() {
        let order = OrderRequest::limit("BTCUSDT", Side::Buy, dec!(0.001), dec!(0.1));
        let params = order_params(&order);
        let price = params.iter().find(|(k, _)| *k == "price").map(|(_, v)| v.as_str());
        let qty = params.iter().find(|(k, _)| *k == "quantity").map(|(_, v)| v.as_str());
        assert_eq!(price, Some("0.1"));
        assert_eq!(qty, Some("0.001"));
        assert!(params.contains(&("side", "BUY".to_string())));
    }

    #[test]
    fn test_url_tolerates_trailing_slash() {
        let gw = gateway("https://testnet.binance.vision/");
        assert_eq!(
            gw.url(TICKER_PRICE_PATH, "symbol=BNBUSDT"),
            "https://testnet.binance.vision/api/v3/ticker/price?symbol=BNBUSDT"
        );
        assert_eq!(gw.url(ACCOUNT_PATH, ""), "https://testnet.binance.vision/api/v3/account");
    }

    #[test]
    fn test_account_body_parses_balances() {
        let body = r#"{
            "makerCommission": 15,
            "canTrade": true,
            "balances": [
                {"asset": "BTC", "free": "4723846.89208129", "locked": "0.00000000"},
                {"asset": "LTC", "free": "4763368.68006011", "locked": "0.00000000"}
            ]
        }"#;
        let account: AccountInfo = serde_json::from_str(body).unwrap();
        assert_eq!(account.balances.len(), 2);
        assert_eq!(account.balances[1].asset, "LTC");
        assert_eq!(account.balances[0].free, "4723846.89208129");
    }

    #[test]
    fn test_success_status_with_html_body_is_unexpected() {
        let result: Result<TickerPrice, _> =
            decode_body(200, "<html><body>maintenance</body></html>");
        match result {
            Err(err @ GatewayError::Unexpected(_)) => {
                assert_eq!(err.kind(), FailureKind::Unexpected)
            }
            other => panic!("Expected unexpected-response error, got {:?}", other),
        }
    }

    #[test]
    fn test_order_ack_without_order_id_is_unexpected() {
        let body = r#"{
            "symbol": "BNBUSDT",
            "price": "0.25",
            "origQty": "1",
            "executedQty": "0",
            "status": "NEW",
            "timeInForce": "GTC",
            "type": "LIMIT",
            "side": "SELL"
        }"#;
        let result: Result<OrderAck, _> = decode_body(200, body);
        match result {
            Err(GatewayError::Unexpected(message)) => assert!(message.contains("orderId")),
            other => panic!("Expected unexpected-response error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_status_is_classified() {
        let body = r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#;
        let result: Result<OrderAck, _> = decode_body(400, body);
        match result {
            Err(err @ GatewayError::Order { .. }) => {
                assert_eq!(err.kind(), FailureKind::OrderRejected);
                assert_eq!(err.status(), Some(400));
            }
            other => panic!("Expected order rejection, got {:?}", other),
        }

        let ticker: TickerPrice =
            decode_body(200, r#"{"symbol":"BNBUSDT","price":"612.40000000"}"#).unwrap();
        assert_eq!(ticker.price, "612.40000000");
    }

    #[tokio::test]
    async fn test_public_gateway_refuses_signed_calls() {
        let config = BinanceConfig {
            // Unroutable; a request that reached the network would fail as transport.
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let gw = BinanceGateway::public(config).unwrap();
        let order = OrderRequest::limit("BNBUSDT", Side::Sell, dec!(1), dec!(0.25));

        match gw.create_order(&order).await {
            Err(GatewayError::Unexpected(message)) => {
                assert!(message.contains("requires API credentials"))
            }
            other => panic!("Expected missing-credentials error, got {:?}", other),
        }
        assert!(matches!(
            gw.account_balances().await,
            Err(GatewayError::Unexpected(_))
        ));
    }
}
