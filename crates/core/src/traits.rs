use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Gateway Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to an exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The exchange refused the request itself (auth, rate limit, bad parameters).
    #[error("API error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },
    /// The exchange refused this particular order (balance, price filters).
    #[error("Order rejected {status} (code {code}): {message}")]
    Order {
        status: u16,
        code: i64,
        message: String,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Api,
    OrderRejected,
    Unexpected,
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Api { .. } => FailureKind::Api,
            GatewayError::Order { .. } => FailureKind::OrderRejected,
            GatewayError::Transport(_) | GatewayError::Unexpected(_) => FailureKind::Unexpected,
        }
    }

    /// HTTP status reported by the exchange, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } | GatewayError::Order { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange Gateway Trait
// ---------------------------------------------------------------------------

/// An authenticated connection to a spot exchange.
///
/// Implementations are constructed explicitly and handed to every caller;
/// there is no process-wide client.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Latest price for a trading pair.
    async fn symbol_price(&self, symbol: &str) -> Result<TickerPrice, GatewayError>;

    /// Every balance held by the account.
    async fn account_balances(&self) -> Result<Vec<AssetBalance>, GatewayError>;

    /// Submit a new order.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderAck, GatewayError>;
}
