pub mod account;
pub mod market;
pub mod orders;
pub mod retry;

pub use account::free_balance;
pub use market::symbol_price;
pub use orders::{buy_limit, sell_limit, submit_order};
pub use retry::{RetryError, RetryPolicy, SubmissionLoop, SubmissionState};

use limitbot_core::GatewayError;
use tracing::error;

/// Log a gateway failure with whatever detail the exchange gave us.
pub(crate) fn log_gateway_error(operation: &str, err: &GatewayError) {
    match err {
        GatewayError::Api {
            status,
            code,
            message,
        } => error!(operation, status, code, msg = %message, "Exchange API error"),
        GatewayError::Order {
            status,
            code,
            message,
        } => error!(operation, status, code, msg = %message, "Order rejected by exchange"),
        GatewayError::Transport(_) | GatewayError::Unexpected(_) => {
            error!(operation, error = %err, "Unexpected gateway error")
        }
    }
}
