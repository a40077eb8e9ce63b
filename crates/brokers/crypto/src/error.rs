use limitbot_core::GatewayError;
use serde::Deserialize;

/// Error codes for orders the exchange understood but refused to accept.
const ORDER_REJECTION_CODES: &[i64] = &[
    -1013, // filter failure (price, lot size, notional)
    -1111, // precision over the maximum defined for the asset
    -2010, // new order rejected (e.g. insufficient balance)
];

/// Body returned by the exchange alongside a non-2xx status.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Map a failed HTTP response onto the gateway error taxonomy.
pub fn classify_response(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody { code, msg }) if ORDER_REJECTION_CODES.contains(&code) => {
            GatewayError::Order {
                status,
                code,
                message: msg,
            }
        }
        Ok(ApiErrorBody { code, msg }) => GatewayError::Api {
            status,
            code,
            message: msg,
        },
        // WAF blocks and 5xx pages come back without the JSON envelope.
        Err(_) => GatewayError::Api {
            status,
            code: 0,
            message: body.chars().take(200).collect(),
        },
    }
}

pub fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_decode() {
        GatewayError::Unexpected(format!("Malformed response: {}", err))
    } else {
        GatewayError::Transport(err.to_string())
    }
}
