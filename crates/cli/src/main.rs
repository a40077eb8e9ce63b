mod config;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use limitbot_brokers_crypto::{BinanceGateway, Credentials};
use limitbot_core::{ExchangeGateway, OrderAck};
use limitbot_engine::{account, market, orders, SubmissionLoop};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "limitbot")]
#[command(about = "Place a limit order on Binance and keep retrying until the exchange accepts it")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a limitbot.toml config file
    #[arg(short, long, env = "LIMITBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Exchange API key
    #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Exchange API secret
    #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Trade against an in-memory simulated exchange
    #[arg(long)]
    paper: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Place the configured order, retrying until accepted (the default)
    Run {
        /// Give up after this many attempts
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Show the current price of a trading pair (no API key needed)
    Price {
        /// Trading pair (e.g. "BNBUSDT")
        symbol: String,
    },

    /// Show the free balance of an asset
    Balance {
        /// Asset (e.g. "BNB")
        asset: String,
    },

    /// Place a single GTC limit sell
    Sell(OrderArgs),

    /// Place a single GTC limit buy
    Buy(OrderArgs),
}

impl Commands {
    /// Whether the command hits an endpoint that needs API credentials.
    fn is_signed(&self) -> bool {
        !matches!(self, Commands::Price { .. })
    }
}

#[derive(Args)]
struct OrderArgs {
    /// Trading pair (e.g. "BNBUSDT")
    #[arg(short, long)]
    symbol: String,

    /// Quantity of the base asset
    #[arg(short, long)]
    quantity: Decimal,

    /// Limit price
    #[arg(short, long)]
    price: Decimal,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = FileConfig::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Run { max_attempts: None });

    let gateway: Box<dyn ExchangeGateway> = if cli.paper {
        tracing::info!("Paper mode: using the simulated exchange");
        Box::new(config.paper_exchange())
    } else if !command.is_signed() {
        Box::new(BinanceGateway::public(config.exchange.clone())?)
    } else {
        let credentials = Credentials::new(
            cli.api_key.unwrap_or_default(),
            cli.api_secret.unwrap_or_default(),
        )?;
        Box::new(BinanceGateway::new(config.exchange.clone(), credentials)?)
    };
    let gateway = gateway.as_ref();

    match command {
        Commands::Run { max_attempts } => {
            run_order(gateway, &config, max_attempts).await?;
        }
        Commands::Price { symbol } => {
            let price = market::symbol_price(gateway, &symbol).await?;
            println!("{} {}", symbol, price);
        }
        Commands::Balance { asset } => {
            let free = account::free_balance(gateway, &asset).await?;
            println!("{} {}", asset, free);
        }
        Commands::Sell(args) => {
            let ack = orders::sell_limit(gateway, &args.symbol, args.quantity, args.price).await?;
            print_ack(&ack)?;
        }
        Commands::Buy(args) => {
            let ack = orders::buy_limit(gateway, &args.symbol, args.quantity, args.price).await?;
            print_ack(&ack)?;
        }
    }

    Ok(())
}

async fn run_order(
    gateway: &dyn ExchangeGateway,
    config: &FileConfig,
    max_attempts: Option<u32>,
) -> Result<()> {
    let mut policy = config.retry.to_policy();
    if let Some(max) = max_attempts {
        policy = policy.with_max_attempts(max);
    }
    let request = config.order.to_request();

    tracing::info!(
        gateway = gateway.name(),
        symbol = %request.symbol,
        side = %request.side,
        quantity = %request.quantity_str(),
        price = %request.price_str(),
        max_attempts = ?policy.max_attempts,
        delay_ms = policy.delay.as_millis() as u64,
        "Submitting limit order"
    );

    let mut submission = SubmissionLoop::new(request, policy);
    let ack = submission.run(gateway).await?;
    print_ack(&ack)?;
    Ok(())
}

fn print_ack(ack: &OrderAck) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(ack)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_needs_no_credentials() {
        let cli = Cli::try_parse_from(["limitbot", "price", "BNBUSDT"]).unwrap();
        let command = cli.command.unwrap();
        assert!(!command.is_signed());
    }

    #[test]
    fn test_trading_commands_are_signed() {
        for args in [
            vec!["limitbot", "run"],
            vec!["limitbot", "balance", "BNB"],
            vec!["limitbot", "sell", "-s", "BNBUSDT", "-q", "1", "-p", "0.25"],
            vec!["limitbot", "buy", "-s", "BNBUSDT", "-q", "1", "-p", "0.25"],
        ] {
            let cli = Cli::try_parse_from(args.clone()).unwrap();
            assert!(cli.command.unwrap().is_signed(), "{:?}", args);
        }
    }
}
