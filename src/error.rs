//! Error types for exposure resolution and risk control.
//!
//! Every propagated error carries the exchange, account, and symbol context
//! needed to act on it without re-querying exchange state. Collaborator
//! failures arrive as `anyhow::Error` and are kept as the cause.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ExchangeId, OrderSide};

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sizing and risk-control operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Balance list could not be read from the exchange
    #[error("failed to read balances for account {account} on {exchange}: {cause}")]
    BalancesFetch {
        exchange: ExchangeId,
        account: String,
        cause: anyhow::Error,
    },

    /// Position list could not be read from the exchange
    #[error("failed to read positions for account {account} on {exchange}: {cause}")]
    PositionsFetch {
        exchange: ExchangeId,
        account: String,
        cause: anyhow::Error,
    },

    /// Spot exposure lookup failed, either in transport or because no
    /// non-zero balance backs the symbol
    #[error("failed to read {symbol} balance for account {account} on {exchange}: {cause}")]
    TickerFetch {
        exchange: ExchangeId,
        account: String,
        symbol: String,
        cause: anyhow::Error,
    },

    /// Derivative exposure was expected but no position is open
    #[error("no open {symbol} position for account {account} on {exchange}")]
    NoOpenPosition {
        exchange: ExchangeId,
        account: String,
        symbol: String,
    },

    /// Opening the position would push symbol exposure past the budget cap
    #[error(
        "refusing to {side} {symbol} for account {account} on {exchange}: \
         exposure would exceed max budget {max_budget}"
    )]
    OpenPosition {
        exchange: ExchangeId,
        account: String,
        symbol: String,
        side: OrderSide,
        max_budget: Decimal,
    },

    /// Exchange rejected the account credentials
    #[error("authentication failed for account {account} on {exchange}: {cause}")]
    Authentication {
        exchange: ExchangeId,
        account: String,
        cause: anyhow::Error,
    },

    /// Trade intent could not be interpreted
    #[error("invalid trade intent: {0}")]
    InvalidIntent(String),
}
