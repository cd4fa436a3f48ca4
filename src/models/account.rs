//! Account identity and the exchange venues it can live on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported exchange venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeId {
    /// Binance spot account
    BinanceSpot,
    /// Binance USDⓈ-M futures account
    BinanceFutures,
    /// Kraken spot account
    Kraken,
    /// OKX unified account: spot balances and derivative positions under one session
    Okx,
}

impl ExchangeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::BinanceSpot => "binance_spot",
            ExchangeId::BinanceFutures => "binance_futures",
            ExchangeId::Kraken => "kraken",
            ExchangeId::Okx => "okx",
        }
    }

    /// Which exposure sources accounts on this venue hold.
    pub fn account_model(&self) -> AccountModel {
        match self {
            ExchangeId::BinanceSpot | ExchangeId::Kraken => AccountModel::Spot,
            ExchangeId::BinanceFutures => AccountModel::Futures,
            ExchangeId::Okx => AccountModel::Composite,
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account capability: which kinds of exposure a venue's accounts can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountModel {
    /// Coin balances only
    Spot,
    /// Derivative positions only
    Futures,
    /// Both, with per-ticker classification between them
    Composite,
}

impl AccountModel {
    /// Whether a failed budget check aborts the trade evaluation.
    ///
    /// Budget errors abort on single-capability accounts; composite accounts
    /// default to allowing the trade when the check itself fails. See
    /// `RiskConfig::composite_budget_check_fatal` for the override.
    pub fn budget_check_is_fatal(&self) -> bool {
        !matches!(self, AccountModel::Composite)
    }
}

/// Exchange account identity and credentials.
///
/// Owned by the caller and never mutated here; credentials are only read by
/// session implementations when signing private requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier used in logs and error context
    pub id: String,

    /// Venue this account lives on
    pub exchange: ExchangeId,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// API secret used to sign private requests
    #[serde(default)]
    pub api_secret: String,

    /// API passphrase, for venues that require one
    #[serde(default)]
    pub api_passphrase: String,
}

impl Account {
    /// Create an account with empty credentials.
    pub fn new(id: impl Into<String>, exchange: ExchangeId) -> Self {
        Self {
            id: id.into(),
            exchange,
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
        }
    }

    /// Identifier for logs and error messages.
    pub fn account_id(&self) -> &str {
        &self.id
    }
}
