//! Canonical balance shape shared by every exchange dialect.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spot balance for a single coin.
///
/// `free` is the unlocked quantity available for trading; `total` also counts
/// amounts locked in open orders. Invariant: `total >= free >= 0`. Balances
/// are fetched fresh for every operation and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Coin code (e.g. "BTC")
    pub coin: String,

    /// Available (unlocked) quantity
    pub free: Decimal,

    /// Total quantity including locked/reserved amounts
    pub total: Decimal,
}

impl Balance {
    pub fn new(coin: impl Into<String>, free: Decimal, total: Decimal) -> Self {
        Self {
            coin: coin.into(),
            free,
            total,
        }
    }

    /// Quote-currency value of the free quantity at the given price.
    pub fn notional_value(&self, price: Decimal) -> Decimal {
        self.free * price
    }
}
