//! Market ticker snapshot passed into every sizing and risk operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time market descriptor for one instrument.
///
/// Fetched by the caller and passed by value; the engine never refreshes it.
/// `raw_info` carries the exchange-native market payload and is only read by
/// the spot/derivative classification on composite accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// Canonical instrument symbol (e.g. "BTC/USDT", "BTC-USDT-SWAP")
    pub symbol: String,

    /// Last trade or mark price in quote currency
    pub reference_price: Decimal,

    /// Decimal places of the instrument's lot size
    #[serde(default = "default_lot_precision")]
    pub lot_precision: u32,

    /// Exchange-native market payload, used to tell spot from derivative
    /// instruments on composite accounts
    #[serde(default)]
    pub raw_info: serde_json::Value,

    /// When this snapshot was taken
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

fn default_lot_precision() -> u32 {
    8
}

impl Ticker {
    /// Create a snapshot with default lot precision and no raw payload.
    pub fn new(symbol: impl Into<String>, reference_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            reference_price,
            lot_precision: default_lot_precision(),
            raw_info: serde_json::Value::Null,
            fetched_at: Utc::now(),
        }
    }

    /// Attach the exchange-native market payload.
    pub fn with_raw_info(mut self, raw_info: serde_json::Value) -> Self {
        self.raw_info = raw_info;
        self
    }
}
