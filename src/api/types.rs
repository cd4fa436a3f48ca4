//! Raw exchange payload shapes consumed by the balance/position reader.
//!
//! Field names mirror each venue's wire format. Nothing outside the reader's
//! mapping code should depend on these; the rest of the crate only sees the
//! canonical `Balance` and `Position` models.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Binance spot balance entry (`GET /api/v3/account`, `balances[]`).
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceSpotBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Binance spot account envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceSpotAccount {
    #[serde(default)]
    pub balances: Vec<BinanceSpotBalance>,
}

/// Binance futures asset entry (`GET /fapi/v2/account`, `assets[]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceFuturesAsset {
    pub asset: String,
    pub available_balance: Decimal,
    pub wallet_balance: Decimal,
}

/// Binance futures position entry (`GET /fapi/v2/account`, `positions[]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceFuturesPosition {
    pub symbol: String,
    /// Signed position size; negative means short
    pub position_amt: Decimal,
    /// Signed notional value at mark price
    #[serde(default)]
    pub notional: Decimal,
}

/// Binance futures account envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceFuturesAccount {
    #[serde(default)]
    pub assets: Vec<BinanceFuturesAsset>,
    #[serde(default)]
    pub positions: Vec<BinanceFuturesPosition>,
}

/// Kraken balance response (`POST /0/private/Balance`): currency → amount.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenBalances {
    #[serde(default)]
    pub result: HashMap<String, Decimal>,
}

/// OKX response envelope: payloads arrive under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct OkxEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// OKX unified-account balance record (`GET /api/v5/account/balance`).
#[derive(Debug, Clone, Deserialize)]
pub struct OkxBalanceData {
    #[serde(default)]
    pub details: Vec<OkxBalanceDetail>,
}

/// Per-currency detail inside an OKX balance record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxBalanceDetail {
    pub ccy: String,
    pub avail_bal: Decimal,
    pub cash_bal: Decimal,
}

/// OKX position entry (`GET /api/v5/account/positions`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxPosition {
    pub inst_id: String,
    /// "long", "short", or "net" (sign of `pos` decides in net mode)
    pub pos_side: String,
    pub pos: Decimal,
    #[serde(default)]
    pub notional_usd: Decimal,
}
