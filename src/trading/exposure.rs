//! Exposure lookup for a symbol on a given account.
//!
//! Absence of exposure is a first-class condition here: callers that expect
//! a balance or a position get an error they can match on, never a silent
//! zero.

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, error};

use crate::api::AccountReader;
use crate::error::{Error, Result};
use crate::models::{Account, AccountModel, Position, Ticker};

/// Exposure source backing a ticker on a given account model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Spot,
    Derivative,
}

/// Decide which exposure source backs a ticker under an account model.
///
/// Single-capability accounts have only one answer; composite accounts are
/// classified per ticker from the raw market payload.
pub fn instrument_kind(model: AccountModel, ticker: &Ticker) -> InstrumentKind {
    match model {
        AccountModel::Spot => InstrumentKind::Spot,
        AccountModel::Futures => InstrumentKind::Derivative,
        AccountModel::Composite => {
            if is_spot_market(ticker) {
                InstrumentKind::Spot
            } else {
                InstrumentKind::Derivative
            }
        }
    }
}

/// True when the ticker describes a spot instrument.
///
/// Pure predicate over the snapshot's raw market payload: an explicit market
/// type field wins; without one, the presence of a derivative marker decides.
pub fn is_spot_market(ticker: &Ticker) -> bool {
    let info = &ticker.raw_info;
    if let Some(kind) = info
        .get("instType")
        .or_else(|| info.get("type"))
        .and_then(Value::as_str)
    {
        return kind.eq_ignore_ascii_case("spot");
    }
    const DERIVATIVE_MARKERS: [&str; 3] = ["contractType", "settleCcy", "expiry"];
    !DERIVATIVE_MARKERS.iter().any(|marker| info.get(marker).is_some())
}

/// Base coin of a spot symbol (`"BTC/USDT"` → `"BTC"`).
pub fn spot_coin(symbol: &str) -> &str {
    if let Some((base, _)) = symbol.split_once(['/', '-']) {
        return base;
    }
    for quote in ["USDT", "USDC", "BUSD", "USD", "EUR"] {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return base;
            }
        }
    }
    symbol
}

/// Resolves current exposure for a ticker through fresh account reads.
#[derive(Clone)]
pub struct ExposureResolver {
    reader: AccountReader,
}

impl ExposureResolver {
    pub fn new(reader: AccountReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &AccountReader {
        &self.reader
    }

    /// Free spot balance backing the ticker's base coin.
    ///
    /// Errors when the balance cannot be read *or* when no non-zero balance
    /// exists; "no exposure" must be distinguishable from zero.
    pub async fn ticker_balance(&self, account: &Account, ticker: &Ticker) -> Result<Decimal> {
        let coin = spot_coin(&ticker.symbol);
        let lookup = self.reader.fetch_balances(account).await;
        let balance = match lookup {
            Ok(balances) => balances.into_iter().find(|b| b.coin == coin),
            Err(err) => {
                error!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %coin,
                    error = %err,
                    "ticker balance read failed"
                );
                return Err(Error::TickerFetch {
                    exchange: account.exchange,
                    account: account.account_id().to_string(),
                    symbol: coin.to_string(),
                    cause: anyhow::Error::new(err),
                });
            }
        };
        match balance {
            Some(balance) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %coin,
                    free = %balance.free,
                    "ticker balance read"
                );
                Ok(balance.free)
            }
            None => {
                error!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %coin,
                    "no non-zero balance for ticker"
                );
                Err(Error::TickerFetch {
                    exchange: account.exchange,
                    account: account.account_id().to_string(),
                    symbol: coin.to_string(),
                    cause: anyhow!("no non-zero {coin} balance"),
                })
            }
        }
    }

    /// Open position on the ticker's instrument.
    pub async fn ticker_position(&self, account: &Account, ticker: &Ticker) -> Result<Position> {
        let positions = self.reader.fetch_positions(account).await?;
        match positions.into_iter().find(|p| p.symbol == ticker.symbol) {
            Some(position) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    side = %position.side,
                    size = %position.size,
                    "position read"
                );
                Ok(position)
            }
            None => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    "no open position"
                );
                Err(Error::NoOpenPosition {
                    exchange: account.exchange,
                    account: account.account_id().to_string(),
                    symbol: ticker.symbol.clone(),
                })
            }
        }
    }

    /// Notional cost of the open position on the ticker's instrument.
    pub async fn ticker_position_size(&self, account: &Account, ticker: &Ticker) -> Result<Decimal> {
        let position = self.ticker_position(account, ticker).await?;
        Ok(position.cost)
    }
}
