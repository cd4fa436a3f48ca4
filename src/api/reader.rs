//! Normalized balance and position reads over raw exchange sessions.
//!
//! This is the only place that knows each venue's wire field names; every
//! payload is mapped onto the canonical `Balance`/`Position` shapes and
//! zero-quantity entries are dropped before anyone else sees them.

use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::api::session::SessionProvider;
use crate::api::types::{
    BinanceFuturesAccount, BinanceSpotAccount, KrakenBalances, OkxBalanceData, OkxEnvelope,
    OkxPosition,
};
use crate::error::{Error, Result};
use crate::models::{Account, Balance, ExchangeId, Position, PositionSide};

/// Fetches canonical balance and position snapshots for an account.
///
/// Snapshots are fetched fresh on every call; nothing is cached because risk
/// checks may change exposure between calls.
#[derive(Clone)]
pub struct AccountReader {
    sessions: Arc<dyn SessionProvider>,
}

impl AccountReader {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }

    /// Fetch the account's non-zero spot balances in canonical form.
    pub async fn fetch_balances(&self, account: &Account) -> Result<Vec<Balance>> {
        let raw = self
            .raw_balance(account)
            .await
            .map_err(|cause| Error::BalancesFetch {
                exchange: account.exchange,
                account: account.account_id().to_string(),
                cause,
            })?;
        let balances =
            map_balances(account.exchange, raw).map_err(|cause| Error::BalancesFetch {
                exchange: account.exchange,
                account: account.account_id().to_string(),
                cause,
            })?;
        debug!(
            exchange = %account.exchange,
            account = %account.account_id(),
            count = balances.len(),
            "balances read"
        );
        Ok(balances)
    }

    /// Fetch the account's open positions in canonical form.
    pub async fn fetch_positions(&self, account: &Account) -> Result<Vec<Position>> {
        let raw = self
            .raw_account_info(account)
            .await
            .map_err(|cause| Error::PositionsFetch {
                exchange: account.exchange,
                account: account.account_id().to_string(),
                cause,
            })?;
        let positions =
            map_positions(account.exchange, raw).map_err(|cause| Error::PositionsFetch {
                exchange: account.exchange,
                account: account.account_id().to_string(),
                cause,
            })?;
        debug!(
            exchange = %account.exchange,
            account = %account.account_id(),
            count = positions.len(),
            "positions read"
        );
        Ok(positions)
    }

    /// Validate the account's credentials with an authenticated read.
    pub async fn check_credentials(&self, account: &Account) -> Result<()> {
        match self.fetch_balances(account).await {
            Ok(_) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    "authentication succeeded"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    error = %err,
                    "authentication failed"
                );
                Err(Error::Authentication {
                    exchange: account.exchange,
                    account: account.account_id().to_string(),
                    cause: anyhow::Error::new(err),
                })
            }
        }
    }

    async fn raw_balance(&self, account: &Account) -> anyhow::Result<Value> {
        let session = self
            .sessions
            .refresh_session(account)
            .await
            .context("session refresh failed")?;
        session.fetch_balance().await
    }

    async fn raw_account_info(&self, account: &Account) -> anyhow::Result<Value> {
        let session = self
            .sessions
            .refresh_session(account)
            .await
            .context("session refresh failed")?;
        session.fetch_private_account_info().await
    }
}

/// Map a raw balance payload onto canonical balances, dropping zero entries.
fn map_balances(exchange: ExchangeId, raw: Value) -> anyhow::Result<Vec<Balance>> {
    let balances: Vec<Balance> = match exchange {
        ExchangeId::BinanceSpot => {
            let account: BinanceSpotAccount = serde_json::from_value(raw)?;
            account
                .balances
                .into_iter()
                .map(|b| Balance {
                    coin: b.asset,
                    free: b.free,
                    total: b.free + b.locked,
                })
                .collect()
        }
        ExchangeId::BinanceFutures => {
            let account: BinanceFuturesAccount = serde_json::from_value(raw)?;
            account
                .assets
                .into_iter()
                .map(|a| Balance {
                    coin: a.asset,
                    free: a.available_balance,
                    total: a.wallet_balance,
                })
                .collect()
        }
        ExchangeId::Kraken => {
            let payload: KrakenBalances = serde_json::from_value(raw)?;
            payload
                .result
                .into_iter()
                .map(|(coin, amount)| Balance {
                    coin,
                    free: amount,
                    total: amount,
                })
                .collect()
        }
        ExchangeId::Okx => {
            let envelope: OkxEnvelope<OkxBalanceData> = serde_json::from_value(raw)?;
            envelope
                .data
                .into_iter()
                .flat_map(|record| record.details)
                .map(|d| Balance {
                    coin: d.ccy,
                    free: d.avail_bal,
                    total: d.cash_bal,
                })
                .collect()
        }
    };
    Ok(balances.into_iter().filter(|b| !b.free.is_zero()).collect())
}

/// Map a raw account payload onto canonical positions, dropping zero sizes.
fn map_positions(exchange: ExchangeId, raw: Value) -> anyhow::Result<Vec<Position>> {
    let positions: Vec<Position> = match exchange {
        ExchangeId::BinanceFutures => {
            let account: BinanceFuturesAccount = serde_json::from_value(raw)?;
            account
                .positions
                .into_iter()
                .map(|p| {
                    let side = if p.position_amt.is_sign_negative() {
                        PositionSide::Short
                    } else {
                        PositionSide::Long
                    };
                    Position {
                        symbol: p.symbol,
                        side,
                        size: p.position_amt.abs(),
                        cost: p.notional.abs(),
                    }
                })
                .collect()
        }
        ExchangeId::Okx => {
            let envelope: OkxEnvelope<OkxPosition> = serde_json::from_value(raw)?;
            envelope
                .data
                .into_iter()
                .map(|p| {
                    let side = match p.pos_side.as_str() {
                        "short" => PositionSide::Short,
                        "long" => PositionSide::Long,
                        // net mode: the sign of `pos` carries the direction
                        _ if p.pos.is_sign_negative() => PositionSide::Short,
                        _ => PositionSide::Long,
                    };
                    Position {
                        symbol: p.inst_id,
                        side,
                        size: p.pos.abs(),
                        cost: p.notional_usd.abs(),
                    }
                })
                .collect()
        }
        ExchangeId::BinanceSpot | ExchangeId::Kraken => {
            anyhow::bail!("{exchange} does not expose derivative positions")
        }
    };
    Ok(positions.into_iter().filter(|p| !p.size.is_zero()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_binance_spot_mapping_filters_zero_balances() {
        let raw = json!({
            "balances": [
                {"asset": "BTC", "free": "0.5", "locked": "0.1"},
                {"asset": "ETH", "free": "0", "locked": "2"},
            ]
        });

        let balances = map_balances(ExchangeId::BinanceSpot, raw).unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0], Balance::new("BTC", dec!(0.5), dec!(0.6)));
    }

    #[test]
    fn test_kraken_mapping_has_no_locked_distinction() {
        let raw = json!({"result": {"XBT": "1.25"}});

        let balances = map_balances(ExchangeId::Kraken, raw).unwrap();
        assert_eq!(balances, vec![Balance::new("XBT", dec!(1.25), dec!(1.25))]);
    }

    #[test]
    fn test_okx_balance_mapping() {
        let raw = json!({
            "data": [{"details": [
                {"ccy": "BTC", "availBal": "0.5", "cashBal": "0.5"},
                {"ccy": "USDT", "availBal": "0", "cashBal": "100"},
            ]}]
        });

        let balances = map_balances(ExchangeId::Okx, raw).unwrap();
        assert_eq!(balances, vec![Balance::new("BTC", dec!(0.5), dec!(0.5))]);
    }

    #[test]
    fn test_binance_futures_position_mapping_derives_side_from_sign() {
        let raw = json!({
            "assets": [],
            "positions": [
                {"symbol": "BTCUSDT", "positionAmt": "-2", "notional": "-6000"},
                {"symbol": "ETHUSDT", "positionAmt": "0", "notional": "0"},
            ]
        });

        let positions = map_positions(ExchangeId::BinanceFutures, raw).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, PositionSide::Short);
        assert_eq!(positions[0].size, dec!(2));
        assert_eq!(positions[0].cost, dec!(6000));
    }

    #[test]
    fn test_okx_position_mapping_net_mode() {
        let raw = json!({
            "data": [
                {"instId": "BTC-USDT-SWAP", "posSide": "net", "pos": "-3", "notionalUsd": "9000"},
            ]
        });

        let positions = map_positions(ExchangeId::Okx, raw).unwrap();
        assert_eq!(positions[0].side, PositionSide::Short);
        assert_eq!(positions[0].size, dec!(3));
    }

    #[test]
    fn test_spot_venues_have_no_positions() {
        assert!(map_positions(ExchangeId::Kraken, json!({})).is_err());
        assert!(map_positions(ExchangeId::BinanceSpot, json!({})).is_err());
    }
}
