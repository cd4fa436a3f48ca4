//! Reverse, overflow, and budget checks around a new trade request.
//!
//! Each check re-reads exposure when it runs because an earlier check may
//! have changed it. The reverse and overflow steps treat a failed exposure
//! lookup as "nothing to act on" — absence of exposure is the common case —
//! while the budget check surfaces its errors and lets the caller decide
//! what is fatal for the account model at hand.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::OrderExecutor;
use crate::error::{Error, Result};
use crate::models::{Account, OrderOptions, OrderSide, SizeSpec, Ticker, TradeIntent};
use crate::trading::config::RiskConfig;
use crate::trading::exposure::{instrument_kind, ExposureResolver, InstrumentKind};
use crate::trading::sizing::{close_order_size, notional_cost};

/// Outcome of a single risk-control step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCheck {
    /// No conflicting exposure; nothing was done
    NotApplicable,
    /// Conflicting exposure was closed out
    Handled,
}

/// Runs the risk-control steps for new trade requests.
pub struct RiskController {
    resolver: ExposureResolver,
    executor: Arc<dyn OrderExecutor>,
    config: RiskConfig,
}

impl RiskController {
    pub fn new(
        resolver: ExposureResolver,
        executor: Arc<dyn OrderExecutor>,
        config: RiskConfig,
    ) -> Self {
        Self {
            resolver,
            executor,
            config,
        }
    }

    /// Close an opposing position before the new trade proceeds.
    ///
    /// Nothing to reverse (no position, same side, spot instrument) is a
    /// no-op; lookup and submission failures likewise leave the evaluation
    /// running.
    pub async fn handle_reverse_order(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> RiskCheck {
        let kind = instrument_kind(account.exchange.account_model(), ticker);
        if kind == InstrumentKind::Spot {
            // spot balances have no opposing side
            return RiskCheck::NotApplicable;
        }

        let position = match self.resolver.ticker_position(account, ticker).await {
            Ok(position) => position,
            Err(err) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "no position to reverse"
                );
                return RiskCheck::NotApplicable;
            }
        };
        if !position.side.conflicts_with(trade.direction) {
            return RiskCheck::NotApplicable;
        }

        info!(
            exchange = %account.exchange,
            account = %account.account_id(),
            symbol = %ticker.symbol,
            "reversing existing position"
        );
        match self.executor.close_order(account, trade, ticker).await {
            Ok(()) => RiskCheck::Handled,
            Err(err) => {
                warn!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "reverse close failed"
                );
                RiskCheck::NotApplicable
            }
        }
    }

    /// Substitute a full close when the requested size exceeds exposure.
    ///
    /// Returns `true` when a close was submitted in place of the request;
    /// the caller must then skip opening a fresh order. Only quote-sized
    /// intents can overflow.
    pub async fn handle_overflow(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> bool {
        let Some(requested) = trade.quote_size() else {
            return false;
        };
        match instrument_kind(account.exchange.account_model(), ticker) {
            InstrumentKind::Spot => self.spot_overflow(account, ticker, trade, requested).await,
            InstrumentKind::Derivative => {
                self.futures_overflow(account, ticker, trade, requested).await
            }
        }
    }

    async fn spot_overflow(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
        requested: Decimal,
    ) -> bool {
        if trade.direction != OrderSide::Sell {
            return false;
        }
        let balance = match self.resolver.ticker_balance(account, ticker).await {
            Ok(balance) => balance,
            Err(err) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "no balance to overflow against"
                );
                return false;
            }
        };
        let balance_notional = notional_cost(balance, ticker.reference_price);
        if balance_notional.is_zero() || requested <= balance_notional {
            return false;
        }

        info!(
            exchange = %account.exchange,
            account = %account.account_id(),
            symbol = %ticker.symbol,
            requested = %requested,
            available = %balance_notional,
            "trade overflows available balance, closing in full"
        );
        let substitute = TradeIntent {
            size: Some(SizeSpec::Quote(balance_notional)),
            ..trade.clone()
        };
        match self.executor.close_order(account, &substitute, ticker).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "overflow close failed"
                );
                false
            }
        }
    }

    async fn futures_overflow(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
        requested: Decimal,
    ) -> bool {
        let position = match self.resolver.ticker_position(account, ticker).await {
            Ok(position) => position,
            Err(err) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "no position to overflow against"
                );
                return false;
            }
        };
        if !position.side.conflicts_with(trade.direction) || requested <= position.cost.abs() {
            return false;
        }

        info!(
            exchange = %account.exchange,
            account = %account.account_id(),
            symbol = %ticker.symbol,
            requested = %requested,
            position_cost = %position.cost,
            "trade overflows opposing position, closing in full"
        );
        match self.executor.close_order(account, trade, ticker).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "overflow close failed"
                );
                false
            }
        }
    }

    /// Reject the trade when projected exposure exceeds the budget cap.
    ///
    /// Accepts at exact equality. Only quote-sized intents participate:
    /// percent and unset sizes have no quote value to project.
    pub async fn handle_max_budget(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> Result<()> {
        let max_budget = trade.max_budget.or(self.config.default_max_budget);
        let (Some(max), Some(requested)) = (max_budget, trade.quote_size()) else {
            return Ok(());
        };

        let current = match instrument_kind(account.exchange.account_model(), ticker) {
            InstrumentKind::Spot => {
                let balance = self.resolver.ticker_balance(account, ticker).await?;
                notional_cost(balance, ticker.reference_price)
            }
            InstrumentKind::Derivative => {
                self.resolver.ticker_position_size(account, ticker).await?
            }
        };

        if current.abs() + requested > max {
            error!(
                exchange = %account.exchange,
                account = %account.account_id(),
                symbol = %ticker.symbol,
                side = %trade.direction,
                current = %current,
                requested = %requested,
                max_budget = %max,
                "max budget exceeded"
            );
            return Err(Error::OpenPosition {
                exchange: account.exchange,
                account: account.account_id().to_string(),
                symbol: ticker.symbol.clone(),
                side: trade.direction,
                max_budget: max,
            });
        }
        Ok(())
    }

    /// Build the concrete order that closes current exposure for the ticker.
    pub async fn close_order_options(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> Result<OrderOptions> {
        match instrument_kind(account.exchange.account_model(), ticker) {
            InstrumentKind::Spot => {
                let balance = self.resolver.ticker_balance(account, ticker).await?;
                Ok(OrderOptions {
                    side: OrderSide::Sell,
                    size: close_order_size(
                        trade.size.as_ref(),
                        ticker.reference_price,
                        balance,
                        ticker.lot_precision,
                    ),
                })
            }
            InstrumentKind::Derivative => {
                let position = self.resolver.ticker_position(account, ticker).await?;
                Ok(OrderOptions {
                    side: position.side.closing_side(),
                    size: close_order_size(
                        trade.size.as_ref(),
                        ticker.reference_price,
                        position.size,
                        ticker.lot_precision,
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AccountReader, ExchangeSession, RecordingExecutor, SessionProvider};
    use crate::models::ExchangeId;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    struct StubSession {
        balance: Value,
        account_info: Value,
    }

    #[async_trait]
    impl ExchangeSession for StubSession {
        async fn fetch_balance(&self) -> anyhow::Result<Value> {
            Ok(self.balance.clone())
        }

        async fn fetch_private_account_info(&self) -> anyhow::Result<Value> {
            Ok(self.account_info.clone())
        }
    }

    struct StubProvider {
        session: Arc<StubSession>,
    }

    #[async_trait]
    impl SessionProvider for StubProvider {
        async fn refresh_session(
            &self,
            _account: &Account,
        ) -> anyhow::Result<Arc<dyn ExchangeSession>> {
            Ok(self.session.clone())
        }
    }

    fn controller(balance: Value, account_info: Value) -> (RiskController, Arc<RecordingExecutor>) {
        let provider = Arc::new(StubProvider {
            session: Arc::new(StubSession {
                balance,
                account_info,
            }),
        });
        let executor = Arc::new(RecordingExecutor::new());
        let resolver = ExposureResolver::new(AccountReader::new(provider));
        (
            RiskController::new(resolver, executor.clone(), RiskConfig::default()),
            executor,
        )
    }

    fn spot_account() -> Account {
        Account::new("main", ExchangeId::BinanceSpot)
    }

    fn futures_account() -> Account {
        Account::new("main", ExchangeId::BinanceFutures)
    }

    fn btc_balances() -> Value {
        json!({"balances": [{"asset": "BTC", "free": "0.5", "locked": "0"}]})
    }

    fn long_btc_position() -> Value {
        json!({
            "assets": [],
            "positions": [{"symbol": "BTCUSDT", "positionAmt": "2", "notional": "6000"}]
        })
    }

    fn no_positions() -> Value {
        json!({"assets": [], "positions": []})
    }

    #[tokio::test]
    async fn test_reverse_is_noop_without_position() {
        let (controller, executor) = controller(json!({}), no_positions());
        let trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);

        let outcome = controller
            .handle_reverse_order(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;

        assert_eq!(outcome, RiskCheck::NotApplicable);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_is_noop_when_sides_match() {
        let (controller, executor) = controller(json!({}), long_btc_position());
        let trade = TradeIntent::new("BTCUSDT", OrderSide::Buy);

        let outcome = controller
            .handle_reverse_order(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;

        assert_eq!(outcome, RiskCheck::NotApplicable);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_closes_opposing_position_once() {
        let (controller, executor) = controller(json!({}), long_btc_position());
        let trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);

        let outcome = controller
            .handle_reverse_order(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;

        assert_eq!(outcome, RiskCheck::Handled);
        let closes = executor.closes().await;
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_reverse_not_applicable_on_spot() {
        let (controller, executor) = controller(btc_balances(), json!({}));
        let trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);

        let outcome = controller
            .handle_reverse_order(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;

        assert_eq!(outcome, RiskCheck::NotApplicable);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_overflow_false_within_position_cost() {
        let (controller, executor) = controller(json!({}), long_btc_position());
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Quote(dec!(5000)));

        let handled = controller
            .handle_overflow(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;

        assert!(!handled);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_overflow_closes_full_position_when_exceeding_cost() {
        // long 2 BTC with cost 6000; a 10000 quote sell overflows it
        let (controller, executor) = controller(json!({}), long_btc_position());
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));

        let ticker = Ticker::new("BTCUSDT", dec!(3000));
        let handled = controller
            .handle_overflow(&futures_account(), &ticker, &trade)
            .await;

        assert!(handled);
        let closes = executor.closes().await;
        assert_eq!(closes.len(), 1);

        // the close resolves to the full position size, never more
        let options = controller
            .close_order_options(&futures_account(), &ticker, &trade)
            .await
            .unwrap();
        assert_eq!(options, OrderOptions { side: OrderSide::Sell, size: dec!(2) });
    }

    #[tokio::test]
    async fn test_overflow_ignores_same_side_position() {
        let (controller, executor) = controller(json!({}), long_btc_position());
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));

        let handled = controller
            .handle_overflow(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;

        assert!(!handled);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_spot_overflow_substitutes_full_balance_close() {
        // 0.5 BTC at 30000 = 15000 available; a 20000 sell overflows
        let (controller, executor) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Quote(dec!(20000)));

        let handled = controller
            .handle_overflow(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;

        assert!(handled);
        let closes = executor.closes().await;
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].size, Some(SizeSpec::Quote(dec!(15000))));
    }

    #[tokio::test]
    async fn test_spot_overflow_false_within_balance() {
        let (controller, executor) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));

        let handled = controller
            .handle_overflow(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;

        assert!(!handled);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_overflow_skips_percent_and_unset_sizes() {
        let (controller, executor) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Percent(dec!(500)));

        let ticker = Ticker::new("BTC/USDT", dec!(30000));
        assert!(!controller.handle_overflow(&spot_account(), &ticker, &trade).await);

        trade.size = None;
        assert!(!controller.handle_overflow(&spot_account(), &ticker, &trade).await);
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_budget_accepts_at_exact_equality() {
        // current exposure 15000 + requested 5000 == max 20000
        let (controller, _) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(5000)));
        trade.max_budget = Some(dec!(20000));

        let result = controller
            .handle_max_budget(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_budget_rejects_when_exceeded() {
        let (controller, _) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(5000)));
        trade.max_budget = Some(dec!(19999));

        let result = controller
            .handle_max_budget(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::OpenPosition { .. })));
    }

    #[tokio::test]
    async fn test_budget_uses_position_cost_on_futures() {
        // cost 6000 + requested 5000 > max 10000
        let (controller, _) = controller(json!({}), long_btc_position());
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(5000)));
        trade.max_budget = Some(dec!(10000));

        let result = controller
            .handle_max_budget(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::OpenPosition { .. })));
    }

    #[tokio::test]
    async fn test_budget_lookup_failure_propagates() {
        let (controller, _) = controller(json!({}), no_positions());
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(5000)));
        trade.max_budget = Some(dec!(10000));

        let result = controller
            .handle_max_budget(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::NoOpenPosition { .. })));
    }

    #[tokio::test]
    async fn test_budget_skips_percent_and_uncapped_intents() {
        let (controller, _) = controller(json!({}), no_positions());

        // percent size never projects a quote value, even with a cap set
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Percent(dec!(50)));
        trade.max_budget = Some(dec!(10));
        let ticker = Ticker::new("BTCUSDT", dec!(3000));
        assert!(controller.handle_max_budget(&futures_account(), &ticker, &trade).await.is_ok());

        // no cap configured anywhere
        trade.size = Some(SizeSpec::Quote(dec!(1000000)));
        trade.max_budget = None;
        assert!(controller.handle_max_budget(&futures_account(), &ticker, &trade).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_options_spot_percent() {
        let (controller, _) = controller(btc_balances(), json!({}));
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Percent(dec!(50)));

        let options = controller
            .close_order_options(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await
            .unwrap();

        assert_eq!(options, OrderOptions { side: OrderSide::Sell, size: dec!(0.25) });
    }

    #[tokio::test]
    async fn test_close_options_futures_inverts_position_side() {
        let (controller, _) = controller(json!({}), long_btc_position());
        let trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);

        let options = controller
            .close_order_options(&futures_account(), &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await
            .unwrap();

        // long position closes with a sell of the full size
        assert_eq!(options, OrderOptions { side: OrderSide::Sell, size: dec!(2) });
    }

    #[tokio::test]
    async fn test_close_options_composite_spot_full_balance() {
        let okx_balances = json!({
            "data": [{"details": [{"ccy": "BTC", "availBal": "0.5", "cashBal": "0.5"}]}]
        });
        let (controller, _) = controller(okx_balances, json!({"data": []}));
        let account = Account::new("main", ExchangeId::Okx);
        let ticker = Ticker::new("BTC-USDT", dec!(30000))
            .with_raw_info(json!({"instType": "SPOT"}));
        let trade = TradeIntent::new("BTC-USDT", OrderSide::Sell);

        let options = controller
            .close_order_options(&account, &ticker, &trade)
            .await
            .unwrap();

        assert_eq!(options, OrderOptions { side: OrderSide::Sell, size: dec!(0.5) });
    }

    #[tokio::test]
    async fn test_close_options_spot_missing_balance_errors() {
        let (controller, _) = controller(json!({"balances": []}), json!({}));
        let trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);

        let result = controller
            .close_order_options(&spot_account(), &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::TickerFetch { .. })));
    }
}
