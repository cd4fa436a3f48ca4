//! Engine surface tying exposure reads, risk checks, and sizing together.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{AccountReader, OrderExecutor, SessionProvider};
use crate::error::Result;
use crate::models::{Account, OrderOptions, Position, Ticker, TradeIntent};
use crate::trading::{
    instrument_kind, order_size, ExposureResolver, InstrumentKind, RiskCheck, RiskConfig,
    RiskController,
};

/// Result of a full trade evaluation.
#[derive(Debug, Clone)]
pub struct TradeEvaluation {
    /// Whether an opposing position was closed first
    pub reversed: RiskCheck,

    /// Whether the overflow step substituted a close for the request
    pub overflow_handled: bool,

    /// Order to submit; `None` when overflow handling already acted
    pub order: Option<OrderOptions>,
}

/// Exposure-aware sizing and risk control over one pair of collaborators.
///
/// Holds no exchange state of its own: every operation reads exposure fresh
/// through the session provider, so evaluations for different accounts and
/// symbols can run concurrently.
pub struct TradingEngine {
    resolver: ExposureResolver,
    risk: RiskController,
    config: RiskConfig,
}

impl TradingEngine {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        executor: Arc<dyn OrderExecutor>,
        config: RiskConfig,
    ) -> Self {
        let resolver = ExposureResolver::new(AccountReader::new(sessions));
        let risk = RiskController::new(resolver.clone(), executor, config.clone());
        Self {
            resolver,
            risk,
            config,
        }
    }

    /// Validate the account's credentials with an authenticated read.
    pub async fn check_credentials(&self, account: &Account) -> Result<()> {
        self.resolver.reader().check_credentials(account).await
    }

    /// Free spot balance backing the ticker's base coin.
    pub async fn ticker_balance(&self, account: &Account, ticker: &Ticker) -> Result<Decimal> {
        self.resolver.ticker_balance(account, ticker).await
    }

    /// Open position on the ticker's instrument.
    pub async fn ticker_position(&self, account: &Account, ticker: &Ticker) -> Result<Position> {
        self.resolver.ticker_position(account, ticker).await
    }

    /// Notional cost of the open position on the ticker's instrument.
    pub async fn ticker_position_size(
        &self,
        account: &Account,
        ticker: &Ticker,
    ) -> Result<Decimal> {
        self.resolver.ticker_position_size(account, ticker).await
    }

    /// Build the concrete order that closes current exposure for the ticker.
    pub async fn close_order_options(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> Result<OrderOptions> {
        self.risk.close_order_options(account, ticker, trade).await
    }

    /// Close an opposing position before the new trade proceeds.
    pub async fn handle_reverse_order(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> RiskCheck {
        self.risk.handle_reverse_order(account, ticker, trade).await
    }

    /// Substitute a full close when the requested size exceeds exposure.
    pub async fn handle_overflow(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> bool {
        self.risk.handle_overflow(account, ticker, trade).await
    }

    /// Reject the trade when projected exposure exceeds the budget cap.
    ///
    /// Errors abort the evaluation on single-capability accounts. On
    /// composite accounts the whole check defaults to non-fatal: any failure
    /// (including the rejection itself) is logged and the trade allowed,
    /// unless `RiskConfig::composite_budget_check_fatal` says otherwise.
    pub async fn handle_max_budget(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> Result<()> {
        match self.risk.handle_max_budget(account, ticker, trade).await {
            Err(err) if !self.budget_check_is_fatal(account) => {
                warn!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "budget check skipped on composite account"
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Full risk pass for a new trade request.
    ///
    /// Runs the reverse, overflow, and budget steps strictly in order —
    /// each re-reads exposure, since the previous step may have changed it —
    /// then resolves the concrete order. When the overflow step already
    /// closed exposure in place of the request, no further order is
    /// returned and the caller must not open one.
    pub async fn evaluate(
        &self,
        account: &Account,
        ticker: &Ticker,
        trade: &TradeIntent,
    ) -> Result<TradeEvaluation> {
        let reversed = self.handle_reverse_order(account, ticker, trade).await;
        let overflow_handled = self.handle_overflow(account, ticker, trade).await;
        if overflow_handled {
            return Ok(TradeEvaluation {
                reversed,
                overflow_handled,
                order: None,
            });
        }

        self.handle_max_budget(account, ticker, trade).await?;

        let exposure = self.exposure_magnitude(account, ticker).await;
        if trade.size.is_none() && exposure.is_zero() {
            warn!(
                exchange = %account.exchange,
                account = %account.account_id(),
                symbol = %ticker.symbol,
                "no exposure to size a full-size intent against"
            );
        }
        let size = order_size(
            trade.size.as_ref(),
            ticker.reference_price,
            exposure,
            ticker.lot_precision,
        );

        Ok(TradeEvaluation {
            reversed,
            overflow_handled,
            order: Some(OrderOptions {
                side: trade.direction,
                size,
            }),
        })
    }

    fn budget_check_is_fatal(&self, account: &Account) -> bool {
        account.exchange.account_model().budget_check_is_fatal()
            || self.config.composite_budget_check_fatal
    }

    /// Unsigned exposure currently backing the ticker; zero when none can be
    /// read, which only relative-size resolution depends on.
    async fn exposure_magnitude(&self, account: &Account, ticker: &Ticker) -> Decimal {
        let lookup = match instrument_kind(account.exchange.account_model(), ticker) {
            InstrumentKind::Spot => self.resolver.ticker_balance(account, ticker).await,
            InstrumentKind::Derivative => self
                .resolver
                .ticker_position(account, ticker)
                .await
                .map(|p| p.size),
        };
        match lookup {
            Ok(exposure) => exposure,
            Err(err) => {
                debug!(
                    exchange = %account.exchange,
                    account = %account.account_id(),
                    symbol = %ticker.symbol,
                    error = %err,
                    "no exposure backing ticker"
                );
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ExchangeSession, RecordingExecutor};
    use crate::error::Error;
    use crate::models::{ExchangeId, OrderSide, SizeSpec};
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

    fn engine_with(
        balance: Value,
        account_info: Value,
        config: RiskConfig,
    ) -> (TradingEngine, Arc<RecordingExecutor>) {
        let provider = Arc::new(StubProvider {
            session: Arc::new(StubSession {
                balance,
                account_info,
            }),
        });
        let executor = Arc::new(RecordingExecutor::new());
        (
            TradingEngine::new(provider, executor.clone(), config),
            executor,
        )
    }

    fn okx_spot_ticker() -> Ticker {
        Ticker::new("BTC-USDT", dec!(30000)).with_raw_info(json!({"instType": "SPOT"}))
    }

    fn okx_balances() -> Value {
        json!({"data": [{"details": [{"ccy": "BTC", "availBal": "0.5", "cashBal": "0.5"}]}]})
    }

    #[tokio::test]
    async fn test_budget_rejection_swallowed_on_composite() {
        // 15000 current + 10000 requested > 20000 cap, but the account is
        // composite and the default policy lets the trade through
        let (engine, _) = engine_with(okx_balances(), json!({"data": []}), RiskConfig::default());
        let account = Account::new("main", ExchangeId::Okx);
        let mut trade = TradeIntent::new("BTC-USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));
        trade.max_budget = Some(dec!(20000));

        let result = engine
            .handle_max_budget(&account, &okx_spot_ticker(), &trade)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_budget_rejection_fatal_on_composite_when_configured() {
        let config = RiskConfig {
            composite_budget_check_fatal: true,
            ..RiskConfig::default()
        };
        let (engine, _) = engine_with(okx_balances(), json!({"data": []}), config);
        let account = Account::new("main", ExchangeId::Okx);
        let mut trade = TradeIntent::new("BTC-USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));
        trade.max_budget = Some(dec!(20000));

        let result = engine
            .handle_max_budget(&account, &okx_spot_ticker(), &trade)
            .await;
        assert!(matches!(result, Err(Error::OpenPosition { .. })));
    }

    #[tokio::test]
    async fn test_budget_rejection_propagates_on_spot() {
        let balances = json!({"balances": [{"asset": "BTC", "free": "0.5", "locked": "0"}]});
        let (engine, _) = engine_with(balances, json!({}), RiskConfig::default());
        let account = Account::new("main", ExchangeId::BinanceSpot);
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));
        trade.max_budget = Some(dec!(20000));

        let result = engine
            .handle_max_budget(&account, &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::OpenPosition { .. })));
    }

    #[tokio::test]
    async fn test_evaluate_resolves_relative_spot_order() {
        let balances = json!({"balances": [{"asset": "BTC", "free": "0.5", "locked": "0"}]});
        let (engine, executor) = engine_with(balances, json!({}), RiskConfig::default());
        let account = Account::new("main", ExchangeId::BinanceSpot);
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Percent(dec!(50)));

        let evaluation = engine
            .evaluate(&account, &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await
            .unwrap();

        assert_eq!(evaluation.reversed, RiskCheck::NotApplicable);
        assert!(!evaluation.overflow_handled);
        assert_eq!(
            evaluation.order,
            Some(OrderOptions { side: OrderSide::Sell, size: dec!(0.25) })
        );
        assert!(executor.closes().await.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_stops_after_overflow() {
        // opposing long position, quote request above its cost: the reverse
        // and overflow steps each submit one close and no new order remains
        let account_info = json!({
            "assets": [],
            "positions": [{"symbol": "BTCUSDT", "positionAmt": "2", "notional": "6000"}]
        });
        let (engine, executor) = engine_with(json!({}), account_info, RiskConfig::default());
        let account = Account::new("main", ExchangeId::BinanceFutures);
        let mut trade = TradeIntent::new("BTCUSDT", OrderSide::Sell);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));

        let evaluation = engine
            .evaluate(&account, &Ticker::new("BTCUSDT", dec!(3000)), &trade)
            .await
            .unwrap();

        assert_eq!(evaluation.reversed, RiskCheck::Handled);
        assert!(evaluation.overflow_handled);
        assert!(evaluation.order.is_none());
        assert_eq!(executor.closes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_over_budget_trade() {
        let balances = json!({"balances": [{"asset": "BTC", "free": "0.5", "locked": "0"}]});
        let (engine, _) = engine_with(balances, json!({}), RiskConfig::default());
        let account = Account::new("main", ExchangeId::BinanceSpot);
        let mut trade = TradeIntent::new("BTC/USDT", OrderSide::Buy);
        trade.size = Some(SizeSpec::Quote(dec!(10000)));
        trade.max_budget = Some(dec!(20000));

        let result = engine
            .evaluate(&account, &Ticker::new("BTC/USDT", dec!(30000)), &trade)
            .await;
        assert!(matches!(result, Err(Error::OpenPosition { .. })));
    }
}
