//! Collaborator capabilities the engine consumes.
//!
//! Session management, transport, rate limiting, and order submission live
//! outside this crate; the engine only depends on these seams. All
//! implementations are caller-owned, so the boundary error type is
//! `anyhow::Error` rather than our taxonomy.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::{Account, OrderSide, SizeSpec, Ticker, TradeIntent};

/// Lazily acquires or refreshes an authenticated exchange session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Return a live session for the account, creating or refreshing one as
    /// needed.
    async fn refresh_session(&self, account: &Account) -> anyhow::Result<Arc<dyn ExchangeSession>>;
}

/// An authenticated session returning raw, exchange-native payloads.
///
/// Payload shapes are decoded only by the reader; see [`crate::api::types`].
#[async_trait]
pub trait ExchangeSession: Send + Sync {
    /// Fetch the raw balance payload for the session's account.
    async fn fetch_balance(&self) -> anyhow::Result<serde_json::Value>;

    /// Fetch the raw private account payload carrying open positions.
    async fn fetch_private_account_info(&self) -> anyhow::Result<serde_json::Value>;
}

/// Submits closing orders on behalf of the risk controller.
///
/// The reverse and overflow steps may each submit one close within a single
/// trade evaluation; implementations must tolerate that and must not assume
/// idempotence.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Submit an order closing existing exposure described by `trade`.
    async fn close_order(
        &self,
        account: &Account,
        trade: &TradeIntent,
        ticker: &Ticker,
    ) -> anyhow::Result<()>;
}

/// A close order captured by [`RecordingExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedClose {
    pub account_id: String,
    pub symbol: String,
    pub direction: OrderSide,
    pub size: Option<SizeSpec>,
}

/// Executor that logs close orders instead of submitting them.
///
/// Useful for dry runs and as a test double: every close is recorded in
/// submission order and can be inspected afterwards.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    closes: Mutex<Vec<RecordedClose>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close orders recorded so far, in submission order.
    pub async fn closes(&self) -> Vec<RecordedClose> {
        self.closes.lock().await.clone()
    }
}

#[async_trait]
impl OrderExecutor for RecordingExecutor {
    async fn close_order(
        &self,
        account: &Account,
        trade: &TradeIntent,
        ticker: &Ticker,
    ) -> anyhow::Result<()> {
        info!(
            account = %account.account_id(),
            symbol = %ticker.symbol,
            direction = %trade.direction,
            size = ?trade.size,
            "[DRY RUN] close order"
        );
        self.closes.lock().await.push(RecordedClose {
            account_id: account.account_id().to_string(),
            symbol: ticker.symbol.clone(),
            direction: trade.direction,
            size: trade.size,
        });
        Ok(())
    }
}
