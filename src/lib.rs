//! Exposure-aware order sizing and risk control for crypto exchange accounts.
//!
//! Converts a trade intent (percentage of exposure, quote-currency amount,
//! or implicit full close) into the concrete order to submit given an
//! account's live balance or position, and enforces reverse, overflow, and
//! budget checks around it. Accounts can be pure spot, pure futures, or
//! composite (both under one session, classified per ticker).
//!
//! Transport, authentication internals, and order submission stay behind
//! the capability traits in [`api`]; this crate decides *what* to submit,
//! never *how*.

pub mod api;
pub mod engine;
pub mod error;
pub mod models;
pub mod trading;

pub use engine::{TradeEvaluation, TradingEngine};
pub use error::{Error, Result};
pub use models::{
    Account, AccountModel, Balance, ExchangeId, OrderOptions, OrderSide, Position, PositionSide,
    SizeSpec, Ticker, TradeIntent,
};
pub use trading::{RiskCheck, RiskConfig};
