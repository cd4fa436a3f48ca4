//! Data models for accounts, tickers, balances, positions, and trade intents.

mod account;
mod balance;
mod position;
mod ticker;
mod trade;

pub use account::{Account, AccountModel, ExchangeId};
pub use balance::Balance;
pub use position::{Position, PositionSide};
pub use ticker::Ticker;
pub use trade::{OrderOptions, OrderSide, SizeSpec, TradeIntent};
