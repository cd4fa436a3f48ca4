//! Trading logic: size arithmetic, exposure resolution, risk checks.

mod config;
mod exposure;
mod risk;
mod sizing;

pub use config::RiskConfig;
pub use exposure::{instrument_kind, is_spot_market, spot_coin, ExposureResolver, InstrumentKind};
pub use risk::{RiskCheck, RiskController};
pub use sizing::{close_order_size, notional_cost, order_size, tokens_for_quote};
