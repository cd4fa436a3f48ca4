//! Trade intents and the concrete orders they resolve to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    /// Opposite direction.
    pub fn inverse(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested order size, before resolution against live exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeSpec {
    /// Fraction of current exposure, in percent
    Percent(Decimal),
    /// Absolute amount in quote currency
    Quote(Decimal),
}

impl FromStr for SizeSpec {
    type Err = Error;

    /// Parse the wire form of a size: `"50%"` is relative, `"10000"` is a
    /// quote-currency amount.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let pct: Decimal = pct
                .trim()
                .parse()
                .map_err(|_| Error::InvalidIntent(format!("unparsable percent size: {s:?}")))?;
            if pct <= Decimal::ZERO {
                return Err(Error::InvalidIntent(format!("percent size must be positive: {s:?}")));
            }
            return Ok(SizeSpec::Percent(pct));
        }
        let amount: Decimal = s
            .parse()
            .map_err(|_| Error::InvalidIntent(format!("unparsable size: {s:?}")))?;
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidIntent(format!("size must be positive: {s:?}")));
        }
        Ok(SizeSpec::Quote(amount))
    }
}

/// A trade request as received from the signal source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    /// Instrument symbol the intent targets
    pub symbol: String,

    /// Requested direction
    pub direction: OrderSide,

    /// Requested size; `None` means full available exposure
    #[serde(default)]
    pub size: Option<SizeSpec>,

    /// Ceiling on aggregate notional exposure for the symbol, quote currency
    #[serde(default)]
    pub max_budget: Option<Decimal>,
}

impl TradeIntent {
    /// Create a full-size intent with no budget cap.
    pub fn new(symbol: impl Into<String>, direction: OrderSide) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            size: None,
            max_budget: None,
        }
    }

    /// Quote-currency size when the intent carries an absolute amount.
    ///
    /// Percent and unset sizes have no quote value until resolved against
    /// exposure, so overflow and budget comparisons skip them.
    pub fn quote_size(&self) -> Option<Decimal> {
        match self.size {
            Some(SizeSpec::Quote(amount)) => Some(amount),
            _ => None,
        }
    }
}

/// Resolved, ready-to-submit order instruction.
///
/// `size` is a non-negative quantity in the instrument's native unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOptions {
    pub side: OrderSide,
    pub size: Decimal,
}
