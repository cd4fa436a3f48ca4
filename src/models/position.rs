//! Derivative position model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::trade::OrderSide;

/// Direction of an open derivative position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }

    /// Order side that reduces or closes this position.
    pub fn closing_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }

    /// True when a new trade in `direction` opposes this position.
    pub fn conflicts_with(&self, direction: OrderSide) -> bool {
        self.closing_side() == direction
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open derivative position.
///
/// At most one open position per instrument is assumed; venues running in
/// hedge mode (simultaneous long and short on one instrument) are not
/// supported and behave as implementation-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol the position is held in
    pub symbol: String,

    /// Position direction
    pub side: PositionSide,

    /// Unsigned size in native instrument units
    pub size: Decimal,

    /// Notional cost of the position in quote currency
    pub cost: Decimal,
}

impl Position {
    /// Size with the side folded in; short positions are negative.
    pub fn signed_size(&self) -> Decimal {
        match self.side {
            PositionSide::Long => self.size,
            PositionSide::Short => -self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_closing_side() {
        assert_eq!(PositionSide::Long.closing_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.closing_side(), OrderSide::Buy);
    }

    #[test]
    fn test_conflicts_with_opposing_direction_only() {
        assert!(PositionSide::Long.conflicts_with(OrderSide::Sell));
        assert!(!PositionSide::Long.conflicts_with(OrderSide::Buy));
        assert!(PositionSide::Short.conflicts_with(OrderSide::Buy));
        assert!(!PositionSide::Short.conflicts_with(OrderSide::Sell));
    }

    #[test]
    fn test_signed_size() {
        let mut position = Position {
            symbol: "BTCUSDT".to_string(),
            side: PositionSide::Long,
            size: dec!(2),
            cost: dec!(6000),
        };
        assert_eq!(position.signed_size(), dec!(2));

        position.side = PositionSide::Short;
        assert_eq!(position.signed_size(), dec!(-2));
    }
}
