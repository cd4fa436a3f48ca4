//! Pure order-size arithmetic shared by every account model.
//!
//! No I/O here: callers resolve exposure first and pass it in, which keeps
//! the conversions testable without an exchange.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::SizeSpec;

/// Convert a quote-currency amount into instrument units at the reference
/// price, truncated to the instrument's lot precision.
///
/// Truncation (never rounding up) so a converted size cannot exceed what the
/// quote amount pays for. A non-positive price yields zero.
pub fn tokens_for_quote(amount: Decimal, reference_price: Decimal, lot_precision: u32) -> Decimal {
    if reference_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (amount / reference_price).round_dp_with_strategy(lot_precision, RoundingStrategy::ToZero)
}

/// Quote-currency value of a quantity at the reference price.
pub fn notional_cost(quantity: Decimal, reference_price: Decimal) -> Decimal {
    quantity * reference_price
}

/// Resolve a size specification into a concrete order quantity.
///
/// Percent sizes scale the current exposure (100% reproduces it exactly);
/// quote sizes convert at the reference price; an absent spec resolves to
/// the full exposure.
pub fn order_size(
    spec: Option<&SizeSpec>,
    reference_price: Decimal,
    current_exposure: Decimal,
    lot_precision: u32,
) -> Decimal {
    match spec {
        Some(SizeSpec::Percent(pct)) => current_exposure * *pct / Decimal::ONE_HUNDRED,
        Some(SizeSpec::Quote(amount)) => tokens_for_quote(*amount, reference_price, lot_precision),
        None => current_exposure,
    }
}

/// Like [`order_size`], but never larger than the exposure being closed.
///
/// A quote-sized close request can exceed what is actually open; the close
/// is capped at the full current exposure instead of over-closing.
pub fn close_order_size(
    spec: Option<&SizeSpec>,
    reference_price: Decimal,
    current_exposure: Decimal,
    lot_precision: u32,
) -> Decimal {
    match spec {
        Some(SizeSpec::Quote(amount)) => {
            tokens_for_quote(*amount, reference_price, lot_precision).min(current_exposure)
        }
        _ => order_size(spec, reference_price, current_exposure, lot_precision),
    }
}
