//! Risk engine configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for the risk controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Budget cap applied when a trade intent carries none, in quote
    /// currency. `None` leaves such intents uncapped.
    pub default_max_budget: Option<Decimal>,

    /// Whether a failed budget check aborts trade evaluation on composite
    /// accounts. Single-capability accounts always abort; composite accounts
    /// default to allowing the trade when the check fails. Flip to unify the
    /// policy across account models.
    pub composite_budget_check_fatal: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_max_budget: None,
            composite_budget_check_fatal: false,
        }
    }
}
