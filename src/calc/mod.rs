//! Pure calculation core.
//!
//! Everything in here works on borrowed snapshots and returns values;
//! nothing touches the backend or the clock directly.

pub mod bets;
pub mod cycle;
pub mod metrics;
pub mod projection;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Largest amount accepted for a bankroll, a chip or a zero stake.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// Largest daily goal accepted, in percent.
pub const MAX_GOAL_PERCENT: Decimal = dec!(1000);

/// `percent`% of `base`, or zero when the percentage is not positive.
/// Saturates at `Decimal::MAX`/`MIN` instead of overflowing.
pub(crate) fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    if percent <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    base.checked_mul(percent)
        .map(|v| v / dec!(100))
        .or_else(|| (base / dec!(100)).checked_mul(percent))
        .unwrap_or(if base.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        })
}
