use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;

use super::types::Money;

/// Rounds half away from zero to whole pence.
pub fn round2(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One month of interest on a single bucket, rounded on its own.
///
/// `apr` is a percentage (27.9 means 27.9%). Multiplying before dividing keeps
/// rates like 19.9% exact, so midpoints such as 11.625 round the way a
/// statement would.
pub fn monthly_interest(balance: Money, apr: Money) -> Money {
    if apr.is_zero() || balance <= Money::ZERO {
        return Money::ZERO;
    }
    round2(balance * apr / dec!(100) / dec!(12))
}
