//! Fixed-point money arithmetic
//!
//! All amounts are `rust_decimal::Decimal`; nothing here goes through binary
//! floating point.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept on currency amounts
pub const CURRENCY_SCALE: u32 = 2;

/// Largest difference tolerated when comparing a derived amount to its source
pub const ROUNDING_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Round an amount to currency precision (half away from zero)
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Total of a base amount with tax applied
/// Formula: base × (1 + tax_rate), rounded to 2 fractional digits
///
/// `None` when the result does not fit in a `Decimal`.
pub fn calculate_financial_amount(base: Decimal, tax_rate: Decimal) -> Option<Decimal> {
    let factor = Decimal::ONE.checked_add(tax_rate)?;
    base.checked_mul(factor).map(round_currency)
}

/// Whether two amounts agree within the rounding tolerance
pub fn amounts_match(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= ROUNDING_TOLERANCE
}
