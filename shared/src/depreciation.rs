//! Straight-line asset depreciation
//!
//! Per-year depreciation is `(purchase_cost - salvage_value) / useful_life_years`.
//! Accumulated depreciation is kept at currency precision and the last year
//! absorbs the rounding, so the final book value is exactly the salvage value.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::round_currency;

/// Longest useful life accepted for an asset
pub const MAX_USEFUL_LIFE_YEARS: u32 = 100;

/// Depreciation argument errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepreciationError {
    #[error("Purchase cost must be greater than zero")]
    NonPositiveCost,

    #[error("Salvage value cannot be negative")]
    NegativeSalvage,

    #[error("Salvage value must be less than purchase cost")]
    SalvageNotBelowCost,

    #[error("Useful life must be at least one year")]
    NoUsefulLife,

    #[error("Useful life cannot exceed {} years", MAX_USEFUL_LIFE_YEARS)]
    UsefulLifeTooLong,

    #[error("Asset amounts are out of range")]
    AmountOutOfRange,
}

/// One year of a depreciation schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepreciationScheduleEntry {
    /// 1-based year of useful life
    pub period: u32,
    /// Calendar year in which the period starts
    pub year: i32,
    pub period_end: NaiveDate,
    pub depreciation: Decimal,
    pub accumulated_depreciation: Decimal,
    pub book_value: Decimal,
}

fn check_arguments(
    purchase_cost: Decimal,
    salvage_value: Decimal,
    useful_life_years: u32,
) -> Result<(), DepreciationError> {
    if purchase_cost <= Decimal::ZERO {
        return Err(DepreciationError::NonPositiveCost);
    }
    if salvage_value < Decimal::ZERO {
        return Err(DepreciationError::NegativeSalvage);
    }
    if salvage_value >= purchase_cost {
        return Err(DepreciationError::SalvageNotBelowCost);
    }
    if useful_life_years == 0 {
        return Err(DepreciationError::NoUsefulLife);
    }
    if useful_life_years > MAX_USEFUL_LIFE_YEARS {
        return Err(DepreciationError::UsefulLifeTooLong);
    }
    Ok(())
}

/// Straight-line depreciation for a single year, at currency precision
pub fn annual_depreciation(
    purchase_cost: Decimal,
    salvage_value: Decimal,
    useful_life_years: u32,
) -> Result<Decimal, DepreciationError> {
    check_arguments(purchase_cost, salvage_value, useful_life_years)?;
    Ok(round_currency(
        (purchase_cost - salvage_value) / Decimal::from(useful_life_years),
    ))
}

/// Year-by-year straight-line schedule with exactly `useful_life_years` entries
pub fn calculate_depreciation_schedule(
    purchase_cost: Decimal,
    salvage_value: Decimal,
    useful_life_years: u32,
    purchase_date: NaiveDate,
) -> Result<Vec<DepreciationScheduleEntry>, DepreciationError> {
    check_arguments(purchase_cost, salvage_value, useful_life_years)?;

    let depreciable = purchase_cost - salvage_value;
    let years = Decimal::from(useful_life_years);
    let mut previous = Decimal::ZERO;
    let mut schedule = Vec::with_capacity(useful_life_years as usize);

    for period in 1..=useful_life_years {
        let accumulated = if period == useful_life_years {
            depreciable
        } else {
            depreciable
                .checked_mul(Decimal::from(period))
                .ok_or(DepreciationError::AmountOutOfRange)
                .map(|total| round_currency(total / years).min(depreciable))?
        };
        let book_value = (purchase_cost - accumulated).max(salvage_value);

        schedule.push(DepreciationScheduleEntry {
            period,
            year: purchase_date.year() + period as i32 - 1,
            period_end: period_end(purchase_date, period),
            depreciation: accumulated - previous,
            accumulated_depreciation: accumulated,
            book_value,
        });
        previous = accumulated;
    }

    Ok(schedule)
}

/// Book value after the full years of use elapsed by `as_of`
pub fn book_value_at(
    purchase_cost: Decimal,
    salvage_value: Decimal,
    useful_life_years: u32,
    purchase_date: NaiveDate,
    as_of: NaiveDate,
) -> Result<Decimal, DepreciationError> {
    let schedule = calculate_depreciation_schedule(
        purchase_cost,
        salvage_value,
        useful_life_years,
        purchase_date,
    )?;

    Ok(schedule
        .iter()
        .take_while(|entry| entry.period_end <= as_of)
        .last()
        .map(|entry| entry.book_value)
        .unwrap_or(purchase_cost))
}

fn period_end(purchase_date: NaiveDate, period: u32) -> NaiveDate {
    purchase_date
        .checked_add_months(Months::new(12 * period))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tractor_schedule() {
        // 50,000 tractor, 5,000 salvage, 9 years -> 5,000 per year
        let schedule =
            calculate_depreciation_schedule(dec("50000"), dec("5000"), 9, date(2020, 3, 1)).unwrap();

        assert_eq!(schedule.len(), 9);
        assert_eq!(schedule[0].depreciation, dec("5000"));
        assert_eq!(schedule[0].book_value, dec("45000"));
        assert_eq!(schedule[0].year, 2020);
        assert_eq!(schedule[0].period_end, date(2021, 3, 1));
        assert_eq!(schedule[8].book_value, dec("5000"));
        assert_eq!(schedule[8].accumulated_depreciation, dec("45000"));
    }

    #[test]
    fn test_last_year_absorbs_rounding() {
        // 1000 / 3 = 333.33.. per year
        let schedule =
            calculate_depreciation_schedule(dec("1000"), Decimal::ZERO, 3, date(2023, 1, 1)).unwrap();

        assert_eq!(schedule[0].depreciation, dec("333.33"));
        assert_eq!(schedule[1].accumulated_depreciation, dec("666.67"));
        assert_eq!(schedule[2].depreciation, dec("333.33"));
        assert_eq!(schedule[2].book_value, Decimal::ZERO);
    }

    #[test]
    fn test_single_year_life() {
        let schedule =
            calculate_depreciation_schedule(dec("800"), dec("200"), 1, date(2024, 2, 29)).unwrap();

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].depreciation, dec("600"));
        assert_eq!(schedule[0].book_value, dec("200"));
        assert_eq!(schedule[0].period_end, date(2025, 2, 28));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        let d = date(2024, 1, 1);
        assert_eq!(
            calculate_depreciation_schedule(Decimal::ZERO, Decimal::ZERO, 5, d),
            Err(DepreciationError::NonPositiveCost)
        );
        assert_eq!(
            calculate_depreciation_schedule(dec("100"), dec("100"), 5, d),
            Err(DepreciationError::SalvageNotBelowCost)
        );
        assert_eq!(
            calculate_depreciation_schedule(dec("100"), dec("-1"), 5, d),
            Err(DepreciationError::NegativeSalvage)
        );
        assert_eq!(
            calculate_depreciation_schedule(dec("100"), dec("10"), 0, d),
            Err(DepreciationError::NoUsefulLife)
        );
    }

    #[test]
    fn test_useful_life_is_bounded() {
        let d = date(2024, 1, 1);
        let schedule =
            calculate_depreciation_schedule(dec("100000"), dec("100"), MAX_USEFUL_LIFE_YEARS, d)
                .unwrap();
        assert_eq!(schedule.len(), MAX_USEFUL_LIFE_YEARS as usize);

        assert_eq!(
            calculate_depreciation_schedule(dec("100"), dec("10"), MAX_USEFUL_LIFE_YEARS + 1, d),
            Err(DepreciationError::UsefulLifeTooLong)
        );
        assert_eq!(
            book_value_at(dec("100"), dec("10"), i32::MAX as u32, d, d),
            Err(DepreciationError::UsefulLifeTooLong)
        );
    }

    #[test]
    fn test_huge_cost_is_an_error() {
        assert_eq!(
            calculate_depreciation_schedule(Decimal::MAX, Decimal::ZERO, 3, date(2024, 1, 1)),
            Err(DepreciationError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_annual_depreciation() {
        assert_eq!(annual_depreciation(dec("1000"), Decimal::ZERO, 3).unwrap(), dec("333.33"));
    }

    #[test]
    fn test_book_value_at() {
        let purchased = date(2020, 6, 15);
        let value = |as_of| book_value_at(dec("10000"), dec("1000"), 3, purchased, as_of).unwrap();

        assert_eq!(value(date(2020, 12, 31)), dec("10000"));
        assert_eq!(value(date(2021, 6, 15)), dec("7000"));
        assert_eq!(value(date(2022, 12, 1)), dec("4000"));
        assert_eq!(value(date(2030, 1, 1)), dec("1000"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_schedule_shape(
            cost_cents in 100i64..100_000_000i64,
            salvage_pct in 0i64..100i64,
            years in 1u32..40u32
        ) {
            let cost = Decimal::new(cost_cents, 2);
            let salvage = round_currency(cost * Decimal::new(salvage_pct, 2));
            prop_assume!(salvage < cost);

            let schedule =
                calculate_depreciation_schedule(cost, salvage, years, date(2024, 1, 1)).unwrap();

            prop_assert_eq!(schedule.len(), years as usize);

            let mut previous = Decimal::ZERO;
            for entry in &schedule {
                prop_assert!(entry.accumulated_depreciation >= previous);
                prop_assert!(entry.book_value >= salvage);
                previous = entry.accumulated_depreciation;
            }

            let last = schedule.last().unwrap();
            prop_assert!((last.book_value - salvage).abs() <= Decimal::new(1, 2));
        }
    }
}
