//! Property-based tests for the proration calculator.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::proration::ProrationCalculator;

/// Strategy to generate non-negative prices (0.00 to 1,000,000.00).
fn price() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate valid calendar dates between 2020 and 2032.
fn calendar_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2032, 1u32..=12, 1u32..=31).prop_filter_map("day must exist in month", |(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The total due now is exactly the setup fee plus the prorated share.
    #[test]
    fn prop_total_is_setup_plus_prorated(
        setup in price(),
        monthly in price(),
        date in calendar_date(),
    ) {
        let result = ProrationCalculator::calculate(setup, monthly, date);
        prop_assert_eq!(result.total_due_now, setup + result.prorated_monthly_price);
    }

    /// The prorated first period never costs more than a full month.
    #[test]
    fn prop_prorated_never_exceeds_monthly(
        monthly in price(),
        date in calendar_date(),
    ) {
        let result = ProrationCalculator::calculate(Decimal::ZERO, monthly, date);
        // Rounding to 2 decimals can add at most half a cent; the generated
        // prices carry 2 decimals, so the bound is exact.
        prop_assert!(result.prorated_monthly_price <= monthly);
        prop_assert!(result.prorated_monthly_price >= Decimal::ZERO);
    }

    /// The renewal date is always the 1st of the month after the purchase.
    #[test]
    fn prop_renewal_is_first_of_next_month(
        setup in price(),
        monthly in price(),
        date in calendar_date(),
    ) {
        let result = ProrationCalculator::calculate(setup, monthly, date);
        prop_assert_eq!(result.next_renewal_date.day(), 1);
        prop_assert!(result.next_renewal_date > date);
        let gap = (result.next_renewal_date - date).num_days();
        prop_assert!(gap >= 1 && gap <= 31);
    }

    /// The billed day count matches the calendar.
    #[test]
    fn prop_day_count_matches_calendar(
        date in calendar_date(),
    ) {
        let result = ProrationCalculator::calculate(Decimal::ZERO, Decimal::ZERO, date);
        prop_assert_eq!(
            result.days_in_first_period,
            result.days_in_month - date.day() + 1
        );
        prop_assert!(result.days_in_month >= 28 && result.days_in_month <= 31);
    }

    /// Prorated amounts carry at most 2 decimal places.
    #[test]
    fn prop_prorated_has_two_decimals(
        monthly in price(),
        date in calendar_date(),
    ) {
        let result = ProrationCalculator::calculate(Decimal::ZERO, monthly, date);
        let scaled = result.prorated_monthly_price * Decimal::from(100);
        prop_assert_eq!(scaled.round(), scaled);
    }

    /// A purchase on the 1st bills the full month.
    #[test]
    fn prop_first_day_bills_full_month(
        monthly in price(),
        date in calendar_date(),
    ) {
        let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap();
        let result = ProrationCalculator::calculate(Decimal::ZERO, monthly, first);
        prop_assert_eq!(result.prorated_monthly_price, monthly.round_dp(2));
    }
}
