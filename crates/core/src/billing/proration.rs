//! Proration calculator for first-period DID charges.
//!
//! The setup fee is charged in full; the first month is billed only for the
//! days remaining in the calendar month containing the purchase date, at
//! `monthly_price / days_in_month` per day. The renewal date is always the
//! 1st of the following month regardless of purchase day.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Result of a proration calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proration {
    /// Days in the calendar month containing the purchase date.
    pub days_in_month: u32,
    /// Days billed in the first period (purchase day inclusive).
    pub days_in_first_period: u32,
    /// First-period share of the monthly price, rounded to 2 decimals.
    pub prorated_monthly_price: Decimal,
    /// Setup fee plus prorated monthly price.
    pub total_due_now: Decimal,
    /// The 1st of the month following the purchase date.
    pub next_renewal_date: NaiveDate,
}

/// Pure date-arithmetic proration calculator.
pub struct ProrationCalculator;

impl ProrationCalculator {
    /// Calculates the first-period charge for a purchase on `purchase_date`.
    ///
    /// Amounts are rounded to 2 decimal places with banker's rounding
    /// (`MidpointNearestEven`).
    #[must_use]
    pub fn calculate(
        setup_price: Decimal,
        monthly_price: Decimal,
        purchase_date: NaiveDate,
    ) -> Proration {
        let days_in_month = Self::days_in_month(purchase_date);
        let days_in_first_period = days_in_month - purchase_date.day() + 1;

        let prorated_monthly_price = (monthly_price / Decimal::from(days_in_month)
            * Decimal::from(days_in_first_period))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);

        Proration {
            days_in_month,
            days_in_first_period,
            prorated_monthly_price,
            total_due_now: setup_price + prorated_monthly_price,
            next_renewal_date: Self::first_of_next_month(purchase_date),
        }
    }

    /// Returns the number of days in the calendar month containing `date`.
    #[must_use]
    pub fn days_in_month(date: NaiveDate) -> u32 {
        let first = Self::first_of_month(date);
        let next = Self::first_of_next_month(date);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (next - first).num_days() as u32
        }
    }

    /// Returns the 1st of the calendar month containing `date`.
    #[must_use]
    pub fn first_of_month(date: NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .expect("first of an existing month is a valid date")
    }

    /// Returns the 1st of the calendar month after `date`.
    #[must_use]
    pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .expect("first of an existing month is a valid date")
    }

    /// Advances a renewal cursor by one calendar month.
    ///
    /// Cursors always sit on the 1st of a month, so advancing never has to
    /// clamp a day-of-month.
    #[must_use]
    pub fn advance_one_month(cursor: NaiveDate) -> NaiveDate {
        Self::first_of_next_month(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mid_month_purchase_on_31_day_month() {
        let result = ProrationCalculator::calculate(dec!(10), dec!(30), date(2026, 1, 20));

        assert_eq!(result.days_in_month, 31);
        assert_eq!(result.days_in_first_period, 12);
        assert_eq!(result.prorated_monthly_price, dec!(11.61));
        assert_eq!(result.total_due_now, dec!(21.61));
        assert_eq!(result.next_renewal_date, date(2026, 2, 1));
    }

    #[test]
    fn test_first_of_month_purchase_bills_full_month() {
        let result = ProrationCalculator::calculate(dec!(10), dec!(30), date(2026, 4, 1));

        assert_eq!(result.days_in_month, 30);
        assert_eq!(result.days_in_first_period, 30);
        assert_eq!(result.prorated_monthly_price, dec!(30.00));
        assert_eq!(result.total_due_now, dec!(40.00));
        assert_eq!(result.next_renewal_date, date(2026, 5, 1));
    }

    #[test]
    fn test_last_day_purchase_bills_one_day() {
        let result = ProrationCalculator::calculate(dec!(0), dec!(31), date(2026, 1, 31));

        assert_eq!(result.days_in_first_period, 1);
        assert_eq!(result.prorated_monthly_price, dec!(1.00));
        assert_eq!(result.total_due_now, dec!(1.00));
    }

    #[test]
    fn test_december_purchase_rolls_into_next_year() {
        let result = ProrationCalculator::calculate(dec!(5), dec!(30), date(2026, 12, 15));
        assert_eq!(result.next_renewal_date, date(2027, 1, 1));
    }

    #[test]
    fn test_february_leap_year() {
        // 2028 is a leap year.
        let result = ProrationCalculator::calculate(dec!(0), dec!(29), date(2028, 2, 1));
        assert_eq!(result.days_in_month, 29);
        assert_eq!(result.prorated_monthly_price, dec!(29.00));
    }

    #[test]
    fn test_february_non_leap_year() {
        let result = ProrationCalculator::calculate(dec!(0), dec!(28), date(2026, 2, 15));
        assert_eq!(result.days_in_month, 28);
        assert_eq!(result.days_in_first_period, 14);
        assert_eq!(result.prorated_monthly_price, dec!(14.00));
    }

    #[test]
    fn test_zero_monthly_price() {
        let result = ProrationCalculator::calculate(dec!(0), dec!(0), date(2026, 1, 20));
        assert_eq!(result.prorated_monthly_price, Decimal::ZERO);
        assert_eq!(result.total_due_now, Decimal::ZERO);
    }

    #[test]
    fn test_advance_one_month() {
        assert_eq!(
            ProrationCalculator::advance_one_month(date(2026, 2, 1)),
            date(2026, 3, 1)
        );
        assert_eq!(
            ProrationCalculator::advance_one_month(date(2026, 12, 1)),
            date(2027, 1, 1)
        );
    }
}
