//! Proration Engine (§4.E): the days-payable factor for mid-period joiners
//! and exiters.
//!
//! Grounded on `services.py::calculate_proration_factor`, including the
//! `first_working_day` Monday-Friday skip-loop that decides whether a
//! joiner lands before or after the period's first working day.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proration {
    pub effective_start: NaiveDate,
    pub effective_end: NaiveDate,
    pub days_payable: i64,
    pub total_days: i64,
}

impl Proration {
    /// 4dp HALF_UP; `1` exactly if the employee covers the whole period.
    pub fn factor(&self) -> Decimal {
        if self.days_payable >= self.total_days {
            return Decimal::ONE;
        }
        if self.total_days == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.days_payable) / Decimal::from(self.total_days))
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    }
}

fn first_working_day_on_or_after(date: NaiveDate) -> NaiveDate {
    let mut d = date;
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d += Duration::days(1);
    }
    d
}

/// `calculate_proration_factor(employee, period)` (spec.md §4.E).
pub fn calculate(
    date_of_joining: NaiveDate,
    date_of_exit: Option<NaiveDate>,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Proration {
    let total_days = (period_end - period_start).num_days() + 1;

    let effective_start = if date_of_joining > period_start {
        let first_working_day = first_working_day_on_or_after(period_start);
        if date_of_joining <= first_working_day {
            period_start
        } else {
            date_of_joining
        }
    } else {
        period_start
    };

    let effective_end = match date_of_exit {
        Some(exit) if exit < period_end => exit,
        _ => period_end,
    };

    let days_payable = ((effective_end - effective_start).num_days() + 1).max(0);

    Proration {
        effective_start,
        effective_end,
        days_payable,
        total_days,
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
    fn full_month_is_factor_one() {
        let p = calculate(date(2025, 1, 1), None, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(p.factor(), Decimal::ONE);
    }

    #[test]
    fn mid_month_joiner_on_weekday_prorates() {
        // Jan 2026: 1st is a Thursday, a working day, so joining on the 1st
        // itself is the full-period case; joining on the 16th prorates.
        let p = calculate(date(2026, 1, 16), None, date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(p.days_payable, 16);
        assert_eq!(p.total_days, 31);
        assert_eq!(p.factor(), dec!(0.5161));
    }

    #[test]
    fn joiner_on_or_before_first_working_day_gets_full_period() {
        // Period starts Sunday 2026-02-01; first working day is Monday
        // 2026-02-02. An employee joining on the Sunday or the Monday
        // itself is not prorated.
        let p = calculate(date(2026, 2, 2), None, date(2026, 2, 1), date(2026, 2, 28));
        assert_eq!(p.effective_start, date(2026, 2, 1));
        assert_eq!(p.factor(), Decimal::ONE);
    }

    #[test]
    fn exit_before_period_end_prorates() {
        let p = calculate(date(2020, 1, 1), Some(date(2026, 1, 15)), date(2026, 1, 1), date(2026, 1, 31));
        assert_eq!(p.days_payable, 15);
    }
}
