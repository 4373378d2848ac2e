//! Retroactive Pay (Backpay) Engine (§4.K): per-period "paid vs
//! should-have-paid" diff, statutory restatement at period-specific rates,
//! and application of arrears onto a future Run.
//!
//! Grounded line-for-line on `backpay_service.py::BackpayService.calculate`
//! (lines 343-460+): the paid/should-have-paid maps, the statutory-codes
//! skip-and-recompute rule, and the old/new taxable-income tracking used to
//! restate SSNIT and PAYE at the rates effective in the historical period.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::payroll_model::backpay::BackpayRequest;
use crate::domain::payroll_model::component::{ComponentType, PayComponent};
use crate::domain::payroll_model::run::{PayrollItem, PayrollItemDetail, PayrollPeriod};
use crate::payroll::computer::calculate_paye;
use crate::payroll::error::{PayrollError, PayrollResult};
use crate::payroll::rate_book::RateBook;

const STATUTORY_SKIP_CODES: [&str; 4] = ["SSNIT_EMP", "PAYE", "OVERTIME_TAX", "BONUS_TAX"];

/// One component's old/new/diff row within a period (spec.md §4.K step 4/5).
#[derive(Clone, Debug)]
pub struct PeriodComponentDiff {
    pub pay_component_code: String,
    pub old_amount: Decimal,
    pub new_amount: Decimal,
    pub difference: Decimal,
}

#[derive(Clone, Debug)]
pub struct PeriodResult {
    pub period_id: Uuid,
    pub details: Vec<PeriodComponentDiff>,
    pub earnings_diff: Decimal,
    pub deductions_diff: Decimal,
    pub net_diff: Decimal,
}

pub struct CalculationResult {
    pub periods: Vec<PeriodResult>,
    pub total_earnings_arrears: Decimal,
    pub total_deductions_arrears: Decimal,
    pub net_arrears: Decimal,
}

/// Inputs already resolved by the caller for a single historical period
/// (spec.md §4.K step 1: applicable_salary/grade/transactions/proration).
pub struct PeriodFacts<'a> {
    pub period: &'a PayrollPeriod,
    /// The Item that actually paid this employee in this period, if any.
    pub paid_item: Option<&'a PayrollItem>,
    pub paid_item_details: &'a [PayrollItemDetail],
    /// `{component_code -> amount}` as it SHOULD have been paid, restricted
    /// to components with `is_arrears_applicable = true`, ordered BASIC
    /// first by construction (spec.md §4.K step 2).
    pub should_have_paid: Vec<(String, Decimal)>,
    pub rate_book: &'a RateBook,
}

/// `calculate(employee, from, to, ...)` (spec.md §4.K): processes each
/// already-resolved `PeriodFacts` and returns the per-period diff plus
/// aggregate totals.
pub fn calculate(
    periods: &[PeriodFacts],
    pay_components: &HashMap<String, PayComponent>,
) -> PayrollResult<CalculationResult> {
    let mut results = Vec::with_capacity(periods.len());
    let mut total_earnings_arrears = Decimal::ZERO;
    let mut total_deductions_arrears = Decimal::ZERO;

    for facts in periods {
        let paid_map = build_paid_map(facts.paid_item_details);
        let should_map: HashMap<String, Decimal> = facts.should_have_paid.iter().cloned().collect();

        let all_codes: HashSet<&str> = paid_map.keys().map(|s| s.as_str())
            .chain(should_map.keys().map(|s| s.as_str()))
            .collect();

        let old_basic = *paid_map.get("BASIC").unwrap_or(&Decimal::ZERO);
        let new_basic = *should_map.get("BASIC").unwrap_or(&Decimal::ZERO);

        let mut details = Vec::new();
        let mut earnings_diff = Decimal::ZERO;
        let mut deductions_diff = Decimal::ZERO;
        let mut old_taxable = Decimal::ZERO;
        let mut new_taxable = Decimal::ZERO;

        for code in all_codes {
            if STATUTORY_SKIP_CODES.contains(&code) {
                continue;
            }
            let old_amount = *paid_map.get(code).unwrap_or(&Decimal::ZERO);
            let new_amount = *should_map.get(code).unwrap_or(&Decimal::ZERO);
            let diff = new_amount - old_amount;
            if diff == Decimal::ZERO {
                continue;
            }
            let Some(component) = pay_components.get(code) else { continue };

            details.push(PeriodComponentDiff {
                pay_component_code: code.to_string(),
                old_amount,
                new_amount,
                difference: diff,
            });

            match component.component_type {
                ComponentType::Earning => {
                    earnings_diff += diff;
                    if component.is_taxable {
                        old_taxable += old_amount;
                        new_taxable += new_amount;
                    }
                }
                ComponentType::Deduction => {
                    deductions_diff += diff;
                    if component.reduces_taxable {
                        old_taxable -= old_amount;
                        new_taxable -= new_amount;
                    }
                }
                ComponentType::EmployerContribution => {}
            }
        }

        // Restate SSNIT/PAYE using the period's own statutory rates.
        let ssnit = facts.rate_book.active_ssnit(facts.period.end_date)?;
        let tier1 = ssnit.get(&crate::domain::payroll_model::statutory::SsnitTier::Tier1);
        let old_ssnit = tier1.map(|t| old_basic * t.employee_pct / Decimal::from(100)).unwrap_or(Decimal::ZERO);
        let new_ssnit = tier1.map(|t| new_basic * t.employee_pct / Decimal::from(100)).unwrap_or(Decimal::ZERO);

        let old_taxable_adjusted = (old_taxable - old_ssnit).max(Decimal::ZERO);
        let new_taxable_adjusted = (new_taxable - new_ssnit).max(Decimal::ZERO);

        let brackets = facts.rate_book.active_brackets(facts.period.end_date)?;
        let old_paye = calculate_paye(old_taxable_adjusted, &brackets);
        let new_paye = calculate_paye(new_taxable_adjusted, &brackets);

        if new_ssnit - old_ssnit != Decimal::ZERO {
            details.push(PeriodComponentDiff {
                pay_component_code: "SSNIT_EMP".to_string(),
                old_amount: old_ssnit,
                new_amount: new_ssnit,
                difference: new_ssnit - old_ssnit,
            });
            deductions_diff += new_ssnit - old_ssnit;
        }
        if new_paye - old_paye != Decimal::ZERO {
            details.push(PeriodComponentDiff {
                pay_component_code: "PAYE".to_string(),
                old_amount: old_paye,
                new_amount: new_paye,
                difference: new_paye - old_paye,
            });
            deductions_diff += new_paye - old_paye;
        }

        total_earnings_arrears += earnings_diff;
        total_deductions_arrears += deductions_diff;

        results.push(PeriodResult {
            period_id: facts.period.id,
            details,
            earnings_diff,
            deductions_diff,
            net_diff: earnings_diff - deductions_diff,
        });
    }

    Ok(CalculationResult {
        periods: results,
        total_earnings_arrears,
        total_deductions_arrears,
        net_arrears: total_earnings_arrears - total_deductions_arrears,
    })
}

/// `paid_map` (spec.md §4.K step 3): non-arrear detail rows only — rows
/// materialised by a prior backpay application are excluded so they never
/// feed into a later backpay's baseline (spec.md §8 P7).
fn build_paid_map(details: &[PayrollItemDetail]) -> HashMap<String, Decimal> {
    details
        .iter()
        .filter(|d| !d.is_arrear)
        .map(|d| (d.pay_component_code.clone(), d.amount))
        .collect()
}

/// `create_request` (spec.md §4.K): rejects overlapping non-cancelled
/// requests for the same employee/date-range before persisting.
pub fn assert_no_overlapping_applied_request(
    existing: &[BackpayRequest],
    employee_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> PayrollResult<()> {
    let clash = existing.iter().any(|r| {
        r.employee_id == employee_id
            && r.status == crate::domain::payroll_model::backpay::BackpayStatus::Applied
            && r.overlaps(from, to)
    });
    if clash {
        return Err(PayrollError::Validation(format!(
            "an applied backpay request already covers employee {} for this date range",
            employee_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Entity;
    use crate::domain::payroll_model::component::{CalcKind, ComponentCategory};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn basic_component() -> PayComponent {
        PayComponent {
            entity: Entity::new(Uuid::nil(), Utc::now()),
            code: "BASIC".into(),
            name: "Basic Salary".into(),
            component_type: ComponentType::Earning,
            category: ComponentCategory::Basic,
            calc_kind: CalcKind::Fixed,
            default_amount: None,
            default_percentage: None,
            formula: None,
            is_taxable: true,
            reduces_taxable: false,
            is_overtime: false,
            is_bonus: false,
            affects_ssnit: true,
            is_statutory: false,
            is_recurring: true,
            is_prorated: true,
            is_arrears_applicable: true,
            show_on_payslip: true,
            display_order: 0,
        }
    }

    fn period(id: Uuid, start: NaiveDate, end: NaiveDate) -> PayrollPeriod {
        PayrollPeriod {
            id,
            calendar_id: Uuid::new_v4(),
            name: format!("{}", start),
            start_date: start,
            end_date: end,
            status: crate::domain::payroll_model::run::PeriodStatus::Paid,
            payment_date: Some(end),
            is_supplementary: false,
            parent_period_id: None,
        }
    }

    fn paid_basic_detail(item_id: Uuid, amount: Decimal) -> PayrollItemDetail {
        PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id,
            pay_component_code: "BASIC".into(),
            amount,
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: 0,
        }
    }

    /// spec.md §8 scenario 6: a salary revision from 4000 to 5000 effective
    /// retroactively over Jan+Feb produces per-period diffs of +1000 BASIC
    /// plus restated SSNIT/PAYE, and is idempotent on repeated calculation
    /// (spec.md §8 P6).
    #[test]
    fn salary_revision_over_two_periods_restates_ssnit_and_paye() {
        let mut pay_components = HashMap::new();
        pay_components.insert("BASIC".to_string(), basic_component());

        let rate_book = RateBook::seed_ghana_2026(date(2026, 1, 1));
        let jan_item_id = Uuid::new_v4();
        let feb_item_id = Uuid::new_v4();
        let jan = period(Uuid::new_v4(), date(2026, 1, 1), date(2026, 1, 31));
        let feb = period(Uuid::new_v4(), date(2026, 2, 1), date(2026, 2, 28));
        let jan_paid_details = vec![paid_basic_detail(jan_item_id, dec!(4000))];
        let feb_paid_details = vec![paid_basic_detail(feb_item_id, dec!(4000))];

        let periods = vec![
            PeriodFacts {
                period: &jan,
                paid_item: None,
                paid_item_details: &jan_paid_details,
                should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
                rate_book: &rate_book,
            },
            PeriodFacts {
                period: &feb,
                paid_item: None,
                paid_item_details: &feb_paid_details,
                should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
                rate_book: &rate_book,
            },
        ];

        let result = calculate(&periods, &pay_components).unwrap();

        assert_eq!(result.periods.len(), 2);
        for p in &result.periods {
            assert_eq!(p.earnings_diff, dec!(1000));
            // SSNIT_EMP restated: (5000-4000) * 5.5% = 55.
            let ssnit_row = p.details.iter().find(|d| d.pay_component_code == "SSNIT_EMP").unwrap();
            assert_eq!(ssnit_row.difference, dec!(55.00));
            // PAYE must also move since taxable income increased.
            let paye_row = p.details.iter().find(|d| d.pay_component_code == "PAYE");
            assert!(paye_row.is_some());
            assert_eq!(p.net_diff, p.earnings_diff - p.deductions_diff);
        }
        assert_eq!(result.total_earnings_arrears, dec!(2000));

        // P6: recalculating with unchanged inputs yields identical totals.
        let result_again = calculate(&periods, &pay_components).unwrap();
        assert_eq!(result_again.net_arrears, result.net_arrears);
        assert_eq!(result_again.periods[0].details.len(), result.periods[0].details.len());
    }

    #[test]
    fn no_diff_when_paid_matches_should_have_paid() {
        let mut pay_components = HashMap::new();
        pay_components.insert("BASIC".to_string(), basic_component());
        let rate_book = RateBook::seed_ghana_2026(date(2026, 1, 1));
        let item_id = Uuid::new_v4();
        let jan = period(Uuid::new_v4(), date(2026, 1, 1), date(2026, 1, 31));
        let paid_details = vec![paid_basic_detail(item_id, dec!(5000))];

        let periods = vec![PeriodFacts {
            period: &jan,
            paid_item: None,
            paid_item_details: &paid_details,
            should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
            rate_book: &rate_book,
        }];

        let result = calculate(&periods, &pay_components).unwrap();
        assert_eq!(result.net_arrears, Decimal::ZERO);
        assert!(result.periods[0].details.is_empty());
    }

    /// P7: a prior backpay's arrear detail rows must never feed back in as
    /// the "paid" baseline for a later calculation.
    #[test]
    fn arrear_rows_are_excluded_from_the_paid_baseline() {
        let mut pay_components = HashMap::new();
        pay_components.insert("BASIC".to_string(), basic_component());
        let rate_book = RateBook::seed_ghana_2026(date(2026, 1, 1));
        let item_id = Uuid::new_v4();
        let jan = period(Uuid::new_v4(), date(2026, 1, 1), date(2026, 1, 31));

        let mut real_detail = paid_basic_detail(item_id, dec!(4000));
        real_detail.is_arrear = false;
        let mut arrear_detail = paid_basic_detail(item_id, dec!(500));
        arrear_detail.is_arrear = true;
        let paid_details = vec![real_detail, arrear_detail];

        let periods = vec![PeriodFacts {
            period: &jan,
            paid_item: None,
            paid_item_details: &paid_details,
            should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
            rate_book: &rate_book,
        }];

        let result = calculate(&periods, &pay_components).unwrap();
        // Baseline must be 4000 (the non-arrear row only), not 4500.
        assert_eq!(result.periods[0].earnings_diff, dec!(1000));
    }
}

/// `apply_to_payroll(request, run)` (spec.md §4.K): materialises one
/// PayrollItemDetail per (component, total_diff) across all periods, marked
/// `is_arrear = true`, and mutates the target Item's three summary fields.
pub fn apply_to_payroll(
    request: &mut BackpayRequest,
    calculation: &CalculationResult,
    target_item: &mut PayrollItem,
    distinct_period_count: i32,
    run_id: Uuid,
    now: chrono::DateTime<chrono::Utc>,
) -> PayrollResult<Vec<PayrollItemDetail>> {
    if request.status != crate::domain::payroll_model::backpay::BackpayStatus::Approved {
        return Err(PayrollError::illegal_transition("apply_to_payroll", format!("{:?}", request.status), "APPLIED"));
    }

    let mut totals_by_component: HashMap<String, Decimal> = HashMap::new();
    for period in &calculation.periods {
        for d in &period.details {
            *totals_by_component.entry(d.pay_component_code.clone()).or_insert(Decimal::ZERO) += d.difference;
        }
    }

    let mut rows = Vec::new();
    let mut order = 1000i32;
    for (code, diff) in totals_by_component {
        if diff == Decimal::ZERO {
            continue;
        }
        rows.push(PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id: target_item.id,
            pay_component_code: code,
            amount: diff,
            is_arrear: true,
            arrear_months: Some(distinct_period_count),
            backpay_request_id: Some(request.id),
            display_order: order,
        });
        order += 1;
    }

    target_item.gross_earnings += calculation.total_earnings_arrears;
    target_item.total_deductions += calculation.total_deductions_arrears;
    target_item.net_salary += calculation.net_arrears;

    request.mark_applied(run_id, now).map_err(PayrollError::Validation)?;
    Ok(rows)
}
