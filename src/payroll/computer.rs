//! Employee Payroll Computer (§4.F/G/H): for one employee in one period,
//! produces the full computed breakdown using the Rate Book, Compensation
//! Graph, Transaction Overlay, Formula Evaluator, and Proration Engine.
//!
//! Grounded on `services.py` lines 322-723 (`calculate_payroll_for_employee`
//! and its overtime/bonus helpers) and `tax_service.py`'s bracket loop.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::domain::payroll_model::component::{ComponentType, PayComponent, BASIC_CODE};
use crate::domain::payroll_model::employee::{AdHocPayment, PayrollEmployee};
use crate::domain::payroll_model::employee_salary::{EmployeeSalary, EmployeeSalaryComponent};
use crate::domain::payroll_model::run::{BankAccountSnapshot, ItemStatus, PayrollItem, PayrollItemDetail, PayrollPeriod};
use crate::domain::payroll_model::salary_structure::{Grade, SalaryLevel, SalaryNotch};
use crate::domain::payroll_model::statutory::{OvertimeBonusTaxConfig, SsnitTier, TaxBracket};
use crate::domain::payroll_model::transaction::EmployeeTransaction;
use crate::payroll::error::{PayrollError, PayrollResult};
use crate::payroll::proration;
use crate::payroll::rate_book::RateBook;
use crate::payroll::transaction_overlay;

fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The read-only slices one employee's computation draws on, bundled so
/// `compute_employee`'s signature stays manageable (spec.md §4.F input).
pub struct ComputationInputs<'a> {
    pub employee: &'a PayrollEmployee,
    pub period: &'a PayrollPeriod,
    pub salaries: &'a [EmployeeSalary],
    pub salary_components: &'a [EmployeeSalaryComponent],
    pub ad_hoc_payments: &'a [AdHocPayment],
    pub transactions: &'a [EmployeeTransaction],
    pub pay_components: &'a HashMap<String, PayComponent>,
    pub grades: &'a [Grade],
    pub notches: &'a [SalaryNotch],
    pub levels: &'a [SalaryLevel],
    pub rate_book: &'a RateBook,
}

pub struct ComputationResult {
    pub item: PayrollItem,
    pub details: Vec<PayrollItemDetail>,
}

#[derive(Default)]
struct Buckets {
    regular_taxable: Decimal,
    non_taxable: Decimal,
    overtime: Decimal,
    bonus: Decimal,
    pre_tax_deductions: Decimal,
    other_deductions: Decimal,
    employer_contrib: Decimal,
}

/// Classifies one source amount into its bucket (spec.md §4.F step 3:
/// "precedence is is_overtime -> is_bonus -> is_taxable") and, if non-zero,
/// appends a detail row.
fn classify(
    code: &str,
    amount: Decimal,
    component: Option<&PayComponent>,
    buckets: &mut Buckets,
    sources: &mut Vec<(String, Decimal)>,
) {
    if amount == Decimal::ZERO {
        return;
    }
    sources.push((code.to_string(), amount));

    let Some(component) = component else {
        // Unknown codes (e.g. an ad hoc payment referencing a retired
        // component) are treated as taxable earnings by default.
        buckets.regular_taxable += amount;
        return;
    };

    match component.component_type {
        ComponentType::EmployerContribution => buckets.employer_contrib += amount,
        ComponentType::Deduction => {
            if component.reduces_taxable {
                buckets.pre_tax_deductions += amount;
            } else {
                buckets.other_deductions += amount;
            }
        }
        ComponentType::Earning => {
            if component.is_overtime {
                buckets.overtime += amount;
            } else if component.is_bonus {
                buckets.bonus += amount;
            } else if !component.is_taxable {
                buckets.non_taxable += amount;
            } else {
                buckets.regular_taxable += amount;
            }
        }
    }
}

/// `compute_employee(employee, period)` (spec.md §4.F).
pub fn compute_employee(run_id: Uuid, inputs: &ComputationInputs) -> PayrollResult<ComputationResult> {
    // Step 1 — resolve salary.
    let salary = crate::payroll::compensation::current_salary(
        inputs.salaries,
        inputs.employee.id,
        inputs.period.end_date,
    )
    .ok_or(PayrollError::NotFound { entity: "EmployeeSalary", id: inputs.employee.id })?;

    let basic_salary = salary.basic_salary;
    let annual_basic = basic_salary * Decimal::from(12);

    // Step 2 — proration.
    let proration = proration::calculate(
        inputs.employee.date_of_joining,
        inputs.employee.date_of_exit,
        inputs.period.start_date,
        inputs.period.end_date,
    );
    let factor = proration.factor();

    let basic_is_prorated = inputs.pay_components.get(BASIC_CODE).map(|c| c.is_prorated).unwrap_or(true);
    let prorated_basic = if basic_is_prorated { basic_salary * factor } else { basic_salary };

    let mut buckets = Buckets::default();
    let mut sources: Vec<(String, Decimal)> = Vec::new();
    let mut running_gross = Decimal::ZERO;

    // Source 1: BASIC.
    classify(BASIC_CODE, prorated_basic, inputs.pay_components.get(BASIC_CODE), &mut buckets, &mut sources);
    running_gross += prorated_basic;

    // Source 2: EmployeeSalaryComponent rows (except BASIC).
    let active_components = crate::payroll::compensation::salary_components(
        inputs.salary_components,
        salary.id,
        inputs.period.end_date,
    );
    for comp in &active_components {
        if comp.pay_component_code == BASIC_CODE {
            continue;
        }
        let catalogue = inputs.pay_components.get(&comp.pay_component_code);
        let prorated = catalogue.map(|c| c.is_prorated).unwrap_or(false);
        let amount = if prorated { comp.amount * factor } else { comp.amount };
        classify(&comp.pay_component_code, amount, catalogue, &mut buckets, &mut sources);
        running_gross += amount;
    }

    // Source 3: approved AdHocPayments for this (employee, period), unprorated.
    for payment in inputs
        .ad_hoc_payments
        .iter()
        .filter(|p| p.employee_id == inputs.employee.id && p.period_id == inputs.period.id && p.is_approved)
    {
        let catalogue = inputs.pay_components.get(&payment.pay_component_code);
        classify(&payment.pay_component_code, payment.amount, catalogue, &mut buckets, &mut sources);
        running_gross += payment.amount;
    }

    // Source 4: applicable transactions not already covered by a structural component.
    let band_id = transaction_overlay::resolve_band_id(inputs.employee, inputs.grades, inputs.notches, inputs.levels);
    let applicable = transaction_overlay::applicable_transactions(
        inputs.transactions,
        inputs.employee,
        band_id,
        inputs.period,
    );
    let covered: std::collections::HashSet<&str> =
        active_components.iter().map(|c| c.pay_component_code.as_str()).collect();
    // Transactions for the same component code accumulate (sum) into one
    // source line rather than one row per transaction (spec.md §4.C).
    let mut transaction_totals: Vec<(String, Decimal)> = Vec::new();
    for txn in &applicable {
        if covered.contains(txn.pay_component_code.as_str()) {
            continue;
        }
        let catalogue = inputs.pay_components.get(&txn.pay_component_code);
        let default_amount = catalogue.and_then(|c| c.default_amount);
        let raw = txn.calculate_amount(basic_salary, running_gross, default_amount, |f, b, g| {
            crate::payroll::formula::evaluate(f, b, g)
        });
        let prorated = txn.is_recurring && catalogue.map(|c| c.is_prorated).unwrap_or(false);
        let amount = if prorated { raw * factor } else { raw };
        match transaction_totals.iter_mut().find(|(code, _)| *code == txn.pay_component_code) {
            Some((_, total)) => *total += amount,
            None => transaction_totals.push((txn.pay_component_code.clone(), amount)),
        }
    }
    for (code, amount) in &transaction_totals {
        let catalogue = inputs.pay_components.get(code);
        classify(code, *amount, catalogue, &mut buckets, &mut sources);
        running_gross += *amount;
    }

    // Step 4 — gross earnings.
    let gross_earnings = buckets.regular_taxable + buckets.non_taxable + buckets.overtime + buckets.bonus;

    // Step 5 — SSNIT.
    let ssnit_rates = inputs.rate_book.active_ssnit(inputs.period.end_date)?;
    let ssnit_basis = if basic_is_prorated { prorated_basic } else { basic_salary };
    let tier1 = ssnit_rates.get(&SsnitTier::Tier1);
    let tier2 = ssnit_rates.get(&SsnitTier::Tier2);
    let mut ssnit_employee = tier1.map(|t| ssnit_basis * t.employee_pct / Decimal::from(100)).unwrap_or(Decimal::ZERO);
    if let Some(t1) = tier1 {
        if let Some(cap) = t1.max_contribution {
            ssnit_employee = ssnit_employee.min(cap);
        }
    }
    let ssnit_employer = tier1.map(|t| ssnit_basis * t.employer_pct / Decimal::from(100)).unwrap_or(Decimal::ZERO);
    let tier2_employer = tier2.map(|t| ssnit_basis * t.employer_pct / Decimal::from(100)).unwrap_or(Decimal::ZERO);

    // Step 6 — tax relief.
    let reliefs = inputs.rate_book.active_reliefs(inputs.period.end_date);
    let mut relief = Decimal::ZERO;
    for r in reliefs.iter() {
        let mut contribution = match r.kind {
            crate::domain::payroll_model::statutory::ReliefKind::Fixed => r.amount.unwrap_or(Decimal::ZERO),
            crate::domain::payroll_model::statutory::ReliefKind::Percentage => {
                gross_earnings * r.percentage.unwrap_or(Decimal::ZERO) / Decimal::from(100)
            }
        };
        if let Some(max) = r.max {
            contribution = contribution.min(max);
        }
        relief += contribution;
    }

    // Step 7 — overtime tax segregation.
    let cfg = inputs.rate_book.overtime_bonus_config();
    let (overtime_tax, overtime_qualifies) =
        overtime_tax(buckets.overtime, basic_salary, annual_basic, inputs.employee.is_resident, &cfg);
    let overtime_to_paye = if overtime_qualifies { Decimal::ZERO } else { buckets.overtime };

    // Step 8 — bonus tax segregation.
    let (bonus_tax, bonus_excess) = bonus_tax(buckets.bonus, annual_basic, inputs.employee.is_resident, &cfg);

    // Step 9 — taxable income for PAYE.
    let taxable_income = (buckets.regular_taxable + overtime_to_paye + bonus_excess
        - ssnit_employee
        - relief
        - buckets.pre_tax_deductions)
        .max(Decimal::ZERO);

    // Step 10 — PAYE.
    let brackets = inputs.rate_book.active_brackets(inputs.period.end_date)?;
    let paye = calculate_paye(taxable_income, &brackets);

    // Step 11 — statutory detail rows and totals.
    let mut details: Vec<PayrollItemDetail> = Vec::new();
    let mut order = 0i32;
    let item_id = Uuid::new_v4();
    for (code, amount) in &sources {
        details.push(PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id,
            pay_component_code: code.clone(),
            amount: round2(*amount),
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: order,
        });
        order += 1;
    }
    let statutory_rows: [(&str, Decimal); 4] = [
        ("SSNIT_EMP", ssnit_employee),
        ("PAYE", paye),
        ("OVERTIME_TAX", overtime_tax),
        ("BONUS_TAX", bonus_tax),
    ];
    for (code, amount) in statutory_rows {
        if amount != Decimal::ZERO {
            details.push(PayrollItemDetail {
                id: Uuid::new_v4(),
                item_id,
                pay_component_code: code.to_string(),
                amount: round2(amount),
                is_arrear: false,
                arrear_months: None,
                backpay_request_id: None,
                display_order: order,
            });
            order += 1;
        }
    }

    let total_deductions =
        buckets.other_deductions + buckets.pre_tax_deductions + ssnit_employee + paye + overtime_tax + bonus_tax;
    let net_salary = gross_earnings - total_deductions;
    let employer_cost = gross_earnings + ssnit_employer + tier2_employer + buckets.employer_contrib;

    let bank_snapshot = inputs.employee.primary_bank_account().map(|b| BankAccountSnapshot {
        bank_name: b.bank_name.clone(),
        branch: b.branch.clone(),
        account_number: b.account_number.clone(),
        account_name: b.account_name.clone(),
    });

    let item = PayrollItem {
        id: item_id,
        run_id,
        employee_id: inputs.employee.id,
        employee_number: inputs.employee.employee_number.clone(),
        basic_salary: round2(prorated_basic),
        gross_earnings: round2(gross_earnings),
        total_deductions: round2(total_deductions),
        net_salary: round2(net_salary),
        taxable_income: round2(taxable_income),
        paye: round2(paye),
        overtime_tax: round2(overtime_tax),
        bonus_tax: round2(bonus_tax),
        total_overtime: round2(buckets.overtime),
        total_bonus: round2(buckets.bonus),
        ssnit_employee: round2(ssnit_employee),
        ssnit_employer: round2(ssnit_employer),
        tier2_employer: round2(tier2_employer),
        employer_cost: round2(employer_cost),
        proration_factor: factor,
        days_payable: proration.days_payable,
        total_days: proration.total_days,
        bank_snapshot,
        status: ItemStatus::Computed,
        error_message: None,
    };

    Ok(ComputationResult { item, details })
}

/// `calculate_paye(taxable_income, brackets)` (spec.md §4.F step 10):
/// bracket-by-bracket, deducting each bracket's capacity from the
/// remaining income and accumulating `portion * rate / 100`.
pub fn calculate_paye(taxable_income: Decimal, brackets: &[TaxBracket]) -> Decimal {
    let mut remaining = taxable_income;
    let mut tax = Decimal::ZERO;
    for bracket in brackets {
        if remaining <= Decimal::ZERO {
            break;
        }
        let width = match bracket.max {
            Some(max) => max - bracket.min,
            None => remaining,
        };
        let portion = remaining.min(width);
        tax += portion * bracket.rate_pct / Decimal::from(100);
        remaining -= portion;
    }
    round2(tax)
}

/// `overtime_tax(overtime, basic, annual, is_resident)` -> `(tax, qualifies)`
/// (spec.md §4.G).
pub fn overtime_tax(
    overtime: Decimal,
    basic: Decimal,
    annual_salary: Decimal,
    is_resident: bool,
    cfg: &OvertimeBonusTaxConfig,
) -> (Decimal, bool) {
    if overtime <= Decimal::ZERO {
        return (Decimal::ZERO, true);
    }
    if !is_resident {
        return (overtime * cfg.overtime_non_resident_rate / Decimal::from(100), true);
    }
    if annual_salary > cfg.overtime_annual_threshold {
        return (Decimal::ZERO, false);
    }
    let threshold = basic * cfg.overtime_basic_pct_threshold / Decimal::from(100);
    if overtime <= threshold {
        (overtime * cfg.overtime_rate_below / Decimal::from(100), true)
    } else {
        let tax = threshold * cfg.overtime_rate_below / Decimal::from(100)
            + (overtime - threshold) * cfg.overtime_rate_above / Decimal::from(100);
        (tax, true)
    }
}

/// `bonus_tax(bonus, annual_basic, is_resident)` -> `(tax, excess_to_paye)`
/// (spec.md §4.H).
pub fn bonus_tax(
    bonus: Decimal,
    annual_basic: Decimal,
    is_resident: bool,
    cfg: &OvertimeBonusTaxConfig,
) -> (Decimal, Decimal) {
    if bonus <= Decimal::ZERO {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    if !is_resident {
        return (bonus * cfg.bonus_non_resident_rate / Decimal::from(100), Decimal::ZERO);
    }
    let threshold = annual_basic * cfg.bonus_annual_basic_pct_threshold / Decimal::from(100);
    if bonus <= threshold {
        (bonus * cfg.bonus_flat_rate / Decimal::from(100), Decimal::ZERO)
    } else if cfg.bonus_excess_to_paye {
        (threshold * cfg.bonus_flat_rate / Decimal::from(100), bonus - threshold)
    } else {
        (bonus * cfg.bonus_flat_rate / Decimal::from(100), Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn paye_bracket_loop_matches_cumulative_for_top_bracket() {
        let brackets = crate::domain::payroll_model::statutory::ghana_2026_monthly_brackets(date(2026, 1, 1));
        // Exactly at the top of the 25% bracket: taxable income == 19896.67.
        let paye = calculate_paye(dec!(19896.67), &brackets);
        let expected = brackets[4].cumulative_tax + (dec!(19896.67) - brackets[4].min) * brackets[4].rate_pct / Decimal::from(100);
        assert_eq!(paye, round2(expected));
    }

    #[test]
    fn overtime_within_basic_threshold_uses_rate_below() {
        let cfg = OvertimeBonusTaxConfig::default();
        let (tax, qualifies) = overtime_tax(dec!(100), dec!(1000), dec!(12000), true, &cfg);
        assert!(qualifies);
        assert_eq!(tax, dec!(5));
    }

    #[test]
    fn overtime_above_annual_threshold_folds_into_paye() {
        let cfg = OvertimeBonusTaxConfig::default();
        let (tax, qualifies) = overtime_tax(dec!(100), dec!(1000), dec!(20000), true, &cfg);
        assert!(!qualifies);
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn bonus_excess_splits_to_paye() {
        let cfg = OvertimeBonusTaxConfig::default();
        let annual_basic = dec!(12000);
        let (tax, excess) = bonus_tax(dec!(3000), annual_basic, true, &cfg);
        // threshold = 12000 * 15% = 1800
        assert_eq!(tax, dec!(90.00));
        assert_eq!(excess, dec!(1200));
    }

    #[test]
    fn non_resident_bonus_is_flat_rate_with_no_excess() {
        let cfg = OvertimeBonusTaxConfig::default();
        let (tax, excess) = bonus_tax(dec!(3000), dec!(12000), false, &cfg);
        assert_eq!(tax, dec!(600.00));
        assert_eq!(excess, Decimal::ZERO);
    }
}
