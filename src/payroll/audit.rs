//! Payroll Audit (§8 supplement): deterministic, read-only consistency
//! checks run against a computed `PayrollRun` — arithmetic identities,
//! statutory spot-checks, data quality, and outlier detection.
//!
//! Grounded on `payroll/audit_service.py::PayrollAuditService`. The
//! original dispatches seven checks through Django aggregates; this core
//! has no query layer, so every check takes the already-loaded item/detail
//! slices directly and the aggregation happens in plain Rust.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::payroll_model::component::{ComponentType, PayComponent};
use crate::domain::payroll_model::employee::PayrollEmployee;
use crate::domain::payroll_model::run::{ItemStatus, PayrollItem, PayrollItemDetail, PayrollRun};
use crate::domain::payroll_model::statutory::SsnitTier;
use crate::payroll::computer;
use crate::payroll::rate_book::RateBook;

fn tolerance() -> Decimal {
    dec!(0.02)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditFinding {
    pub check_name: String,
    pub severity: Option<Severity>,
    pub message: String,
    pub employee_number: String,
    pub employee_name: String,
    pub expected: String,
    pub actual: String,
    pub difference: String,
}

impl AuditFinding {
    fn new(check_name: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.to_string(),
            severity: Some(severity),
            message: message.into(),
            ..Default::default()
        }
    }

    fn for_employee(mut self, employee_number: &str, employee_name: &str) -> Self {
        self.employee_number = employee_number.to_string();
        self.employee_name = employee_name.to_string();
        self
    }

    fn with_expected_actual(mut self, expected: Decimal, actual: Decimal) -> Self {
        self.expected = expected.to_string();
        self.actual = actual.to_string();
        self.difference = (actual - expected).to_string();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_findings: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub checks_passed: u32,
    pub total_checks: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditReport {
    pub run_number: String,
    pub period_name: String,
    pub total_employees: i32,
    pub findings: Vec<AuditFinding>,
    pub checks_passed: u32,
    pub total_checks: u32,
}

impl AuditReport {
    pub fn summary(&self) -> AuditSummary {
        let errors = self.findings.iter().filter(|f| f.severity == Some(Severity::Error)).count();
        let warnings = self.findings.iter().filter(|f| f.severity == Some(Severity::Warning)).count();
        let info = self.findings.iter().filter(|f| f.severity == Some(Severity::Info)).count();
        AuditSummary {
            total_findings: self.findings.len(),
            errors,
            warnings,
            info,
            checks_passed: self.checks_passed,
            total_checks: self.total_checks,
        }
    }
}

/// The read-only slices `run_audit` needs — the original resolves these
/// via `payroll_run.items.select_related(...)`; here they are passed in.
pub struct AuditInputs<'a> {
    pub run: &'a PayrollRun,
    pub period_name: &'a str,
    pub items: &'a [PayrollItem],
    pub details: &'a [PayrollItemDetail],
    pub employees: &'a HashMap<uuid::Uuid, &'a PayrollEmployee>,
    pub pay_components: &'a HashMap<String, PayComponent>,
    pub rate_book: &'a RateBook,
}

fn employee_label(inputs: &AuditInputs, employee_id: uuid::Uuid) -> (String, String) {
    inputs
        .employees
        .get(&employee_id)
        .map(|e| (e.employee_number.clone(), e.full_name.clone()))
        .unwrap_or_default()
}

/// Runs every check in turn, mirroring `run_audit`'s try/except-per-check
/// so one failing check does not abort the rest (spec.md §8 supplement).
pub fn run_audit(inputs: &AuditInputs) -> AuditReport {
    let mut report = AuditReport {
        run_number: inputs.run.run_number.clone(),
        period_name: inputs.period_name.to_string(),
        total_employees: inputs.run.totals.total_employees,
        findings: Vec::new(),
        checks_passed: 0,
        total_checks: 0,
    };

    let checks: Vec<(&str, fn(&AuditInputs) -> Vec<AuditFinding>)> = vec![
        ("check_item_net_equation", check_item_net_equation),
        ("check_run_totals_vs_items", check_run_totals_vs_items),
        ("check_detail_sums_vs_items", check_detail_sums_vs_items),
        ("check_ssnit_rates", check_ssnit_rates),
        ("check_paye_calculation", check_paye_calculation),
        ("check_data_quality", check_data_quality),
        ("check_anomalies", check_anomalies),
    ];

    for (name, check) in checks {
        report.total_checks += 1;
        let findings = check(inputs);
        if findings.is_empty() {
            report.checks_passed += 1;
        } else {
            report.findings.extend(findings);
        }
        let _ = name;
    }

    report
}

/// P1: `net_salary == gross_earnings - total_deductions` for every item.
fn check_item_net_equation(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    for item in inputs.items {
        let expected_net = item.gross_earnings - item.total_deductions;
        if (item.net_salary - expected_net).abs() > tolerance() {
            let (number, name) = employee_label(inputs, item.employee_id);
            findings.push(
                AuditFinding::new("net_equation", Severity::Error, "Net salary does not equal gross - deductions")
                    .for_employee(&number, &name)
                    .with_expected_actual(expected_net, item.net_salary),
            );
        }
    }
    findings
}

/// P2: run-level aggregates equal the sum over items.
fn check_run_totals_vs_items(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let sum = |f: fn(&PayrollItem) -> Decimal| inputs.items.iter().map(f).sum::<Decimal>();

    let checks: [(&str, Decimal, Decimal); 6] = [
        ("total_gross", inputs.run.totals.total_gross, sum(|i| i.gross_earnings)),
        ("total_deductions", inputs.run.totals.total_deductions, sum(|i| i.total_deductions)),
        ("total_net", inputs.run.totals.total_net, sum(|i| i.net_salary)),
        ("total_paye", inputs.run.totals.total_paye, sum(|i| i.paye)),
        ("total_ssnit_employee", inputs.run.totals.total_ssnit_employee, sum(|i| i.ssnit_employee)),
        ("total_ssnit_employer", inputs.run.totals.total_ssnit_employer, sum(|i| i.ssnit_employer)),
    ];

    for (field_name, run_value, items_sum) in checks {
        if (run_value - items_sum).abs() > tolerance() {
            findings.push(
                AuditFinding::new("run_totals", Severity::Error, format!("Run {field_name} does not match sum of items"))
                    .with_expected_actual(items_sum, run_value),
            );
        }
    }

    let item_count = inputs.items.len() as i32;
    if inputs.run.totals.total_employees != item_count {
        findings.push(
            AuditFinding::new("run_totals", Severity::Error, "Run employee count does not match item count")
                .with_expected_actual(Decimal::from(item_count), Decimal::from(inputs.run.totals.total_employees)),
        );
    }

    findings
}

/// P3: sum of EARNING details per item approximates `gross_earnings`.
fn check_detail_sums_vs_items(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let mut earning_sums: HashMap<uuid::Uuid, Decimal> = HashMap::new();
    for detail in inputs.details {
        let is_earning = inputs
            .pay_components
            .get(&detail.pay_component_code)
            .map(|c| c.component_type == ComponentType::Earning)
            .unwrap_or(false);
        if is_earning {
            *earning_sums.entry(detail.item_id).or_insert(Decimal::ZERO) += detail.amount;
        }
    }

    let mut findings = Vec::new();
    for item in inputs.items {
        let detail_sum = earning_sums.get(&item.id).copied().unwrap_or(Decimal::ZERO);
        if (item.gross_earnings - detail_sum).abs() > tolerance() {
            let (number, name) = employee_label(inputs, item.employee_id);
            findings.push(
                AuditFinding::new("detail_sums", Severity::Warning, "Sum of earning details does not match gross_earnings")
                    .for_employee(&number, &name)
                    .with_expected_actual(item.gross_earnings, detail_sum),
            );
        }
    }
    findings
}

/// Recomputes SSNIT employee/Tier-1-employer contributions from the basic
/// salary on file and compares against the posted item.
fn check_ssnit_rates(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let Ok(rates) = inputs.rate_book.active_ssnit(inputs.run.computed_at.map(|d| d.date_naive()).unwrap_or_default()) else {
        return Vec::new();
    };
    let Some(tier1) = rates.get(&SsnitTier::Tier1) else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for item in inputs.items {
        if item.status == ItemStatus::Error {
            continue;
        }
        let basis = item.basic_salary;
        let expected_ee = basis * tier1.employee_pct / Decimal::from(100);
        let expected_er = basis * tier1.employer_pct / Decimal::from(100);
        let (number, name) = employee_label(inputs, item.employee_id);

        if (item.ssnit_employee - expected_ee).abs() > tolerance() {
            findings.push(
                AuditFinding::new("ssnit_rate", Severity::Error, "SSNIT employee contribution mismatch")
                    .for_employee(&number, &name)
                    .with_expected_actual(expected_ee, item.ssnit_employee),
            );
        }
        if (item.ssnit_employer - expected_er).abs() > tolerance() {
            findings.push(
                AuditFinding::new("ssnit_rate", Severity::Error, "SSNIT employer Tier 1 contribution mismatch")
                    .for_employee(&number, &name)
                    .with_expected_actual(expected_er, item.ssnit_employer),
            );
        }
    }
    findings
}

/// P9: spot-checks PAYE for the 10 highest taxable incomes; recomputed PAYE
/// must be monotonic non-decreasing in taxable income across the whole run,
/// and must match the posted value within tolerance.
fn check_paye_calculation(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let Ok(brackets) = inputs.rate_book.active_brackets(inputs.run.computed_at.map(|d| d.date_naive()).unwrap_or_default()) else {
        return Vec::new();
    };

    let mut candidates: Vec<&PayrollItem> = inputs.items.iter().filter(|i| i.status != ItemStatus::Error).collect();
    candidates.sort_by(|a, b| b.taxable_income.cmp(&a.taxable_income));
    candidates.truncate(10);

    let mut findings = Vec::new();
    let mut last_taxable = None;
    let mut last_paye = None;
    for item in &candidates {
        if item.taxable_income <= Decimal::ZERO {
            continue;
        }
        let expected_paye = computer::calculate_paye(item.taxable_income, &brackets);
        if (item.paye - expected_paye).abs() > tolerance() {
            let (number, name) = employee_label(inputs, item.employee_id);
            findings.push(
                AuditFinding::new("paye_calculation", Severity::Error, "PAYE calculation mismatch")
                    .for_employee(&number, &name)
                    .with_expected_actual(expected_paye, item.paye),
            );
        }

        if let (Some(lt), Some(lp)) = (last_taxable, last_paye) {
            if item.taxable_income < lt && expected_paye > lp {
                let (number, name) = employee_label(inputs, item.employee_id);
                findings.push(
                    AuditFinding::new("paye_calculation", Severity::Error, "PAYE is not monotonic in taxable income")
                        .for_employee(&number, &name),
                );
            }
        }
        last_taxable = Some(item.taxable_income);
        last_paye = Some(expected_paye);
    }
    findings
}

/// Flags ERROR-status items, missing bank details, non-positive net pay,
/// and negative deductions.
fn check_data_quality(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    for item in inputs.items {
        let (number, name) = employee_label(inputs, item.employee_id);

        if item.status == ItemStatus::Error {
            findings.push(
                AuditFinding::new(
                    "data_quality",
                    Severity::Error,
                    format!("Payroll item has ERROR status: {}", item.error_message.as_deref().unwrap_or("no details")),
                )
                .for_employee(&number, &name),
            );
        }

        if item.bank_snapshot.as_ref().map(|b| b.account_number.is_empty()).unwrap_or(true) {
            findings.push(
                AuditFinding::new("data_quality", Severity::Warning, "Missing bank account number").for_employee(&number, &name),
            );
        }

        if item.status != ItemStatus::Error && item.net_salary <= Decimal::ZERO {
            let mut f = AuditFinding::new("data_quality", Severity::Warning, "Zero or negative net salary").for_employee(&number, &name);
            f.actual = item.net_salary.to_string();
            findings.push(f);
        }

        if item.total_deductions < Decimal::ZERO {
            let mut f = AuditFinding::new("data_quality", Severity::Error, "Negative total deductions").for_employee(&number, &name);
            f.actual = item.total_deductions.to_string();
            findings.push(f);
        }
    }
    findings
}

/// Flags net-salary outliers (>5x the run's median) and prorated employees,
/// both informational rather than defects.
fn check_anomalies(inputs: &AuditInputs) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    let valid: Vec<&PayrollItem> = inputs.items.iter().filter(|i| i.status != ItemStatus::Error).collect();
    if valid.is_empty() {
        return findings;
    }

    let mut net_salaries: Vec<Decimal> = valid.iter().map(|i| i.net_salary).filter(|n| *n > Decimal::ZERO).collect();
    if net_salaries.len() >= 3 {
        net_salaries.sort();
        let mid = net_salaries.len() / 2;
        let median = if net_salaries.len() % 2 == 0 {
            (net_salaries[mid - 1] + net_salaries[mid]) / Decimal::from(2)
        } else {
            net_salaries[mid]
        };
        let threshold = median * Decimal::from(5);

        for item in &valid {
            if item.net_salary > threshold {
                let (number, name) = employee_label(inputs, item.employee_id);
                let mut f = AuditFinding::new("anomaly", Severity::Info, format!("Net salary is >5x the median ({median:.2} GHS)"))
                    .for_employee(&number, &name);
                f.actual = item.net_salary.to_string();
                findings.push(f);
            }
        }
    }

    for item in &valid {
        if item.proration_factor < Decimal::ONE {
            let (number, name) = employee_label(inputs, item.employee_id);
            let mut f =
                AuditFinding::new("anomaly", Severity::Info, format!("Prorated salary (factor: {})", item.proration_factor)).for_employee(&number, &name);
            f.actual = item.net_salary.to_string();
            findings.push(f);
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::domain::payroll_model::run::{BankAccountSnapshot, PayrollRunTotals, RunStatus};

    fn sample_item(employee_id: Uuid, net_salary: Decimal, gross: Decimal, deductions: Decimal) -> PayrollItem {
        PayrollItem {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            employee_id,
            employee_number: "EMP001".to_string(),
            basic_salary: dec!(3000),
            gross_earnings: gross,
            total_deductions: deductions,
            net_salary,
            taxable_income: dec!(3000),
            paye: dec!(200),
            overtime_tax: Decimal::ZERO,
            bonus_tax: Decimal::ZERO,
            total_overtime: Decimal::ZERO,
            total_bonus: Decimal::ZERO,
            ssnit_employee: dec!(165),
            ssnit_employer: dec!(390),
            tier2_employer: Decimal::ZERO,
            employer_cost: dec!(3390),
            proration_factor: Decimal::ONE,
            days_payable: 30,
            total_days: 30,
            bank_snapshot: Some(BankAccountSnapshot {
                bank_name: "GCB".to_string(),
                branch: "Accra".to_string(),
                account_number: "1234".to_string(),
                account_name: "Jane Doe".to_string(),
            }),
            status: ItemStatus::Computed,
            error_message: None,
        }
    }

    fn sample_run(totals: PayrollRunTotals) -> PayrollRun {
        PayrollRun {
            id: Uuid::new_v4(),
            period_id: Uuid::new_v4(),
            run_number: "PR-202601-001".to_string(),
            status: RunStatus::Computed,
            totals,
            computed_by: None,
            computed_at: Some(chrono::DateTime::from_naive_utc_and_offset(
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                chrono::Utc,
            )),
            approved_by: None,
            approved_at: None,
            paid_at: None,
            payment_reference: None,
            is_deleted: false,
        }
    }

    #[test]
    fn net_equation_flags_mismatch() {
        let employee_id = Uuid::new_v4();
        let item = sample_item(employee_id, dec!(2635) + dec!(1), dec!(3000), dec!(365));
        let employees = HashMap::new();
        let pay_components = HashMap::new();
        let rate_book = RateBook::seed_ghana_2026(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let totals = PayrollRunTotals::default();
        let run = sample_run(totals);

        let inputs = AuditInputs {
            run: &run,
            period_name: "January 2026",
            items: &[item],
            details: &[],
            employees: &employees,
            pay_components: &pay_components,
            rate_book: &rate_book,
        };

        let findings = check_item_net_equation(&inputs);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check_name, "net_equation");
    }

    #[test]
    fn net_equation_passes_when_consistent() {
        let employee_id = Uuid::new_v4();
        let item = sample_item(employee_id, dec!(2635), dec!(3000), dec!(365));
        let employees = HashMap::new();
        let pay_components = HashMap::new();
        let rate_book = RateBook::seed_ghana_2026(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let run = sample_run(PayrollRunTotals::default());

        let inputs = AuditInputs {
            run: &run,
            period_name: "January 2026",
            items: &[item],
            details: &[],
            employees: &employees,
            pay_components: &pay_components,
            rate_book: &rate_book,
        };

        assert!(check_item_net_equation(&inputs).is_empty());
    }

    #[test]
    fn run_totals_mismatch_is_flagged() {
        let employee_id = Uuid::new_v4();
        let item = sample_item(employee_id, dec!(2635), dec!(3000), dec!(365));
        let mut totals = PayrollRunTotals::default();
        totals.total_gross = dec!(9999);
        totals.total_employees = 1;
        let run = sample_run(totals);
        let employees = HashMap::new();
        let pay_components = HashMap::new();
        let rate_book = RateBook::seed_ghana_2026(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let inputs = AuditInputs {
            run: &run,
            period_name: "January 2026",
            items: &[item],
            details: &[],
            employees: &employees,
            pay_components: &pay_components,
            rate_book: &rate_book,
        };

        let findings = check_run_totals_vs_items(&inputs);
        assert!(findings.iter().any(|f| f.message.contains("total_gross")));
    }

    #[test]
    fn data_quality_flags_missing_bank_details() {
        let employee_id = Uuid::new_v4();
        let mut item = sample_item(employee_id, dec!(2635), dec!(3000), dec!(365));
        item.bank_snapshot = None;
        let run = sample_run(PayrollRunTotals::default());
        let employees = HashMap::new();
        let pay_components = HashMap::new();
        let rate_book = RateBook::seed_ghana_2026(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let inputs = AuditInputs {
            run: &run,
            period_name: "January 2026",
            items: &[item],
            details: &[],
            employees: &employees,
            pay_components: &pay_components,
            rate_book: &rate_book,
        };

        let findings = check_data_quality(&inputs);
        assert!(findings.iter().any(|f| f.message.contains("Missing bank account number")));
    }
}
