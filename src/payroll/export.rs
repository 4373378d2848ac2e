//! Payroll export surface (spec.md §6): the Bank Advice file and the Payslip
//! YTD aggregates — the two pieces of "generation" spec.md §1 keeps in core
//! scope while explicitly excluding the PDF/XLSX *layout templating* that
//! consumes them.
//!
//! Grounded on `export_service.py::PayrollExportService.generate_bank_file`
//! (bank grouping, per-bank CSV, `safe_bank_name` filename) and the YTD
//! `aggregate(...)` block inside `_generate_payslip_pdf` (lines 373-399):
//! the same COMPUTED/APPROVED/PAID-in-year filter, the same PF/loan detail
//! split. Column header, trailer line, and filename format follow spec.md
//! §6 verbatim rather than the original's (different) header — this core
//! has no query layer (see `payroll::audit`'s header comment for the same
//! stance), so both functions take already-filtered slices from the caller.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::payroll_model::component::{ComponentCategory, ComponentType, PayComponent};
use crate::domain::payroll_model::run::{ItemStatus, PayrollItem, PayrollItemDetail, PayrollRun, RunStatus};
use crate::payroll::error::{PayrollError, PayrollResult};

/// One bank's payment advice, ready to write to disk (spec.md §6 "Bank
/// Advice file").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankAdviceFile {
    pub bank_name: String,
    pub file_name: String,
    pub content: String,
    pub total_records: usize,
    pub total_amount: Decimal,
}

/// `generate_bank_advice(run, items, generated_on)` (spec.md §6): one CSV
/// per bank, grouped from `run`'s APPROVED/PAID Items that carry a bank
/// snapshot, ordered by bank name then employee number (grounded on
/// `export_service.py`'s `order_by('bank_name', 'employee__employee_number')`).
///
/// Precondition mirrors the original's `generate_bank_file`: the run itself
/// must be APPROVED or PAID, else this is a `Validation` error, not a
/// silent empty result.
pub fn generate_bank_advice(
    run: &PayrollRun,
    items: &[PayrollItem],
    generated_on: NaiveDate,
) -> PayrollResult<Vec<BankAdviceFile>> {
    if !matches!(run.status, RunStatus::Approved | RunStatus::Paid) {
        return Err(PayrollError::Validation(format!(
            "cannot generate bank advice for payroll run in status {:?}",
            run.status
        )));
    }

    let mut eligible: Vec<&PayrollItem> = items
        .iter()
        .filter(|i| matches!(i.status, ItemStatus::Approved | ItemStatus::Paid) && i.bank_snapshot.is_some())
        .collect();
    eligible.sort_by(|a, b| {
        let bank_a = &a.bank_snapshot.as_ref().unwrap().bank_name;
        let bank_b = &b.bank_snapshot.as_ref().unwrap().bank_name;
        bank_a.cmp(bank_b).then_with(|| a.employee_number.cmp(&b.employee_number))
    });

    let mut groups: Vec<(String, Vec<&PayrollItem>)> = Vec::new();
    for item in eligible {
        let bank_name = item.bank_snapshot.as_ref().unwrap().bank_name.clone();
        match groups.last_mut() {
            Some((name, bucket)) if *name == bank_name => bucket.push(item),
            _ => groups.push((bank_name, vec![item])),
        }
    }

    let mut files = Vec::with_capacity(groups.len());
    for (bank_name, bank_items) in groups {
        let mut content = String::new();
        content.push_str("Bank, Branch, Account Number, Account Name, Employee Number, Net Salary, Reference\n");

        let mut total_amount = Decimal::ZERO;
        for item in &bank_items {
            let snapshot = item.bank_snapshot.as_ref().unwrap();
            let reference = format!("{}-{}", run.run_number, item.employee_number);
            content.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                snapshot.bank_name,
                snapshot.branch,
                snapshot.account_number,
                snapshot.account_name,
                item.employee_number,
                item.net_salary,
                reference,
            ));
            total_amount += item.net_salary;
        }
        content.push_str(&format!("Total Records:, {}, Total Amount:, {}\n", bank_items.len(), total_amount));

        let bank_safe = bank_name.replace(' ', "_").replace('/', "_");
        let file_name = format!("{}_{}_{}.csv", run.run_number, bank_safe, generated_on.format("%Y%m%d"));

        files.push(BankAdviceFile {
            bank_name,
            file_name,
            content,
            total_records: bank_items.len(),
            total_amount,
        });
    }

    Ok(files)
}

/// `{earnings, ssnit_employee, paye, net, provident_fund_employee, loans}`
/// (spec.md §6 "Payslip"): summed across `items` and `details`, which the
/// caller has already filtered to one employee's COMPUTED/APPROVED/PAID
/// Items in the current calendar year (the join this core has no query
/// layer to perform itself).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct YtdAggregates {
    pub earnings: Decimal,
    pub ssnit_employee: Decimal,
    pub paye: Decimal,
    pub net: Decimal,
    pub provident_fund_employee: Decimal,
    pub loans: Decimal,
}

/// Grounded on `export_service.py`'s `ytd_items` aggregate plus the
/// separate PF/loan detail-row aggregates (lines 373-399): PF and loans are
/// matched here by `ComponentCategory::Fund`/`Loan` rather than the
/// original's `icontains` name match, since this core's catalogue already
/// carries a typed category for exactly this purpose.
pub fn ytd_aggregates(
    items: &[&PayrollItem],
    details: &[&PayrollItemDetail],
    pay_components: &HashMap<String, PayComponent>,
) -> YtdAggregates {
    let mut agg = YtdAggregates::default();
    let mut qualifying_ids: HashSet<uuid::Uuid> = HashSet::new();

    for item in items {
        if !matches!(item.status, ItemStatus::Computed | ItemStatus::Approved | ItemStatus::Paid) {
            continue;
        }
        agg.earnings += item.gross_earnings;
        agg.ssnit_employee += item.ssnit_employee;
        agg.paye += item.paye;
        agg.net += item.net_salary;
        qualifying_ids.insert(item.id);
    }

    for detail in details {
        if !qualifying_ids.contains(&detail.item_id) {
            continue;
        }
        let Some(component) = pay_components.get(&detail.pay_component_code) else { continue };
        if component.component_type != ComponentType::Deduction {
            continue;
        }
        match component.category {
            ComponentCategory::Fund => agg.provident_fund_employee += detail.amount,
            ComponentCategory::Loan => agg.loans += detail.amount,
            _ => {}
        }
    }

    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payroll_model::component::CalcKind;
    use crate::domain::payroll_model::run::BankAccountSnapshot;
    use crate::domain::entity::Entity;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn item(employee_number: &str, net: Decimal, status: ItemStatus, bank_name: Option<&str>) -> PayrollItem {
        PayrollItem {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            employee_number: employee_number.to_string(),
            basic_salary: net,
            gross_earnings: net,
            total_deductions: Decimal::ZERO,
            net_salary: net,
            taxable_income: Decimal::ZERO,
            paye: Decimal::ZERO,
            overtime_tax: Decimal::ZERO,
            bonus_tax: Decimal::ZERO,
            total_overtime: Decimal::ZERO,
            total_bonus: Decimal::ZERO,
            ssnit_employee: Decimal::ZERO,
            ssnit_employer: Decimal::ZERO,
            tier2_employer: Decimal::ZERO,
            employer_cost: net,
            proration_factor: dec!(1),
            days_payable: 30,
            total_days: 30,
            bank_snapshot: bank_name.map(|b| BankAccountSnapshot {
                bank_name: b.to_string(),
                branch: "Accra Main".to_string(),
                account_number: "0001".to_string(),
                account_name: employee_number.to_string(),
            }),
            status,
            error_message: None,
        }
    }

    fn run(status: RunStatus) -> PayrollRun {
        PayrollRun {
            id: Uuid::new_v4(),
            period_id: Uuid::new_v4(),
            run_number: "PR-202601-001".to_string(),
            status,
            totals: Default::default(),
            computed_by: None,
            computed_at: None,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            payment_reference: None,
            is_deleted: false,
        }
    }

    #[test]
    fn rejects_bank_advice_for_a_run_not_yet_approved() {
        let r = run(RunStatus::Computed);
        let err = generate_bank_advice(&r, &[], NaiveDate::from_ymd_opt(2026, 2, 5).unwrap()).unwrap_err();
        assert!(matches!(err, PayrollError::Validation(_)));
    }

    #[test]
    fn groups_items_by_bank_and_emits_header_rows_and_trailer() {
        let r = run(RunStatus::Paid);
        let items = vec![
            item("EMP-002", dec!(1500.00), ItemStatus::Paid, Some("GCB Bank")),
            item("EMP-001", dec!(2500.50), ItemStatus::Paid, Some("GCB Bank")),
            item("EMP-003", dec!(900.00), ItemStatus::Paid, Some("Ecobank")),
            item("EMP-004", dec!(400.00), ItemStatus::Computed, Some("GCB Bank")), // not APPROVED/PAID: excluded
            item("EMP-005", dec!(400.00), ItemStatus::Paid, None), // no bank snapshot: excluded
        ];

        let files = generate_bank_advice(&r, &items, NaiveDate::from_ymd_opt(2026, 2, 5).unwrap()).unwrap();
        assert_eq!(files.len(), 2);

        let ecobank = files.iter().find(|f| f.bank_name == "Ecobank").unwrap();
        assert_eq!(ecobank.total_records, 1);
        assert_eq!(ecobank.total_amount, dec!(900.00));
        assert_eq!(ecobank.file_name, "PR-202601-001_Ecobank_20260205.csv");
        assert!(ecobank.content.starts_with("Bank, Branch, Account Number, Account Name, Employee Number, Net Salary, Reference\n"));
        assert!(ecobank.content.contains("PR-202601-001-EMP-003"));
        assert!(ecobank.content.contains("Total Records:, 1, Total Amount:, 900.00"));

        let gcb = files.iter().find(|f| f.bank_name == "GCB Bank").unwrap();
        assert_eq!(gcb.total_records, 2);
        assert_eq!(gcb.total_amount, dec!(4000.50));
        // Ordered by employee number within the bank: EMP-001 before EMP-002.
        let emp1_pos = gcb.content.find("EMP-001").unwrap();
        let emp2_pos = gcb.content.find("EMP-002").unwrap();
        assert!(emp1_pos < emp2_pos);
    }

    #[test]
    fn bank_name_with_space_and_slash_is_sanitised_for_the_filename() {
        let r = run(RunStatus::Approved);
        let items = vec![item("EMP-001", dec!(100.00), ItemStatus::Approved, Some("Standard Chartered/Ghana"))];
        let files = generate_bank_advice(&r, &items, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()).unwrap();
        assert_eq!(files[0].file_name, "PR-202601-001_Standard_Chartered_Ghana_20260301.csv");
    }

    fn component(code: &str, component_type: ComponentType, category: ComponentCategory) -> PayComponent {
        PayComponent {
            entity: Entity::new(Uuid::nil(), Utc::now()),
            code: code.to_string(),
            name: code.to_string(),
            component_type,
            category,
            calc_kind: CalcKind::Fixed,
            default_amount: None,
            default_percentage: None,
            formula: None,
            is_taxable: false,
            reduces_taxable: category == ComponentCategory::Fund || category == ComponentCategory::Loan,
            is_overtime: false,
            is_bonus: false,
            affects_ssnit: false,
            is_statutory: false,
            is_recurring: true,
            is_prorated: false,
            is_arrears_applicable: false,
            show_on_payslip: true,
            display_order: 0,
        }
    }

    #[test]
    fn ytd_sums_only_qualifying_items_and_splits_pf_and_loans_from_details() {
        let mut pay_components = HashMap::new();
        pay_components.insert("PF_EMP".to_string(), component("PF_EMP", ComponentType::Deduction, ComponentCategory::Fund));
        pay_components.insert("LOAN_STAFF".to_string(), component("LOAN_STAFF", ComponentType::Deduction, ComponentCategory::Loan));
        pay_components.insert("OTHER_DED".to_string(), component("OTHER_DED", ComponentType::Deduction, ComponentCategory::Other));

        let jan = item("EMP-001", dec!(4725.00), ItemStatus::Paid, None);
        let feb = item("EMP-001", dec!(4725.00), ItemStatus::Approved, None);
        let draft = item("EMP-001", dec!(999.00), ItemStatus::Pending, None); // excluded: not yet computed

        let items: Vec<&PayrollItem> = vec![&jan, &feb, &draft];

        let pf_jan = PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id: jan.id,
            pay_component_code: "PF_EMP".to_string(),
            amount: dec!(250.00),
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: 1,
        };
        let loan_feb = PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id: feb.id,
            pay_component_code: "LOAN_STAFF".to_string(),
            amount: dec!(300.00),
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: 2,
        };
        let other_draft = PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id: draft.id,
            pay_component_code: "OTHER_DED".to_string(),
            amount: dec!(50.00),
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: 3,
        };
        let details: Vec<&PayrollItemDetail> = vec![&pf_jan, &loan_feb, &other_draft];

        let agg = ytd_aggregates(&items, &details, &pay_components);

        assert_eq!(agg.earnings, dec!(9450.00));
        assert_eq!(agg.net, dec!(9450.00));
        assert_eq!(agg.provident_fund_employee, dec!(250.00));
        assert_eq!(agg.loans, dec!(300.00));
    }
}
