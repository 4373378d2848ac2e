//! Demo seed data for `payroll-cli` (spec.md §6 "CLI surface").
//!
//! The core has no storage layer of its own (spec.md §6, "Storage contract"
//! is logical-only), so the CLI binary ships a small single-tenant,
//! in-memory roster that every subcommand runs against. This is a demo
//! harness, not part of the core's public contract.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::domain::entity::Entity;
use crate::domain::payroll_model::component::{CalcKind, ComponentCategory, ComponentType, PayComponent};
use crate::domain::payroll_model::employee::{BankAccount, EmploymentStatus, PayrollEmployee};
use crate::domain::payroll_model::employee_salary::{EmployeeSalary, EmployeeSalaryComponent};
use crate::domain::payroll_model::run::{PayrollCalendar, PayrollPeriod, PayrollRun, PayrollRunTotals, PeriodStatus, RunStatus};
use crate::domain::payroll_model::salary_structure::Grade;
use crate::payroll::rate_book::RateBook;

pub struct Demo {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub employees: Vec<PayrollEmployee>,
    pub salaries: Vec<EmployeeSalary>,
    pub salary_components: Vec<EmployeeSalaryComponent>,
    pub pay_components: HashMap<String, PayComponent>,
    pub grades: Vec<Grade>,
    pub period: PayrollPeriod,
    pub run: PayrollRun,
    pub rate_book: RateBook,
}

fn component(
    code: &str,
    name: &str,
    component_type: ComponentType,
    category: ComponentCategory,
    is_taxable: bool,
    is_prorated: bool,
) -> PayComponent {
    let tenant_id = Uuid::nil();
    PayComponent {
        entity: Entity::new(tenant_id, Utc::now()),
        code: code.to_string(),
        name: name.to_string(),
        component_type,
        category,
        calc_kind: CalcKind::Fixed,
        default_amount: None,
        default_percentage: None,
        formula: None,
        is_taxable,
        reduces_taxable: false,
        is_overtime: false,
        is_bonus: false,
        affects_ssnit: code == "BASIC",
        is_statutory: matches!(code, "PAYE" | "SSNIT_EMP" | "OVERTIME_TAX" | "BONUS_TAX" | "TIER2_EMP"),
        is_recurring: true,
        is_prorated,
        is_arrears_applicable: true,
        show_on_payslip: true,
        display_order: 0,
    }
}

/// Seeds the scenario from spec.md §8 scenario 1 (simple monthly compute):
/// basic 5000, housing 1000 (taxable), transport 200 (taxable), full
/// January 2026 (31 days), resident, no overtime/bonus.
pub fn seed() -> Demo {
    let tenant_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut pay_components = HashMap::new();
    for c in [
        component("BASIC", "Basic Salary", ComponentType::Earning, ComponentCategory::Basic, true, true),
        component("HOUSING", "Housing Allowance", ComponentType::Earning, ComponentCategory::Allowance, true, true),
        component("TRANSPORT", "Transport Allowance", ComponentType::Earning, ComponentCategory::Allowance, true, true),
    ] {
        pay_components.insert(c.code.clone(), c);
    }

    let employee_id = Uuid::new_v4();
    let employee = PayrollEmployee {
        id: employee_id,
        tenant_id,
        employee_number: "EMP-001".into(),
        full_name: "Ama Mensah".into(),
        status: EmploymentStatus::Active,
        date_of_joining: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        date_of_exit: None,
        is_resident: true,
        grade_id: None,
        salary_notch_id: None,
        bank_accounts: vec![BankAccount {
            bank_name: "GCB Bank".into(),
            branch: "Accra Main".into(),
            account_number: "1234567890".into(),
            account_name: "Ama Mensah".into(),
            is_primary: true,
        }],
    };

    let salary = EmployeeSalary {
        id: Uuid::new_v4(),
        employee_id,
        basic_salary: dec!(5000),
        salary_structure_notch_id: None,
        effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        effective_to: None,
        is_current: true,
        reason: "hire".into(),
    };

    let salary_components = vec![
        EmployeeSalaryComponent {
            id: Uuid::new_v4(),
            employee_salary_id: salary.id,
            pay_component_code: "HOUSING".into(),
            amount: dec!(1000),
            effective_from: salary.effective_from,
            effective_to: None,
        },
        EmployeeSalaryComponent {
            id: Uuid::new_v4(),
            employee_salary_id: salary.id,
            pay_component_code: "TRANSPORT".into(),
            amount: dec!(200),
            effective_from: salary.effective_from,
            effective_to: None,
        },
    ];

    let period_start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let period_end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
    let calendar = PayrollCalendar { id: Uuid::new_v4(), year: 2026, month: 1 };
    let period = PayrollPeriod {
        id: Uuid::new_v4(),
        calendar_id: calendar.id,
        name: "January 2026".into(),
        start_date: period_start,
        end_date: period_end,
        status: PeriodStatus::Open,
        payment_date: None,
        is_supplementary: false,
        parent_period_id: None,
    };

    let run = PayrollRun {
        id: Uuid::new_v4(),
        period_id: period.id,
        run_number: PayrollRun::run_number(2026, 1, 1),
        status: RunStatus::Draft,
        totals: PayrollRunTotals::default(),
        computed_by: None,
        computed_at: None,
        approved_by: None,
        approved_at: None,
        paid_at: None,
        payment_reference: None,
        is_deleted: false,
    };

    Demo {
        tenant_id,
        user_id,
        employees: vec![employee],
        salaries: vec![salary],
        salary_components,
        pay_components,
        grades: Vec::new(),
        period,
        run,
        rate_book: RateBook::seed_ghana_2026(period_start),
    }
}
