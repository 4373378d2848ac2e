//! `payroll-cli` — the CLI surface spec.md §6 describes as optional: thin
//! commands over the payroll core's lifecycle/compute/backpay/import
//! operations. Exit code 0 on success; non-zero on `IllegalTransition` or
//! validation failure; stderr carries a single JSON error object.
//!
//! The core has no storage layer of its own (spec.md §6 scopes persistence
//! schema out), so every invocation seeds the small single-tenant roster in
//! `fixtures` and drives the real engine end to end within one process —
//! there is nothing else for a stateless demo binary to read state back
//! from between commands.

mod fixtures;

use std::collections::HashMap;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use sase_payroll_core::domain::payroll_model::run::{PayrollItem, PayrollItemDetail};
use sase_payroll_core::import_pipeline::{
    analyse, creators, interfaces::{EntityType, ImportContext, Row},
    preview, registry::EntityCreatorRegistry, AiColumnMapper, ImportExecutor,
};
use sase_payroll_core::payroll::backpay::{self, PeriodFacts};
use sase_payroll_core::payroll::{error::PayrollError, lifecycle, orchestrator::{ComputeContext, Orchestrator}};
use serde_json::json;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "payroll-cli", about = "Ghana payroll core CLI surface (spec.md §6)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// compute <run_id>
    Compute { run_id: Uuid },
    /// approve <run_id>
    Approve { run_id: Uuid },
    /// pay <run_id>
    Pay { run_id: Uuid },
    /// reopen <period_id> --force --reason <reason>
    Reopen {
        period_id: Uuid,
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// backpay preview <employee_number> <from> <to>
    Backpay {
        #[command(subcommand)]
        action: BackpayAction,
    },
    /// import execute <csv_path>
    Import {
        #[command(subcommand)]
        action: ImportAction,
    },
}

#[derive(Subcommand)]
enum BackpayAction {
    Preview { employee_number: String, from: NaiveDate, to: NaiveDate },
}

#[derive(Subcommand)]
enum ImportAction {
    Execute {
        csv_path: std::path::PathBuf,
        #[arg(long, value_enum)]
        entity_type: Option<CliEntityType>,
        #[arg(long)]
        all_or_nothing: bool,
        /// AI column-mapper HTTP endpoint (falls back to fuzzy matching on
        /// any failure, including an unreachable default).
        #[arg(long, env = "AI_COLUMN_MAPPER_ENDPOINT", default_value = "http://127.0.0.1:0/map-columns")]
        ai_endpoint: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliEntityType {
    Employee,
    EmployeeTransaction,
    PayComponent,
    Bank,
    BankAccount,
}

impl From<CliEntityType> for EntityType {
    fn from(v: CliEntityType) -> Self {
        match v {
            CliEntityType::Employee => EntityType::Employee,
            CliEntityType::EmployeeTransaction => EntityType::EmployeeTransaction,
            CliEntityType::PayComponent => EntityType::PayComponent,
            CliEntityType::Bank => EntityType::Bank,
            CliEntityType::BankAccount => EntityType::BankAccount,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", json!({ "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<serde_json::Value> {
    match command {
        Command::Compute { run_id } => cmd_compute(run_id).await,
        Command::Approve { run_id } => cmd_approve(run_id).await,
        Command::Pay { run_id } => cmd_pay(run_id).await,
        Command::Reopen { period_id, force, reason } => cmd_reopen(period_id, force, &reason),
        Command::Backpay { action: BackpayAction::Preview { employee_number, from, to } } => {
            cmd_backpay_preview(&employee_number, from, to)
        }
        Command::Import { action: ImportAction::Execute { csv_path, entity_type, all_or_nothing, ai_endpoint } } => {
            cmd_import_execute(&csv_path, entity_type.map(Into::into), all_or_nothing, ai_endpoint).await
        }
    }
}

async fn cmd_compute(run_id: Uuid) -> anyhow::Result<serde_json::Value> {
    let mut demo = fixtures::seed();
    demo.run.id = run_id;
    let outcome = do_compute(&demo).await?;
    demo.run = outcome.run;
    Ok(json!({
        "run_id": demo.run.id,
        "run_number": demo.run.run_number,
        "status": format!("{:?}", demo.run.status),
        "items": outcome.items.len(),
        "totals": demo.run.totals,
    }))
}

async fn cmd_approve(run_id: Uuid) -> anyhow::Result<serde_json::Value> {
    let mut demo = fixtures::seed();
    demo.run.id = run_id;
    let outcome = do_compute(&demo).await?;
    demo.run = outcome.run;
    let mut items = outcome.items;
    lifecycle::approve(&mut demo.run, &mut items, &mut demo.period, demo.user_id, Utc::now())
        .map_err(to_anyhow)?;
    Ok(json!({
        "run_id": demo.run.id,
        "status": format!("{:?}", demo.run.status),
        "period_status": format!("{:?}", demo.period.status),
        "approved_items": items.len(),
    }))
}

async fn cmd_pay(run_id: Uuid) -> anyhow::Result<serde_json::Value> {
    let mut demo = fixtures::seed();
    demo.run.id = run_id;
    let outcome = do_compute(&demo).await?;
    demo.run = outcome.run;
    let mut items = outcome.items;
    lifecycle::approve(&mut demo.run, &mut items, &mut demo.period, demo.user_id, Utc::now())
        .map_err(to_anyhow)?;
    let reference = format!("{}-PAY", demo.run.run_number);
    lifecycle::process_payment(&mut demo.run, &mut items, &mut demo.period, reference.clone(), Utc::now())
        .map_err(to_anyhow)?;
    Ok(json!({
        "run_id": demo.run.id,
        "status": format!("{:?}", demo.run.status),
        "period_status": format!("{:?}", demo.period.status),
        "payment_reference": reference,
        "paid_items": items.len(),
    }))
}

fn cmd_reopen(period_id: Uuid, force: bool, reason: &str) -> anyhow::Result<serde_json::Value> {
    let mut demo = fixtures::seed();
    demo.period.id = period_id;
    // Bring the period to PAID first, matching the "reopen a paid period"
    // scenario lifecycle.rs actually guards against.
    demo.period.status = sase_payroll_core::domain::payroll_model::run::PeriodStatus::Paid;
    demo.run.status = sase_payroll_core::domain::payroll_model::run::RunStatus::Paid;
    let mut runs = vec![demo.run];
    let outcome = lifecycle::reopen(&mut demo.period, &mut runs, force, reason).map_err(to_anyhow)?;
    Ok(json!({
        "period_id": demo.period.id,
        "previous_status": format!("{:?}", outcome.previous_status),
        "status": format!("{:?}", demo.period.status),
        "runs_reset": outcome.runs_reset,
    }))
}

fn cmd_backpay_preview(employee_number: &str, from: NaiveDate, to: NaiveDate) -> anyhow::Result<serde_json::Value> {
    let demo = fixtures::seed();
    let employee = demo
        .employees
        .iter()
        .find(|e| e.employee_number == employee_number)
        .ok_or_else(|| anyhow::anyhow!(PayrollError::NotFound { entity: "employee", id: Uuid::nil() }))?;

    // Scenario 6 (spec.md §8): paid 4000 basic for Jan+Feb, revised to 5000
    // effective Jan 1. Only periods inside [from, to] are included.
    let jan = demo.period.clone();
    let mut feb = demo.period.clone();
    feb.id = Uuid::new_v4();
    feb.start_date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    feb.end_date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();

    let make_item = || PayrollItem {
        id: Uuid::new_v4(),
        run_id: Uuid::new_v4(),
        employee_id: employee.id,
        employee_number: employee.employee_number.clone(),
        basic_salary: dec!(4000),
        gross_earnings: dec!(4000),
        total_deductions: dec!(0),
        net_salary: dec!(4000),
        taxable_income: dec!(4000),
        paye: dec!(0),
        overtime_tax: dec!(0),
        bonus_tax: dec!(0),
        total_overtime: dec!(0),
        total_bonus: dec!(0),
        ssnit_employee: dec!(0),
        ssnit_employer: dec!(0),
        tier2_employer: dec!(0),
        employer_cost: dec!(4000),
        proration_factor: dec!(1),
        days_payable: 0,
        total_days: 0,
        bank_snapshot: None,
        status: sase_payroll_core::domain::payroll_model::run::ItemStatus::Paid,
        error_message: None,
    };

    let jan_item = make_item();
    let feb_item = make_item();
    let detail = |item_id: Uuid| {
        vec![PayrollItemDetail {
            id: Uuid::new_v4(),
            item_id,
            pay_component_code: "BASIC".into(),
            amount: dec!(4000),
            is_arrear: false,
            arrear_months: None,
            backpay_request_id: None,
            display_order: 0,
        }]
    };
    let jan_details = detail(jan_item.id);
    let feb_details = detail(feb_item.id);

    let mut periods = Vec::new();
    if jan.start_date >= from && jan.end_date <= to {
        periods.push(PeriodFacts {
            period: &jan,
            paid_item: Some(&jan_item),
            paid_item_details: &jan_details,
            should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
            rate_book: &demo.rate_book,
        });
    }
    if feb.start_date >= from && feb.end_date <= to {
        periods.push(PeriodFacts {
            period: &feb,
            paid_item: Some(&feb_item),
            paid_item_details: &feb_details,
            should_have_paid: vec![("BASIC".to_string(), dec!(5000))],
            rate_book: &demo.rate_book,
        });
    }

    let result = backpay::calculate(&periods, &demo.pay_components).map_err(to_anyhow)?;
    Ok(json!({
        "employee_number": employee_number,
        "periods": result.periods.len(),
        "total_earnings_arrears": result.total_earnings_arrears,
        "total_deductions_arrears": result.total_deductions_arrears,
        "net_arrears": result.net_arrears,
    }))
}

async fn cmd_import_execute(
    csv_path: &std::path::Path,
    entity_type: Option<EntityType>,
    all_or_nothing: bool,
    ai_endpoint: String,
) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(csv_path)?;
    let (header, raw_rows) = parse_csv(&text);

    let registry = EntityCreatorRegistry::new();
    creators::register_defaults(&registry);

    // Without `AI_COLUMN_MAPPER_ENDPOINT` set to a real collaborator,
    // `AiColumnMapper` degrades to the fuzzy fallback automatically
    // (spec.md §6: "On AI failure, fall back to a fuzzy string-similarity
    // matcher").
    let mapper = AiColumnMapper::new(ai_endpoint);

    let session_id = Uuid::new_v4();
    let mut session = analyse(
        session_id,
        &header,
        &raw_rows,
        entity_type,
        &mapper,
        &registry,
        HashMap::new(),
        all_or_nothing,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let demo = fixtures::seed();
    let ctx = ImportContext {
        tenant_id: demo.tenant_id,
        created_by: demo.user_id,
        employees: &demo.employees,
        pay_components: &demo.pay_components,
        banks: &[],
        transactions: &[],
    };

    let preview_rows = preview(&mut session, &raw_rows, &registry, &ctx).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    session.status = sase_payroll_core::import_pipeline::ImportSessionStatus::Confirmed;

    let executor = ImportExecutor::new();
    let (results, summary) = executor
        .execute(&mut session, &preview_rows, &registry, &ctx, Utc::now())
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    Ok(json!({
        "session_id": session.id,
        "entity_type": session.entity_type.as_str(),
        "rows": results.len(),
        "created": summary.created,
        "updated": summary.updated,
        "skipped": summary.skipped,
        "errored": summary.errored,
    }))
}

async fn do_compute(demo: &fixtures::Demo) -> anyhow::Result<sase_payroll_core::payroll::orchestrator::ComputeOutcome> {
    let orchestrator = Orchestrator::new();
    let mut period = demo.period.clone();
    let ctx = ComputeContext {
        roster: &demo.employees,
        salaries: &demo.salaries,
        salary_components: &demo.salary_components,
        ad_hoc_payments: &[],
        transactions: &[],
        pay_components: &demo.pay_components,
        grades: &demo.grades,
        notches: &[],
        levels: &[],
        rate_book: &demo.rate_book,
    };
    orchestrator
        .compute(demo.run.clone(), &mut period, &ctx, demo.user_id, Utc::now())
        .await
        .map_err(to_anyhow)
}

fn to_anyhow(e: PayrollError) -> anyhow::Error {
    anyhow::anyhow!(e.to_string())
}

/// Minimal RFC 4180 reader: no quoted-field escaping beyond a bare `"..."`
/// strip, sufficient for the header/value shapes this CLI's fixtures feed
/// it. A production import would want a dedicated CSV crate.
fn parse_csv(text: &str) -> (Vec<String>, Vec<Row>) {
    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .map(|h| h.split(',').map(|c| c.trim().trim_matches('"').to_string()).collect())
        .unwrap_or_default();

    let rows = lines
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let values: Vec<&str> = line.split(',').collect();
            header
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let value = values.get(i).map(|v| v.trim().trim_matches('"')).unwrap_or("");
                    (key.clone(), serde_json::Value::String(value.to_string()))
                })
                .collect::<Row>()
        })
        .collect();

    (header, rows)
}
