//! sase-payroll-core — Ghana-jurisdiction payroll core for a multi-tenant HRIS
//!
//! Three tightly coupled subsystems sharing one compensation data model:
//!
//! - The **Payroll Computation Engine** (`payroll::computer`,
//!   `payroll::rate_book`, `payroll::compensation`, `payroll::transaction_overlay`,
//!   `payroll::formula`, `payroll::proration`): per-employee, per-period
//!   earning/deduction breakdowns, PAYE/SSNIT, and net pay.
//! - The **Payroll Lifecycle State Machine** (`payroll::lifecycle`,
//!   `payroll::orchestrator`): Run/Period staged progression and recompute.
//! - The **Retroactive Pay (Backpay) Engine** (`payroll::backpay`): arrears
//!   reconstruction and injection into a future run.
//!
//! The Bulk Import Pipeline (`import_pipeline`) is an orthogonal ingestion
//! path that writes into the Compensation Graph via the same domain model.

pub mod domain;
pub mod import_pipeline;
pub mod payroll;

pub use domain::{Entity, TenantContext};
pub use payroll::{PayrollError, PayrollResult};
