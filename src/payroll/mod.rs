//! Payroll Module
//!
//! The Ghana-jurisdiction payroll core: the Statutory Rate Book (§4.A), the
//! Compensation Graph reader (§4.B), the Transaction Overlay (§4.C), the
//! Formula Evaluator (§4.D), the Proration Engine (§4.E), the Employee
//! Payroll Computer (§4.F/G/H), the Run Orchestrator (§4.I), the Lifecycle
//! State Machine (§4.J), the Retroactive Pay Engine and Change Detector
//! (§4.K/L), the Salary Upgrade workflow, the read-only audit checks of §8,
//! and the Bank Advice/Payslip-YTD export surface of §6.

pub mod audit;
pub mod backpay;
pub mod compensation;
pub mod computer;
pub mod error;
pub mod export;
pub mod formula;
pub mod lifecycle;
pub mod orchestrator;
pub mod proration;
pub mod rate_book;
pub mod salary_upgrade;
pub mod transaction_overlay;

pub use error::{PayrollError, PayrollResult};
pub use orchestrator::Orchestrator;
pub use rate_book::RateBook;
