//! Backpay Request / Detail — the persisted record of a retroactive pay
//! calculation (spec.md §3, §4.K).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpayStatus {
    Draft,
    Previewed,
    Approved,
    Applied,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpayReason {
    SalaryRevision,
    Upgrade,
    GradeChange,
    Correction,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackpayRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub reason: BackpayReason,
    pub description: String,
    pub effective_from: NaiveDate,
    pub effective_to: NaiveDate,
    pub new_salary_id: Option<Uuid>,
    pub old_salary_id: Option<Uuid>,
    pub reference_period_id: Option<Uuid>,
    pub status: BackpayStatus,
    pub net_arrears: Decimal,
    pub created_by: Option<Uuid>,
    pub applied_to_run_id: Option<Uuid>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl BackpayRequest {
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.effective_from <= to && self.effective_to >= from
    }

    /// Precondition for `apply_to_payroll` (spec.md §4.K "Idempotence
    /// invariant": applying twice is forbidden).
    pub fn mark_applied(&mut self, run_id: Uuid, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != BackpayStatus::Approved {
            return Err(format!("backpay request is {:?}, expected Approved", self.status));
        }
        self.status = BackpayStatus::Applied;
        self.applied_to_run_id = Some(run_id);
        self.applied_at = Some(now);
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackpayDetail {
    pub id: Uuid,
    pub backpay_request_id: Uuid,
    pub period_id: Uuid,
    pub pay_component_code: String,
    pub old_amount: Decimal,
    pub new_amount: Decimal,
    pub difference: Decimal,
}

/// A detection candidate surfaced by the Retroactive Change Detector
/// (spec.md §4.L). Never auto-promoted to a BackpayRequest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackpayCandidate {
    pub employee_id: Uuid,
    pub changes: Vec<DetectedChange>,
    pub affected_period_ids: Vec<Uuid>,
    pub earliest_from: NaiveDate,
    pub latest_to: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedChange {
    pub change_type: String,
    pub description: String,
    pub affected_period_id: Uuid,
    pub created_at: DateTime<Utc>,
}
