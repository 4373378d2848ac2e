//! Bank master data: the catalogue `BankAccount.bank_name` resolves against
//! during import (spec.md §4.M, entity type `BANK`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bank {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub short_name: Option<String>,
    pub swift_code: Option<String>,
    pub sort_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}
