//! Concrete `(Creator, Validator, Matcher)` triples for the five importable
//! entity types (spec.md §4.M), registered into the `EntityCreatorRegistry`
//! at process start.
//!
//! Grounded file-for-file on `assistant/import_pipeline/creators/*.py`.

pub mod bank;
pub mod bank_account;
pub mod employee;
pub mod employee_transaction;
pub mod pay_component;

use crate::import_pipeline::registry::EntityCreatorRegistry;

/// `register_defaults` (spec.md §4.M "registered at startup"): wires up
/// every built-in entity type. Called once from the binary's bootstrap.
pub fn register_defaults(registry: &EntityCreatorRegistry) {
    registry.register(
        Box::new(employee::EmployeeCreator),
        Some(Box::new(employee::EmployeeValidator)),
        Some(Box::new(employee::EmployeeMatcher)),
    );
    registry.register(
        Box::new(employee_transaction::EmployeeTransactionCreator),
        Some(Box::new(employee_transaction::EmployeeTransactionValidator)),
        Some(Box::new(employee_transaction::EmployeeTransactionMatcher)),
    );
    registry.register(
        Box::new(pay_component::PayComponentCreator),
        Some(Box::new(pay_component::PayComponentValidator)),
        Some(Box::new(pay_component::PayComponentMatcher)),
    );
    registry.register(
        Box::new(bank::BankCreator),
        Some(Box::new(bank::BankValidator)),
        Some(Box::new(bank::BankMatcher)),
    );
    registry.register(
        Box::new(bank_account::BankAccountCreator),
        Some(Box::new(bank_account::BankAccountValidator)),
        Some(Box::new(bank_account::BankAccountMatcher)),
    );
}
