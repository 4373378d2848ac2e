//! `ImportExecutor` (spec.md §4.M phase 3): dispatches each non-ERROR,
//! non-SKIP preview row to the registered Creator, in either per-row
//! savepoint or all-or-nothing mode, streaming progress as it goes.
//!
//! Grounded on `assistant/import_pipeline/import_executor.py::ImportExecutor`:
//! the same two atomicity modes, the `_RollbackError` short-circuit for
//! all-or-nothing, and the action/record/error accounting per processed row.
//! This core has no transaction manager of its own — "rolls back" for the
//! all-or-nothing mode means "discards every already-built `CreatedEntity`
//! and reports none of them", since nothing has touched real storage yet;
//! the caller's storage layer performs the actual atomic write.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{CreatedEntity, EntityType, ImportContext};
use crate::import_pipeline::registry::EntityCreatorRegistry;
use crate::import_pipeline::session::{ImportPreviewRow, ImportSession, ImportSessionStatus, PreviewAction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOutcomeAction {
    Created,
    Updated,
    Skipped,
    Errored,
}

#[derive(Clone, Debug)]
pub struct ImportRowResult {
    pub row_number: usize,
    pub action: RowOutcomeAction,
    pub record: Option<CreatedEntity>,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ImportExecutionSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
}

#[derive(Clone, Debug)]
pub struct ImportProgress {
    pub session_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub percentage: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Publishes `import_progress_{session_id}` (spec.md §5), mirroring
/// `orchestrator::Orchestrator`'s progress cache for the same reason: an
/// HTTP layer polls this key while the job itself runs on a worker.
#[derive(Default)]
pub struct ImportExecutor {
    progress: DashMap<Uuid, ImportProgress>,
}

impl ImportExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self, session_id: Uuid) -> Option<ImportProgress> {
        self.progress.get(&session_id).map(|p| p.clone())
    }

    /// `execute(session, registry, progress_callback)` (spec.md §4.M phase
    /// 3): only legal from CONFIRMED.
    pub fn execute(
        &self,
        session: &mut ImportSession,
        preview_rows: &[ImportPreviewRow],
        registry: &EntityCreatorRegistry,
        ctx: &ImportContext,
        now: DateTime<Utc>,
    ) -> ImportResult<(Vec<ImportRowResult>, ImportExecutionSummary)> {
        if session.status != ImportSessionStatus::Confirmed {
            return Err(ImportError::Validation(format!(
                "session {} is {:?}, expected CONFIRMED",
                session.id, session.status
            )));
        }

        let processable: Vec<&ImportPreviewRow> = preview_rows
            .iter()
            .filter(|r| !matches!(r.action, PreviewAction::Error | PreviewAction::Skip))
            .collect();
        let total = processable.len();

        self.progress.insert(
            session.id,
            ImportProgress { session_id: session.id, total, processed: 0, percentage: 0, started_at: now, completed_at: None },
        );

        if session.rollback_on_error {
            return self.execute_all_or_nothing(session, &processable, registry, ctx, now);
        }
        Ok(self.execute_per_row(session, &processable, registry, ctx, now))
    }

    fn execute_per_row(
        &self,
        session: &mut ImportSession,
        rows: &[&ImportPreviewRow],
        registry: &EntityCreatorRegistry,
        ctx: &ImportContext,
        now: DateTime<Utc>,
    ) -> (Vec<ImportRowResult>, ImportExecutionSummary) {
        let total = rows.len();
        let mut results = Vec::with_capacity(total);
        let mut summary = ImportExecutionSummary::default();

        for (i, row) in rows.iter().enumerate() {
            let result = process_row(row, session.entity_type, registry, ctx);
            tally(&result, &mut summary);
            results.push(result);
            self.publish_progress(session.id, total, i + 1, now);
        }

        session.status = ImportSessionStatus::Completed;
        (results, summary)
    }

    fn execute_all_or_nothing(
        &self,
        session: &mut ImportSession,
        rows: &[&ImportPreviewRow],
        registry: &EntityCreatorRegistry,
        ctx: &ImportContext,
        now: DateTime<Utc>,
    ) -> ImportResult<(Vec<ImportRowResult>, ImportExecutionSummary)> {
        let total = rows.len();
        let mut results = Vec::with_capacity(total);
        let mut summary = ImportExecutionSummary::default();

        for (i, row) in rows.iter().enumerate() {
            let result = process_row(row, session.entity_type, registry, ctx);
            if result.action == RowOutcomeAction::Errored {
                session.status = ImportSessionStatus::Failed;
                self.publish_progress(session.id, total, i + 1, now);
                return Err(ImportError::Validation(format!(
                    "row {} failed: {}",
                    row.row_number,
                    result.error_message.unwrap_or_default()
                )));
            }
            tally(&result, &mut summary);
            results.push(result);
            self.publish_progress(session.id, total, i + 1, now);
        }

        session.status = ImportSessionStatus::Completed;
        Ok((results, summary))
    }

    fn publish_progress(&self, session_id: Uuid, total: usize, processed: usize, now: DateTime<Utc>) {
        let percentage = if total > 0 { (processed * 100 / total) as u32 } else { 100 };
        let completed_at = if processed == total { Some(now) } else { None };
        self.progress.insert(
            session_id,
            ImportProgress { session_id, total, processed, percentage, started_at: now, completed_at },
        );
    }
}

fn tally(result: &ImportRowResult, summary: &mut ImportExecutionSummary) {
    match result.action {
        RowOutcomeAction::Created => summary.created += 1,
        RowOutcomeAction::Updated => summary.updated += 1,
        RowOutcomeAction::Skipped => summary.skipped += 1,
        RowOutcomeAction::Errored => summary.errored += 1,
    }
}

/// `_process_row` (spec.md §4.M phase 3): CREATE -> `creator.create`,
/// UPDATE -> `creator.update` against the preview's resolved existing
/// record, else SKIP is filtered out before this is ever called.
fn process_row(row: &ImportPreviewRow, entity_type: EntityType, registry: &EntityCreatorRegistry, ctx: &ImportContext) -> ImportRowResult {
    let entry = match registry.get_creator(entity_type) {
        Ok(e) => e,
        Err(e) => return ImportRowResult { row_number: row.row_number, action: RowOutcomeAction::Errored, record: None, error_message: Some(e.to_string()) },
    };
    let creator = entry.creator();

    match row.action {
        PreviewAction::Create => match creator.create(&row.parsed_data, ctx) {
            Ok(record) => ImportRowResult { row_number: row.row_number, action: RowOutcomeAction::Created, record: Some(record), error_message: None },
            Err(e) => ImportRowResult { row_number: row.row_number, action: RowOutcomeAction::Errored, record: None, error_message: Some(e.to_string()) },
        },
        PreviewAction::Update => {
            let Some(existing) = &row.existing_record else {
                return ImportRowResult {
                    row_number: row.row_number,
                    action: RowOutcomeAction::Errored,
                    record: None,
                    error_message: Some("UPDATE row missing its matched existing record".to_string()),
                };
            };
            match creator.update(existing, &row.parsed_data, ctx) {
                Ok((record, _changed)) => ImportRowResult { row_number: row.row_number, action: RowOutcomeAction::Updated, record: Some(record), error_message: None },
                Err(e) => ImportRowResult { row_number: row.row_number, action: RowOutcomeAction::Errored, record: None, error_message: Some(e.to_string()) },
            }
        }
        PreviewAction::Skip | PreviewAction::Error => unreachable!("skip/error rows are filtered before process_row"),
    }
}
