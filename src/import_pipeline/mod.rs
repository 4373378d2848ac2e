//! Bulk Import Pipeline (§4.M): Analyse → Preview → Execute over a tabular
//! file, with AI-assisted column mapping and a registry-driven dispatch to
//! one of five entity types.
//!
//! Grounded on `assistant/import_pipeline/*.py` in full: `interfaces.py`,
//! `registry.py`, `column_mapper.py`, `import_executor.py`,
//! `preview_generator.py`, and the five files under `creators/`.

pub mod column_mapper;
pub mod creators;
pub mod error;
pub mod executor;
pub mod interfaces;
pub mod registry;
pub mod row_helpers;
pub mod session;

pub use column_mapper::AiColumnMapper;
pub use error::{ImportError, ImportResult};
pub use executor::{ImportExecutionSummary, ImportExecutor, ImportProgress, ImportRowResult, RowOutcomeAction};
pub use interfaces::{CreatedEntity, EntityCreator, EntityMatcher, EntityType, EntityValidator, ImportContext, LlmColumnMapper, MatchResult, Row, ValidationResult};
pub use registry::EntityCreatorRegistry;
pub use session::{analyse, preview, ImportPreviewRow, ImportSession, ImportSessionCounts, ImportSessionStatus, PreviewAction};
