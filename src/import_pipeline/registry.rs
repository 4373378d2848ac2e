//! `EntityCreatorRegistry` (spec.md §4.M): the Open/Closed-principle lookup
//! table from entity type to its creator/validator/matcher triple.
//!
//! Grounded on `assistant/import_pipeline/registry.py::EntityCreatorRegistry`
//! — `register`, `get_creator`, `get_validator`, `get_matcher`,
//! `get_target_schema`, `supported_types`. Backed by `DashMap` rather than
//! the teacher's plain dict since the registry is shared read-mostly state
//! across concurrent import sessions, matching `rate_book::RateBook`'s cache
//! pattern.

use dashmap::DashMap;

use crate::import_pipeline::error::{ImportError, ImportResult};
use crate::import_pipeline::interfaces::{EntityCreator, EntityMatcher, EntityType, EntityValidator};

pub struct Registration {
    creator: Box<dyn EntityCreator>,
    validator: Option<Box<dyn EntityValidator>>,
    matcher: Option<Box<dyn EntityMatcher>>,
}

#[derive(Default)]
pub struct EntityCreatorRegistry {
    entries: DashMap<EntityType, Registration>,
}

impl EntityCreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        creator: Box<dyn EntityCreator>,
        validator: Option<Box<dyn EntityValidator>>,
        matcher: Option<Box<dyn EntityMatcher>>,
    ) {
        let entity_type = creator.entity_type();
        self.entries.insert(entity_type, Registration { creator, validator, matcher });
    }

    pub fn get_creator(&self, entity_type: EntityType) -> ImportResult<dashmap::mapref::one::Ref<'_, EntityType, Registration>> {
        self.entries
            .get(&entity_type)
            .ok_or_else(|| ImportError::NotFound { entity: "entity_creator", reference: entity_type.as_str().to_string() })
    }

    pub fn has_validator(&self, entity_type: EntityType) -> bool {
        self.entries.get(&entity_type).map(|r| r.validator.is_some()).unwrap_or(false)
    }

    pub fn has_matcher(&self, entity_type: EntityType) -> bool {
        self.entries.get(&entity_type).map(|r| r.matcher.is_some()).unwrap_or(false)
    }

    pub fn target_schema(&self, entity_type: EntityType) -> ImportResult<Vec<(&'static str, &'static str)>> {
        Ok(self.get_creator(entity_type)?.creator.target_schema())
    }

    pub fn supported_types(&self) -> Vec<EntityType> {
        self.entries.iter().map(|e| *e.key()).collect()
    }
}

impl Registration {
    pub fn creator(&self) -> &dyn EntityCreator {
        self.creator.as_ref()
    }

    pub fn validator(&self) -> Option<&dyn EntityValidator> {
        self.validator.as_deref()
    }

    pub fn matcher(&self) -> Option<&dyn EntityMatcher> {
        self.matcher.as_deref()
    }
}
