//! Shared tenant-scoped record embedded into every aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity, tenancy, and soft-delete fields common to every persisted row.
///
/// Composed by value rather than inherited, following the flat-struct shape
/// the rest of this crate uses for value objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Entity {
    pub fn new(tenant_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Request-scoped tenant context, passed explicitly rather than stored
/// thread-locally (an async task may hop OS threads between await points).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self { tenant_id, user_id }
    }

    pub fn owns(&self, entity: &Entity) -> bool {
        self.tenant_id == entity.tenant_id && !entity.is_deleted
    }
}
