use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::alias::Alias;
use super::permission::{GroupPermission, UserPermission};

/// Note aggregate as handed to the services: every collection is already loaded.
///
/// Aliases and grants belong to the note and are only persisted through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    /// Stable identifier shown to clients alongside the aliases
    pub public_id: String,
    pub owner: Option<Uuid>,
    pub aliases: Vec<Alias>,
    pub user_permissions: Vec<UserPermission>,
    pub group_permissions: Vec<GroupPermission>,
    /// Optimistic concurrency token. 0 means the note was never persisted.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(owner: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            public_id: Uuid::new_v4().simple().to_string(),
            owner,
            aliases: Vec::new(),
            user_permissions: Vec::new(),
            group_permissions: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_new(&self) -> bool {
        self.version == 0
    }

    pub fn alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.iter().find(|alias| alias.name == name)
    }

    pub fn primary_alias(&self) -> Option<&Alias> {
        self.aliases.iter().find(|alias| alias.primary)
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.alias(name).is_some()
    }
}

/// `notes` table row without the owned collections
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub public_id: String,
    pub owner_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRow {
    pub fn into_note(
        self,
        aliases: Vec<Alias>,
        user_permissions: Vec<UserPermission>,
        group_permissions: Vec<GroupPermission>,
    ) -> Note {
        Note {
            id: self.id,
            public_id: self.public_id,
            owner: self.owner_id,
            aliases,
            user_permissions,
            group_permissions,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
