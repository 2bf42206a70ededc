use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Alias, Group, NamedGroup, Note, SpecialGroup, User};
use crate::database::repository::{IdentityRepository, NoteRepository};
use crate::services::{AliasService, NoteService, PermissionService};
use crate::types::GuestAccess;

/// Test utilities: an in-memory store that behaves like the Postgres repository
#[derive(Default)]
pub struct MemoryRepository {
    notes: RwLock<HashMap<Uuid, Note>>,
    users: RwLock<HashMap<Uuid, User>>,
    groups: RwLock<HashMap<String, NamedGroup>>,
    stale_alias_lookups: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_user(&self, username: &str) -> User {
        let user = User::new(username, username.to_uppercase());
        self.users.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn add_group(&self, name: &str, members: &[&User]) -> Group {
        let group = NamedGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: name.to_string(),
            members: members.iter().map(|u| u.id).collect(),
        };
        self.groups.write().await.insert(name.to_string(), group.clone());
        Group::Named(group)
    }

    /// Number of persisted aliases across all notes
    pub async fn alias_count(&self) -> usize {
        self.notes.read().await.values().map(|n| n.aliases.len()).sum()
    }

    /// The next `count` alias lookups report no match, like a read that ran
    /// before a concurrent writer committed
    pub fn miss_next_alias_lookups(&self, count: usize) {
        self.stale_alias_lookups.store(count, Ordering::SeqCst);
    }

    /// Stored copy of a note, bypassing the trait
    pub async fn stored(&self, id: Uuid) -> Option<Note> {
        self.notes.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl NoteRepository for MemoryRepository {
    async fn find_alias_by_name(&self, name: &str) -> Result<Option<Alias>, DatabaseError> {
        let stale = self
            .stale_alias_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }

        let notes = self.notes.read().await;
        Ok(notes.values().find_map(|note| note.alias(name).cloned()))
    }

    async fn find_aliases_by_note(&self, note_id: Uuid) -> Result<Vec<Alias>, DatabaseError> {
        let notes = self.notes.read().await;
        Ok(notes.get(&note_id).map(|n| n.aliases.clone()).unwrap_or_default())
    }

    async fn find_note_by_id(&self, id: Uuid) -> Result<Note, DatabaseError> {
        self.notes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("note {}", id)))
    }

    async fn find_note_by_public_id(&self, public_id: &str) -> Result<Option<Note>, DatabaseError> {
        let notes = self.notes.read().await;
        Ok(notes.values().find(|n| n.public_id == public_id).cloned())
    }

    async fn find_note_by_alias(&self, name: &str) -> Result<Note, DatabaseError> {
        let notes = self.notes.read().await;
        notes
            .values()
            .find(|n| n.has_alias(name))
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("alias '{}'", name)))
    }

    async fn save_note(&self, note: &Note) -> Result<Note, DatabaseError> {
        let mut notes = self.notes.write().await;

        match notes.get(&note.id) {
            Some(stored) if stored.version != note.version => {
                return Err(DatabaseError::Conflict(format!(
                    "note {} is at version {}, expected {}",
                    note.id, stored.version, note.version
                )));
            }
            None if !note.is_new() => {
                return Err(DatabaseError::NotFound(format!("note {}", note.id)));
            }
            _ => {}
        }

        for alias in &note.aliases {
            let taken = notes
                .values()
                .any(|other| other.id != note.id && other.has_alias(&alias.name));
            if taken {
                return Err(DatabaseError::Conflict(format!(
                    "alias '{}' belongs to another note",
                    alias.name
                )));
            }
        }

        let mut saved = note.clone();
        saved.version = note.version + 1;
        saved.updated_at = chrono::Utc::now();
        notes.insert(note.id, saved.clone());

        Ok(saved)
    }

    async fn remove_note(&self, note: &Note) -> Result<(), DatabaseError> {
        self.notes
            .write()
            .await
            .remove(&note.id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound(format!("note {}", note.id)))
    }
}

#[async_trait]
impl IdentityRepository for MemoryRepository {
    async fn find_user_by_id(&self, id: Uuid) -> Result<User, DatabaseError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("user '{}'", username)))
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Group, DatabaseError> {
        if let Some(special) = SpecialGroup::from_name(name) {
            return Ok(Group::Special(special));
        }
        self.groups
            .read()
            .await
            .get(name)
            .cloned()
            .map(Group::Named)
            .ok_or_else(|| DatabaseError::NotFound(format!("group '{}'", name)))
    }
}

pub const FORBIDDEN_ALIAS: &str = "forbiddenNoteId";

/// Services wired to one shared in-memory repository
pub struct TestContext {
    pub repo: Arc<MemoryRepository>,
    pub aliases: AliasService<MemoryRepository>,
    pub notes: NoteService<MemoryRepository>,
    pub permissions: PermissionService,
}

impl TestContext {
    pub fn new(guest_access: GuestAccess) -> Self {
        let repo = MemoryRepository::new();
        let forbidden = vec![FORBIDDEN_ALIAS.to_string()];
        let permissions = PermissionService::new(guest_access);
        let aliases = AliasService::new(repo.clone(), forbidden.clone());
        let notes = NoteService::new(
            repo.clone(),
            AliasService::new(repo.clone(), forbidden),
            permissions.clone(),
        );
        Self {
            repo,
            aliases,
            notes,
            permissions,
        }
    }

    /// Persisted, alias-less note
    pub async fn empty_note(&self, owner: Option<&User>) -> Note {
        let note = Note::new(owner.map(|u| u.id));
        self.repo
            .save_note(&note)
            .await
            .expect("in-memory save of a new note")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_save_is_rejected() {
        let repo = MemoryRepository::new();
        let saved = repo.save_note(&Note::new(None)).await.unwrap();
        repo.save_note(&saved).await.unwrap();

        let err = repo.save_note(&saved).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn alias_names_are_unique_across_notes() {
        let repo = MemoryRepository::new();
        let mut first = Note::new(None);
        first.aliases.push(Alias::new("shared", first.id, true));
        repo.save_note(&first).await.unwrap();

        let mut second = Note::new(None);
        second.aliases.push(Alias::new("shared", second.id, true));
        assert!(matches!(
            repo.save_note(&second).await,
            Err(DatabaseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn save_drops_aliases_missing_from_the_note() {
        let repo = MemoryRepository::new();
        let mut note = Note::new(None);
        note.aliases.push(Alias::new("keep", note.id, true));
        note.aliases.push(Alias::new("drop", note.id, false));
        let mut saved = repo.save_note(&note).await.unwrap();

        saved.aliases.retain(|a| a.name != "drop");
        repo.save_note(&saved).await.unwrap();

        assert!(repo.find_alias_by_name("drop").await.unwrap().is_none());
        assert_eq!(repo.find_aliases_by_note(note.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missed_lookups_run_out() {
        let repo = MemoryRepository::new();
        let mut note = Note::new(None);
        note.aliases.push(Alias::new("a", note.id, true));
        repo.save_note(&note).await.unwrap();

        repo.miss_next_alias_lookups(1);
        assert!(repo.find_alias_by_name("a").await.unwrap().is_none());
        assert!(repo.find_alias_by_name("a").await.unwrap().is_some());
    }
}
