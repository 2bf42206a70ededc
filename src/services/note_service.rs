use std::sync::Arc;
use tracing::{info, warn};

use crate::database::manager::DatabaseError;
use crate::database::models::{Alias, Group, GroupPermission, Note, User, UserPermission};
use crate::database::repository::NoteRepository;
use crate::services::alias_service::{AliasError, AliasService};
use crate::services::permission_service::PermissionService;

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Note identifier is forbidden: {0}")]
    ForbiddenName(String),
    #[error("Note not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Alias(#[from] AliasError),
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for NoteError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => NoteError::NotFound(what),
            other => NoteError::Database(other),
        }
    }
}

/// Note lifecycle and grant management on top of the alias manager
pub struct NoteService<R> {
    repo: Arc<R>,
    aliases: AliasService<R>,
    permissions: PermissionService,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: Arc<R>, aliases: AliasService<R>, permissions: PermissionService) -> Self {
        Self {
            repo,
            aliases,
            permissions,
        }
    }

    pub fn aliases(&self) -> &AliasService<R> {
        &self.aliases
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    /// Creates a note, optionally under an initial (primary) alias, in one save
    pub async fn create_note(
        &self,
        owner: Option<&User>,
        alias: Option<&str>,
    ) -> Result<Note, NoteError> {
        if !self.permissions.may_create(owner) {
            return Err(NoteError::PermissionDenied("guests may not create notes".to_string()));
        }

        let mut note = Note::new(owner.map(|u| u.id));

        if let Some(name) = alias {
            if !self.permissions.may_create_alias(owner) {
                return Err(NoteError::PermissionDenied(
                    "guests may not choose a note alias".to_string(),
                ));
            }
            self.aliases.ensure_alias_available(name).await?;
            note.aliases.push(Alias::new(name, note.id, true));
        }

        let note = match (self.repo.save_note(&note).await, alias) {
            (Ok(saved), _) => saved,
            (Err(err), Some(name)) => {
                return Err(self.aliases.explain_conflict(name, err).await.into())
            }
            (Err(err), None) => return Err(err.into()),
        };
        info!(
            "Created note {} (alias: {})",
            note.public_id,
            alias.unwrap_or("none")
        );
        Ok(note)
    }

    /// Resolves a public id first, then an alias
    pub async fn get_note_by_id_or_alias(&self, ident: &str) -> Result<Note, NoteError> {
        if self.aliases.is_forbidden(ident) {
            warn!("Lookup of forbidden note identifier '{}'", ident);
            return Err(NoteError::ForbiddenName(ident.to_string()));
        }

        if let Some(note) = self.repo.find_note_by_public_id(ident).await? {
            return Ok(note);
        }

        match self.repo.find_note_by_alias(ident).await {
            Ok(note) => Ok(note),
            Err(DatabaseError::NotFound(_)) => Err(NoteError::NotFound(ident.to_string())),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn delete_note(&self, note: &Note) -> Result<(), NoteError> {
        self.repo.remove_note(note).await?;
        info!("Deleted note {}", note.public_id);
        Ok(())
    }

    /// Grants (or regrants) a user access; one grant per user
    pub async fn set_user_permission(
        &self,
        note: &mut Note,
        user: &User,
        can_edit: bool,
    ) -> Result<UserPermission, NoteError> {
        let permission = UserPermission {
            user_id: user.id,
            note_id: note.id,
            can_edit,
        };

        let mut updated = note.clone();
        updated.user_permissions.retain(|p| p.user_id != user.id);
        updated.user_permissions.push(permission.clone());

        *note = self.repo.save_note(&updated).await?;
        info!(
            "Granted {} access on note {} to user '{}'",
            if can_edit { "write" } else { "read" },
            note.public_id,
            user.username
        );
        Ok(permission)
    }

    pub async fn remove_user_permission(
        &self,
        note: &mut Note,
        user: &User,
    ) -> Result<(), NoteError> {
        if !note.user_permissions.iter().any(|p| p.user_id == user.id) {
            return Err(NoteError::NotFound(format!(
                "permission of user '{}' on note {}",
                user.username, note.public_id
            )));
        }

        let mut updated = note.clone();
        updated.user_permissions.retain(|p| p.user_id != user.id);

        *note = self.repo.save_note(&updated).await?;
        info!("Revoked access on note {} from user '{}'", note.public_id, user.username);
        Ok(())
    }

    /// Grants (or regrants) a group access; one grant per group
    pub async fn set_group_permission(
        &self,
        note: &mut Note,
        group: &Group,
        can_edit: bool,
    ) -> Result<GroupPermission, NoteError> {
        let permission = GroupPermission {
            group: group.clone(),
            note_id: note.id,
            can_edit,
        };

        let mut updated = note.clone();
        updated.group_permissions.retain(|p| p.group.name() != group.name());
        updated.group_permissions.push(permission.clone());

        *note = self.repo.save_note(&updated).await?;
        info!(
            "Granted {} access on note {} to group '{}'",
            if can_edit { "write" } else { "read" },
            note.public_id,
            group.name()
        );
        Ok(permission)
    }

    pub async fn remove_group_permission(
        &self,
        note: &mut Note,
        group: &Group,
    ) -> Result<(), NoteError> {
        if !note.group_permissions.iter().any(|p| p.group.name() == group.name()) {
            return Err(NoteError::NotFound(format!(
                "permission of group '{}' on note {}",
                group.name(),
                note.public_id
            )));
        }

        let mut updated = note.clone();
        updated.group_permissions.retain(|p| p.group.name() != group.name());

        *note = self.repo.save_note(&updated).await?;
        info!("Revoked access on note {} from group '{}'", note.public_id, group.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::SpecialGroup;
    use crate::database::repository::IdentityRepository;
    use crate::testing::{TestContext, FORBIDDEN_ALIAS};
    use crate::types::GuestAccess;

    #[tokio::test]
    async fn creates_note_with_primary_alias() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("hardcoded").await;

        let note = ctx.notes.create_note(Some(&owner), Some("testNote")).await.unwrap();
        assert_eq!(note.owner, Some(owner.id));
        assert_eq!(note.primary_alias().map(|a| a.name.as_str()), Some("testNote"));
        assert!(!note.is_new());
    }

    #[tokio::test]
    async fn guests_need_create_policy() {
        let ctx = TestContext::new(GuestAccess::Write);
        let err = ctx.notes.create_note(None, None).await.unwrap_err();
        assert!(matches!(err, NoteError::PermissionDenied(_)));

        let ctx = TestContext::new(GuestAccess::Create);
        let note = ctx.notes.create_note(None, None).await.unwrap();
        assert!(note.owner.is_none());
        assert!(note.aliases.is_empty());
    }

    #[tokio::test]
    async fn guests_need_alias_policy_for_named_notes() {
        let ctx = TestContext::new(GuestAccess::Create);
        let err = ctx.notes.create_note(None, Some("guestNote")).await.unwrap_err();
        assert!(matches!(err, NoteError::PermissionDenied(_)));

        let ctx = TestContext::new(GuestAccess::CreateWithAlias);
        let note = ctx.notes.create_note(None, Some("guestNote")).await.unwrap();
        assert!(note.has_alias("guestNote"));
    }

    #[tokio::test]
    async fn creation_validates_alias() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("hardcoded").await;
        ctx.notes.create_note(Some(&owner), Some("taken")).await.unwrap();

        let err = ctx.notes.create_note(Some(&owner), Some("taken")).await.unwrap_err();
        assert!(matches!(err, NoteError::Alias(AliasError::AlreadyExists(_))));

        let err = ctx
            .notes
            .create_note(Some(&owner), Some(FORBIDDEN_ALIAS))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::Alias(AliasError::ForbiddenName(_))));
    }

    #[tokio::test]
    async fn creation_racing_for_a_name_reports_already_exists() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("hardcoded").await;
        ctx.notes.create_note(Some(&owner), Some("taken")).await.unwrap();

        ctx.repo.miss_next_alias_lookups(1);
        let err = ctx.notes.create_note(Some(&owner), Some("taken")).await.unwrap_err();
        assert!(matches!(err, NoteError::Alias(AliasError::AlreadyExists(_))));
        assert_eq!(ctx.repo.alias_count().await, 1);
    }

    #[tokio::test]
    async fn resolves_by_public_id_and_alias() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("hardcoded").await;
        let mut note = ctx.notes.create_note(Some(&owner), Some("first")).await.unwrap();
        ctx.aliases.add_alias(&mut note, "second").await.unwrap();

        for ident in [note.public_id.as_str(), "first", "second"] {
            let found = ctx.notes.get_note_by_id_or_alias(ident).await.unwrap();
            assert_eq!(found.id, note.id);
        }
    }

    #[tokio::test]
    async fn lookup_failures() {
        let ctx = TestContext::new(GuestAccess::Deny);
        assert!(matches!(
            ctx.notes.get_note_by_id_or_alias("i_dont_exist").await,
            Err(NoteError::NotFound(_))
        ));
        assert!(matches!(
            ctx.notes.get_note_by_id_or_alias(FORBIDDEN_ALIAS).await,
            Err(NoteError::ForbiddenName(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_aliases() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("hardcoded").await;
        let note = ctx.notes.create_note(Some(&owner), Some("doomed")).await.unwrap();

        ctx.notes.delete_note(&note).await.unwrap();
        assert!(ctx.repo.find_alias_by_name("doomed").await.unwrap().is_none());
        assert!(matches!(
            ctx.notes.delete_note(&note).await,
            Err(NoteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn user_grants_drive_permission_checks() {
        let ctx = TestContext::new(GuestAccess::Deny);
        let owner = ctx.repo.add_user("u1").await;
        let other = ctx.repo.add_user("u2").await;
        let mut note = ctx.notes.create_note(Some(&owner), None).await.unwrap();

        ctx.notes.set_user_permission(&mut note, &other, false).await.unwrap();
        let loaded = ctx.repo.find_note_by_id(note.id).await.unwrap();
        assert!(ctx.permissions.may_read(Some(&other), &loaded));
        assert!(!ctx.permissions.may_write(Some(&other), &loaded));

        ctx.notes.set_user_permission(&mut note, &other, true).await.unwrap();
        assert_eq!(note.user_permissions.len(), 1);
        assert!(ctx.permissions.may_write(Some(&other), &note));

        ctx.notes.remove_user_permission(&mut note, &other).await.unwrap();
        assert!(!ctx.permissions.may_read(Some(&other), &note));
        assert!(matches!(
            ctx.notes.remove_user_permission(&mut note, &other).await,
            Err(NoteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn group_grants_drive_permission_checks() {
        let ctx = TestContext::new(GuestAccess::Read);
        let owner = ctx.repo.add_user("owner").await;
        let member = ctx.repo.add_user("member").await;
        let editors = ctx.repo.add_group("editors", &[&member]).await;
        let everyone = ctx.repo.find_group_by_name(SpecialGroup::EVERYONE_NAME).await.unwrap();
        let mut note = ctx.notes.create_note(Some(&owner), None).await.unwrap();

        ctx.notes.set_group_permission(&mut note, &editors, true).await.unwrap();
        ctx.notes.set_group_permission(&mut note, &everyone, true).await.unwrap();
        assert!(ctx.permissions.may_write(Some(&member), &note));
        assert!(ctx.permissions.may_read(None, &note));
        assert!(!ctx.permissions.may_write(None, &note));

        ctx.notes.set_group_permission(&mut note, &editors, false).await.unwrap();
        assert_eq!(note.group_permissions.len(), 2);
        assert!(!ctx.permissions.may_write(Some(&member), &note));

        ctx.notes.remove_group_permission(&mut note, &everyone).await.unwrap();
        assert!(!ctx.permissions.may_read(None, &note));
        assert!(matches!(
            ctx.notes.remove_group_permission(&mut note, &everyone).await,
            Err(NoteError::NotFound(_))
        ));
    }
}
