use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::NotesConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Alias, AliasDto, Note};
use crate::database::repository::NoteRepository;

#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error("Alias already exists: {0}")]
    AlreadyExists(String),
    #[error("Alias is forbidden: {0}")]
    ForbiddenName(String),
    #[error("Alias not found: {0}")]
    NotFound(String),
    #[error("Primary alias '{0}' cannot be removed while other aliases exist")]
    PrimaryDeletionForbidden(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Maintains the name-to-note mapping and the single-primary invariant.
///
/// Every mutation works on a copy of the note and writes the whole alias set in
/// one `save_note`. The caller's note is only replaced once the save succeeded,
/// and a concurrent writer surfaces as `DatabaseError::Conflict`.
pub struct AliasService<R> {
    repo: Arc<R>,
    forbidden: HashSet<String>,
}

impl<R: NoteRepository> AliasService<R> {
    pub fn new(repo: Arc<R>, forbidden: impl IntoIterator<Item = String>) -> Self {
        Self {
            repo,
            forbidden: forbidden.into_iter().collect(),
        }
    }

    pub fn from_config(repo: Arc<R>, config: &NotesConfig) -> Self {
        Self::new(repo, config.forbidden_aliases.iter().cloned())
    }

    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden.contains(name)
    }

    /// Checks that `name` could be attached to any note right now
    pub async fn ensure_alias_available(&self, name: &str) -> Result<(), AliasError> {
        if self.is_forbidden(name) {
            warn!("Rejected forbidden alias '{}'", name);
            return Err(AliasError::ForbiddenName(name.to_string()));
        }
        if self.repo.find_alias_by_name(name).await?.is_some() {
            warn!("Rejected alias '{}': already in use", name);
            return Err(AliasError::AlreadyExists(name.to_string()));
        }
        if self.repo.find_note_by_public_id(name).await?.is_some() {
            warn!("Rejected alias '{}': collides with a note id", name);
            return Err(AliasError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    /// A save conflict becomes `AlreadyExists` when `name` was claimed after
    /// `ensure_alias_available` ran
    pub(crate) async fn explain_conflict(&self, name: &str, err: DatabaseError) -> AliasError {
        if matches!(err, DatabaseError::Conflict(_)) {
            match self.repo.find_alias_by_name(name).await {
                Ok(Some(_)) => {
                    warn!("Rejected alias '{}': claimed concurrently", name);
                    return AliasError::AlreadyExists(name.to_string());
                }
                Ok(None) => {}
                Err(lookup) => return lookup.into(),
            }
        }
        err.into()
    }

    /// Attaches a new alias; the first alias of a note becomes its primary
    pub async fn add_alias(&self, note: &mut Note, name: &str) -> Result<Alias, AliasError> {
        self.ensure_alias_available(name).await?;

        let alias = Alias::new(name, note.id, note.aliases.is_empty());
        let mut updated = note.clone();
        updated.aliases.push(alias.clone());

        *note = match self.repo.save_note(&updated).await {
            Ok(saved) => saved,
            Err(err) => return Err(self.explain_conflict(name, err).await),
        };
        info!(
            "Added alias '{}' to note {} (primary: {})",
            alias.name, note.public_id, alias.primary
        );
        Ok(alias)
    }

    /// Detaches an alias. A primary alias may only go when it is the last one.
    pub async fn remove_alias<'n>(
        &self,
        note: &'n mut Note,
        name: &str,
    ) -> Result<&'n Note, AliasError> {
        let alias = note
            .alias(name)
            .cloned()
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;

        if alias.primary && note.aliases.len() > 1 {
            warn!(
                "Refused to remove primary alias '{}' of note {}",
                name, note.public_id
            );
            return Err(AliasError::PrimaryDeletionForbidden(name.to_string()));
        }

        let mut updated = note.clone();
        updated.aliases.retain(|a| a.name != alias.name);

        *note = self.repo.save_note(&updated).await?;

        info!("Removed alias '{}' from note {}", name, note.public_id);
        Ok(note)
    }

    /// Makes `name` the only primary alias of the note.
    /// Promoting the current primary is a successful no-op.
    pub async fn make_alias_primary(
        &self,
        note: &mut Note,
        name: &str,
    ) -> Result<Alias, AliasError> {
        let target = note
            .alias(name)
            .cloned()
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;

        if target.primary {
            return Ok(target);
        }

        let mut updated = note.clone();
        for alias in updated.aliases.iter_mut() {
            alias.primary = alias.name == target.name;
        }

        *note = self.repo.save_note(&updated).await?;
        let promoted = note
            .alias(name)
            .cloned()
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;

        info!("Alias '{}' is now primary for note {}", name, note.public_id);
        Ok(promoted)
    }

    pub fn to_alias_dto(&self, alias: &Alias, note: &Note) -> AliasDto {
        AliasDto {
            name: alias.name.clone(),
            primary_alias: alias.primary,
            note_id: note.public_id.clone(),
        }
    }
}
