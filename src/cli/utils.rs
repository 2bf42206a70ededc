use serde_json::{json, Value};
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::{Note, User};
use crate::database::{DatabaseManager, IdentityRepository, PgNoteRepository};
use crate::error::ApiError;
use crate::services::{AliasService, NoteService, PermissionService};

/// Services wired to the configured Postgres database
pub struct CliContext {
    pub db: DatabaseManager,
    pub repo: Arc<PgNoteRepository>,
    pub notes: NoteService<PgNoteRepository>,
}

impl CliContext {
    pub async fn connect() -> anyhow::Result<Self> {
        let config = config::config();
        let db = DatabaseManager::from_env(&config.database).await?;
        let repo = Arc::new(PgNoteRepository::new(db.pool().clone()));

        let aliases = AliasService::from_config(repo.clone(), &config.notes);
        let permissions = PermissionService::from_config(&config.permissions);
        let notes = NoteService::new(repo.clone(), aliases, permissions);

        Ok(Self { db, repo, notes })
    }

    /// Look a note up by public id or alias, reporting the client-facing message
    pub async fn note(&self, ident: &str) -> anyhow::Result<Note> {
        self.notes
            .get_note_by_id_or_alias(ident)
            .await
            .map_err(|e| ApiError::from(e).into())
    }

    /// `None` stands for an anonymous request
    pub async fn user(&self, username: Option<&str>) -> anyhow::Result<Option<User>> {
        match username {
            Some(name) => Ok(Some(
                self.repo
                    .find_user_by_username(name)
                    .await
                    .map_err(ApiError::from)?,
            )),
            None => Ok(None),
        }
    }
}

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(extra)) = data {
                if let Some(obj) = response.as_object_mut() {
                    obj.extend(extra);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Summary of a note for both output formats
pub fn note_summary(note: &Note) -> Value {
    json!({
        "id": note.public_id,
        "owner": note.owner,
        "primary_alias": note.primary_alias().map(|a| a.name.clone()),
        "aliases": note.aliases.iter().map(|a| a.name.clone()).collect::<Vec<_>>(),
        "user_permissions": note.user_permissions.len(),
        "group_permissions": note.group_permissions.len(),
        "version": note.version,
    })
}
