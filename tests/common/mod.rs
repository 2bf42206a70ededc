#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use notes_service::config::{AppConfig, DatabaseConfig};
use notes_service::database::models::User;
use notes_service::database::{DatabaseManager, PgNoteRepository};
use notes_service::services::{AliasService, NoteService, PermissionService};
use notes_service::types::GuestAccess;
use uuid::Uuid;

/// Services against the Postgres database named by DATABASE_URL
pub struct PgContext {
    pub db: DatabaseManager,
    pub repo: Arc<PgNoteRepository>,
    pub notes: NoteService<PgNoteRepository>,
}

impl PgContext {
    /// Returns None (and says so) when no database is configured
    pub async fn connect(guest_access: GuestAccess) -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        if std::env::var("DATABASE_URL").is_err() {
            println!("DATABASE_URL not set, skipping Postgres test (expected in CI)");
            return Ok(None);
        }

        let config = DatabaseConfig {
            max_connections: 5,
            connection_timeout: 10,
            enable_query_logging: false,
        };
        let db = DatabaseManager::from_env(&config).await?;
        db.ensure_schema().await?;

        let repo = Arc::new(PgNoteRepository::new(db.pool().clone()));
        let forbidden = AppConfig::from_env().notes.forbidden_aliases;
        let notes = NoteService::new(
            repo.clone(),
            AliasService::new(repo.clone(), forbidden),
            PermissionService::new(guest_access),
        );
        Ok(Some(Self { db, repo, notes }))
    }

    /// Inserts a user with a unique username
    pub async fn create_user(&self, prefix: &str) -> Result<User> {
        let user = User::new(unique(prefix), prefix);
        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at) VALUES ($1, $2, $3, $4)",
        )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(user.created_at)
            .execute(self.db.pool())
            .await?;
        Ok(user)
    }

    /// Inserts a named group with the given members, returning its name
    pub async fn create_group(&self, prefix: &str, members: &[&User]) -> Result<String> {
        let id = Uuid::new_v4();
        let name = unique(prefix);
        sqlx::query(
            "INSERT INTO groups (id, name, display_name, special) VALUES ($1, $2, $3, false)",
        )
            .bind(id)
            .bind(&name)
            .bind(prefix)
            .execute(self.db.pool())
            .await?;
        for member in members {
            sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
                .bind(id)
                .bind(member.id)
                .execute(self.db.pool())
                .await?;
        }
        Ok(name)
    }
}

/// Test-unique name so runs never collide on the global alias namespace
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
