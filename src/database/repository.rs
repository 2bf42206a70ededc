use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Alias, Group, GroupPermission, GroupRow, Note, NoteRow, User, UserPermission,
};

/// Note aggregate persistence. Aliases and grants are saved through their note.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Looks an alias up across all notes
    async fn find_alias_by_name(&self, name: &str) -> Result<Option<Alias>, DatabaseError>;

    async fn find_aliases_by_note(&self, note_id: Uuid) -> Result<Vec<Alias>, DatabaseError>;

    async fn find_note_by_id(&self, id: Uuid) -> Result<Note, DatabaseError>;

    async fn find_note_by_public_id(&self, public_id: &str) -> Result<Option<Note>, DatabaseError>;

    async fn find_note_by_alias(&self, name: &str) -> Result<Note, DatabaseError>;

    /// Inserts or updates the note and replaces its aliases and grants with the
    /// aggregate's, all in one unit. Fails with `Conflict` when the stored
    /// version differs from `note.version`.
    async fn save_note(&self, note: &Note) -> Result<Note, DatabaseError>;

    async fn remove_note(&self, note: &Note) -> Result<(), DatabaseError>;
}

/// Identity and group lookups
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<User, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<User, DatabaseError>;

    /// Special groups come back as `Group::Special`, others with their members
    async fn find_group_by_name(&self, name: &str) -> Result<Group, DatabaseError>;
}

pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_note(&self, row: NoteRow) -> Result<Note, DatabaseError> {
        let aliases = self.find_aliases_by_note(row.id).await?;

        let user_permissions = sqlx::query_as::<_, UserPermission>(
            "SELECT user_id, note_id, can_edit FROM note_user_permissions WHERE note_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let group_rows = sqlx::query_as::<_, (Uuid, String, String, bool, bool)>(
            "SELECT g.id, g.name, g.display_name, g.special, p.can_edit
             FROM note_group_permissions p
             JOIN groups g ON g.id = p.group_id
             WHERE p.note_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut group_permissions = Vec::with_capacity(group_rows.len());
        for (id, name, display_name, special, can_edit) in group_rows {
            let group_row = GroupRow { id, name, display_name, special };
            let group = self.resolve_group(group_row).await?;
            group_permissions.push(GroupPermission {
                group,
                note_id: row.id,
                can_edit,
            });
        }

        Ok(row.into_note(aliases, user_permissions, group_permissions))
    }

    async fn resolve_group(&self, row: GroupRow) -> Result<Group, DatabaseError> {
        let members = if row.special {
            Vec::new()
        } else {
            sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM group_members WHERE group_id = $1")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?
        };
        Ok(row.into_group(members))
    }

    async fn write_note_row(
        tx: &mut Transaction<'_, Postgres>,
        note: &Note,
    ) -> Result<i64, DatabaseError> {
        if note.is_new() {
            sqlx::query(
                "INSERT INTO notes (id, public_id, owner_id, version, created_at, updated_at)
                 VALUES ($1, $2, $3, 1, $4, now())",
            )
            .bind(note.id)
            .bind(&note.public_id)
            .bind(note.owner)
            .bind(note.created_at)
            .execute(&mut **tx)
            .await?;
            return Ok(1);
        }

        let result = sqlx::query(
            "UPDATE notes SET owner_id = $2, version = version + 1, updated_at = now()
             WHERE id = $1 AND version = $3",
        )
        .bind(note.id)
        .bind(note.owner)
        .bind(note.version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM notes WHERE id = $1")
                .bind(note.id)
                .fetch_optional(&mut **tx)
                .await?;
            return Err(match exists {
                Some(current) => DatabaseError::Conflict(format!(
                    "note {} is at version {}, expected {}",
                    note.id, current, note.version
                )),
                None => DatabaseError::NotFound(format!("note {}", note.id)),
            });
        }
        Ok(note.version + 1)
    }

    async fn write_aliases(
        tx: &mut Transaction<'_, Postgres>,
        note: &Note,
    ) -> Result<(), DatabaseError> {
        let names: Vec<&str> = note.aliases.iter().map(|alias| alias.name.as_str()).collect();
        sqlx::query("DELETE FROM aliases WHERE note_id = $1 AND NOT (name = ANY($2))")
            .bind(note.id)
            .bind(&names)
            .execute(&mut **tx)
            .await?;

        // At most one primary per note is enforced by a partial unique index,
        // so demotions must land before the promotion.
        let mut aliases: Vec<&Alias> = note.aliases.iter().collect();
        aliases.sort_by_key(|alias| alias.primary);

        for alias in aliases {
            let result = sqlx::query(
                "INSERT INTO aliases (name, note_id, is_primary) VALUES ($1, $2, $3)
                 ON CONFLICT (name) DO UPDATE SET is_primary = EXCLUDED.is_primary
                 WHERE aliases.note_id = EXCLUDED.note_id",
            )
            .bind(&alias.name)
            .bind(note.id)
            .bind(alias.primary)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::Conflict(format!(
                    "alias '{}' belongs to another note",
                    alias.name
                )));
            }
        }
        Ok(())
    }

    async fn write_permissions(
        tx: &mut Transaction<'_, Postgres>,
        note: &Note,
    ) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM note_user_permissions WHERE note_id = $1")
            .bind(note.id)
            .execute(&mut **tx)
            .await?;
        for permission in &note.user_permissions {
            sqlx::query(
                "INSERT INTO note_user_permissions (note_id, user_id, can_edit)
                 VALUES ($1, $2, $3)",
            )
            .bind(note.id)
            .bind(permission.user_id)
            .bind(permission.can_edit)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query("DELETE FROM note_group_permissions WHERE note_id = $1")
            .bind(note.id)
            .execute(&mut **tx)
            .await?;
        for permission in &note.group_permissions {
            // Group names are unique, special groups included
            let result = sqlx::query(
                "INSERT INTO note_group_permissions (note_id, group_id, can_edit)
                 SELECT $1, id, $3 FROM groups WHERE name = $2",
            )
            .bind(note.id)
            .bind(permission.group.name())
            .bind(permission.can_edit)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound(format!(
                    "group '{}'",
                    permission.group.name()
                )));
            }
        }
        Ok(())
    }
}

const NOTE_COLUMNS: &str = "n.id, n.public_id, n.owner_id, n.version, n.created_at, n.updated_at";

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn find_alias_by_name(&self, name: &str) -> Result<Option<Alias>, DatabaseError> {
        let alias = sqlx::query_as::<_, Alias>(
            "SELECT name, note_id, is_primary FROM aliases WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(alias)
    }

    async fn find_aliases_by_note(&self, note_id: Uuid) -> Result<Vec<Alias>, DatabaseError> {
        let aliases = sqlx::query_as::<_, Alias>(
            "SELECT name, note_id, is_primary FROM aliases WHERE note_id = $1
             ORDER BY is_primary DESC, name",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(aliases)
    }

    async fn find_note_by_id(&self, id: Uuid) -> Result<Note, DatabaseError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {} FROM notes n WHERE n.id = $1",
            NOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("note {}", id)))?;

        self.load_note(row).await
    }

    async fn find_note_by_public_id(&self, public_id: &str) -> Result<Option<Note>, DatabaseError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {} FROM notes n WHERE n.public_id = $1",
            NOTE_COLUMNS
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_note(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_note_by_alias(&self, name: &str) -> Result<Note, DatabaseError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {} FROM notes n JOIN aliases a ON a.note_id = n.id WHERE a.name = $1",
            NOTE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("alias '{}'", name)))?;

        self.load_note(row).await
    }

    async fn save_note(&self, note: &Note) -> Result<Note, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let version = Self::write_note_row(&mut tx, note).await?;
        Self::write_aliases(&mut tx, note).await?;
        Self::write_permissions(&mut tx, note).await?;

        tx.commit().await?;

        let mut saved = note.clone();
        saved.version = version;
        saved.updated_at = chrono::Utc::now();
        Ok(saved)
    }

    async fn remove_note(&self, note: &Note) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(note.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("note {}", note.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for PgNoteRepository {
    async fn find_user_by_id(&self, id: Uuid) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, display_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user '{}'", username)))
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Group, DatabaseError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, display_name, special FROM groups WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("group '{}'", name)))?;

        self.resolve_group(row).await
    }
}
