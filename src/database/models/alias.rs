use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Human-readable, globally unique name bound to one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Alias {
    pub name: String,
    pub note_id: Uuid,
    #[sqlx(rename = "is_primary")]
    pub primary: bool,
}

impl Alias {
    pub fn new(name: impl Into<String>, note_id: Uuid, primary: bool) -> Self {
        Self {
            name: name.into(),
            note_id,
            primary,
        }
    }
}

/// Public projection of an alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasDto {
    pub name: String,
    pub primary_alias: bool,
    pub note_id: String,
}
