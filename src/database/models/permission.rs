use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::group::Group;

/// Read (and optionally write) grant from one user to one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPermission {
    pub user_id: Uuid,
    pub note_id: Uuid,
    pub can_edit: bool,
}

/// Read (and optionally write) grant from one group to one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermission {
    pub group: Group,
    pub note_id: Uuid,
    pub can_edit: bool,
}
