use tracing::debug;

use crate::config::PermissionsConfig;
use crate::database::models::{Group, Note, SpecialGroup, User};
use crate::types::{AccessLevel, GuestAccess};

/// Decides read/write/create rights over an already loaded note.
///
/// Precedence: ownership, then direct user grants, then group grants. The first
/// match wins. Absence of rights is `false`, never an error.
#[derive(Debug, Clone)]
pub struct PermissionService {
    guest_access: GuestAccess,
}

impl PermissionService {
    pub fn new(guest_access: GuestAccess) -> Self {
        Self { guest_access }
    }

    pub fn from_config(config: &PermissionsConfig) -> Self {
        Self::new(config.guest_access)
    }

    pub fn guest_access(&self) -> GuestAccess {
        self.guest_access
    }

    pub fn may_read(&self, user: Option<&User>, note: &Note) -> bool {
        self.may_access(user, note, AccessLevel::Read)
    }

    pub fn may_write(&self, user: Option<&User>, note: &Note) -> bool {
        self.may_access(user, note, AccessLevel::Write)
    }

    pub fn may_access(&self, user: Option<&User>, note: &Note, level: AccessLevel) -> bool {
        let granted = self.is_owner(user, note)
            || self.has_user_permission(user, note, level)
            || self.has_group_permission(user, note, level);

        debug!(
            "{:?} access to note {} for {}: {}",
            level,
            note.public_id,
            user.map(|u| u.username.as_str()).unwrap_or("guest"),
            if granted { "granted" } else { "denied" }
        );
        granted
    }

    pub fn may_create(&self, user: Option<&User>) -> bool {
        user.is_some() || self.guest_access.allows_create()
    }

    /// Creating a note under a chosen alias; guests need `CreateWithAlias`
    pub fn may_create_alias(&self, user: Option<&User>) -> bool {
        user.is_some() || self.guest_access.allows_create_alias()
    }

    pub fn is_owner(&self, user: Option<&User>, note: &Note) -> bool {
        match (user, note.owner) {
            (Some(user), Some(owner)) => user.id == owner,
            _ => false,
        }
    }

    fn has_user_permission(&self, user: Option<&User>, note: &Note, level: AccessLevel) -> bool {
        let Some(user) = user else {
            return false;
        };
        note.user_permissions
            .iter()
            .any(|permission| {
                permission.user_id == user.id && level.satisfied_by(permission.can_edit)
            })
    }

    fn has_group_permission(&self, user: Option<&User>, note: &Note, level: AccessLevel) -> bool {
        note.group_permissions
            .iter()
            .filter(|permission| level.satisfied_by(permission.can_edit))
            .any(|permission| match &permission.group {
                Group::Special(SpecialGroup::LoggedIn) => user.is_some(),
                Group::Special(SpecialGroup::Everyone) => self.guest_access.allows(level),
                Group::Named(group) => user.is_some_and(|user| group.has_member(user.id)),
            })
    }
}
