use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Built-in pseudo-groups whose membership is implicit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialGroup {
    /// Every request, including anonymous ones
    Everyone,
    /// Any authenticated user
    LoggedIn,
}

impl SpecialGroup {
    pub const EVERYONE_NAME: &'static str = "_EVERYONE";
    pub const LOGGED_IN_NAME: &'static str = "_LOGGED_IN";

    /// Name of the row backing this group in storage
    pub fn name(&self) -> &'static str {
        match self {
            SpecialGroup::Everyone => Self::EVERYONE_NAME,
            SpecialGroup::LoggedIn => Self::LOGGED_IN_NAME,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SpecialGroup::Everyone => "Everyone",
            SpecialGroup::LoggedIn => "Logged-in users",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::EVERYONE_NAME => Some(SpecialGroup::Everyone),
            Self::LOGGED_IN_NAME => Some(SpecialGroup::LoggedIn),
            _ => None,
        }
    }

    pub fn all() -> [SpecialGroup; 2] {
        [SpecialGroup::Everyone, SpecialGroup::LoggedIn]
    }
}

/// Group with an explicitly stored membership set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedGroup {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub members: Vec<Uuid>,
}

impl NamedGroup {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Group {
    Special(SpecialGroup),
    Named(NamedGroup),
}

impl Group {
    pub fn name(&self) -> &str {
        match self {
            Group::Special(special) => special.name(),
            Group::Named(group) => &group.name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Group::Special(special) => special.display_name(),
            Group::Named(group) => &group.display_name,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, Group::Special(_))
    }
}

/// Raw `groups` row, resolved into a [`Group`] once members are known
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub special: bool,
}

impl GroupRow {
    /// Special rows become the tagged variant; anything else keeps its membership
    pub fn into_group(self, members: Vec<Uuid>) -> Group {
        if self.special {
            if let Some(special) = SpecialGroup::from_name(&self.name) {
                return Group::Special(special);
            }
            tracing::warn!("Group '{}' is flagged special but has no built-in meaning", self.name);
        }
        Group::Named(NamedGroup {
            id: self.id,
            name: self.name,
            display_name: self.display_name,
            members,
        })
    }
}
