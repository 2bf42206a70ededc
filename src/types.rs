/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of access requested on a note
/// Used by the permission evaluator for every read/write decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
}

impl AccessLevel {
    pub fn wants_edit(&self) -> bool {
        matches!(self, AccessLevel::Write)
    }

    /// A grant with `can_edit = true` satisfies both levels, a read-only grant only reads
    pub fn satisfied_by(&self, can_edit: bool) -> bool {
        can_edit || !self.wants_edit()
    }
}

/// What anonymous users (and the "everyone" pseudo-group) may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuestAccess {
    Deny,
    Read,
    Write,
    Create,
    #[serde(rename = "createAlias", alias = "createWithAlias")]
    CreateWithAlias,
}

impl GuestAccess {
    /// Whether "everyone" grants may be honoured at the requested level
    pub fn allows(&self, level: AccessLevel) -> bool {
        match self {
            GuestAccess::Deny => false,
            GuestAccess::Read => !level.wants_edit(),
            GuestAccess::Write | GuestAccess::Create | GuestAccess::CreateWithAlias => true,
        }
    }

    pub fn allows_create(&self) -> bool {
        matches!(self, GuestAccess::Create | GuestAccess::CreateWithAlias)
    }

    pub fn allows_create_alias(&self) -> bool {
        matches!(self, GuestAccess::CreateWithAlias)
    }
}

impl FromStr for GuestAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "deny" => Ok(GuestAccess::Deny),
            "read" => Ok(GuestAccess::Read),
            "write" => Ok(GuestAccess::Write),
            "create" => Ok(GuestAccess::Create),
            "createAlias" | "createWithAlias" => Ok(GuestAccess::CreateWithAlias),
            other => Err(format!("unknown guest access level '{}'", other)),
        }
    }
}

impl fmt::Display for GuestAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GuestAccess::Deny => "deny",
            GuestAccess::Read => "read",
            GuestAccess::Write => "write",
            GuestAccess::Create => "create",
            GuestAccess::CreateWithAlias => "createAlias",
        };
        write!(f, "{}", s)
    }
}
