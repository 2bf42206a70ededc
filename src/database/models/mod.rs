pub mod alias;
pub mod group;
pub mod note;
pub mod permission;
pub mod user;

pub use alias::{Alias, AliasDto};
pub use group::{Group, GroupRow, NamedGroup, SpecialGroup};
pub use note::{Note, NoteRow};
pub use permission::{GroupPermission, UserPermission};
pub use user::User;
