pub mod alias_service;
pub mod note_service;
pub mod permission_service;

pub use alias_service::{AliasError, AliasService};
pub use note_service::{NoteError, NoteService};
pub use permission_service::PermissionService;
