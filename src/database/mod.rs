pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{IdentityRepository, NoteRepository, PgNoteRepository};
