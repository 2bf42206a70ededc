pub mod alias;
pub mod config;
pub mod db;
pub mod note;
pub mod permission;
