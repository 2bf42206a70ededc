pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;
