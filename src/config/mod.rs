use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::types::GuestAccess;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub notes: NotesConfig,
    pub permissions: PermissionsConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Names that may never be used as an alias (they collide with routes)
    pub forbidden_aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    pub guest_access: GuestAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Notes overrides
        if let Ok(v) = env::var("NOTES_FORBIDDEN_ALIASES") {
            self.notes.forbidden_aliases = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Permission overrides
        if let Ok(v) = env::var("PERMISSIONS_GUEST_ACCESS") {
            self.permissions.guest_access = v.parse().unwrap_or(self.permissions.guest_access);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging =
                v.parse().unwrap_or(self.database.enable_query_logging);
        }

        self
    }

    fn default_forbidden_aliases() -> Vec<String> {
        ["new", "api", "auth", "me", "login", "logout", "history", "config", "status", "public"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            notes: NotesConfig {
                forbidden_aliases: Self::default_forbidden_aliases(),
            },
            permissions: PermissionsConfig {
                guest_access: GuestAccess::CreateWithAlias,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            notes: NotesConfig {
                forbidden_aliases: Self::default_forbidden_aliases(),
            },
            permissions: PermissionsConfig {
                guest_access: GuestAccess::Read,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            notes: NotesConfig {
                forbidden_aliases: Self::default_forbidden_aliases(),
            },
            permissions: PermissionsConfig {
                guest_access: GuestAccess::Deny,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
