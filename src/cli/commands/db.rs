use clap::Subcommand;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create tables and the built-in special groups")]
    Init,

    #[command(about = "Check database connectivity")]
    Health,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = DatabaseManager::from_env(&config::config().database).await?;

    let result = match cmd {
        DbCommands::Init => db
            .ensure_schema()
            .await
            .map(|_| "Database schema initialized"),
        DbCommands::Health => db.health_check().await.map(|_| "Database is reachable"),
    };
    db.close().await;

    output_success(&output_format, result?, None)
}
