use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::error::ApiError;

#[derive(Subcommand)]
pub enum AliasCommands {
    #[command(about = "List the aliases of a note")]
    List {
        #[arg(help = "Note id or alias")]
        note: String,
    },

    #[command(about = "Add an alias to a note")]
    Add {
        #[arg(help = "Note id or alias")]
        note: String,
        #[arg(help = "New alias name")]
        name: String,
    },

    #[command(about = "Remove an alias from a note")]
    Remove {
        #[arg(help = "Note id or alias")]
        note: String,
        #[arg(help = "Alias to remove")]
        name: String,
    },

    #[command(about = "Make an alias the primary alias of its note")]
    Primary {
        #[arg(help = "Note id or alias")]
        note: String,
        #[arg(help = "Alias to promote")]
        name: String,
    },
}

pub async fn handle(cmd: AliasCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::connect().await?;
    let aliases = ctx.notes.aliases();

    match cmd {
        AliasCommands::List { note } => {
            let note = ctx.note(&note).await?;
            if note.aliases.is_empty() {
                return output_empty_collection(&output_format, "aliases", "Note has no aliases");
            }

            let dtos: Vec<_> = note
                .aliases
                .iter()
                .map(|alias| aliases.to_alias_dto(alias, &note))
                .collect();

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "aliases": dtos }))?);
                }
                OutputFormat::Text => {
                    println!("{:<30} {}", "NAME", "PRIMARY");
                    println!("{}", "-".repeat(40));
                    for dto in &dtos {
                        println!("{:<30} {}", dto.name, if dto.primary_alias { "yes" } else { "" });
                    }
                }
            }
            Ok(())
        }
        AliasCommands::Add { note, name } => {
            let mut note = ctx.note(&note).await?;
            let alias = aliases.add_alias(&mut note, &name).await.map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!("Added alias '{}' to note {}", alias.name, note.public_id),
                Some(json!({ "alias": aliases.to_alias_dto(&alias, &note) })),
            )
        }
        AliasCommands::Remove { note, name } => {
            let mut note = ctx.note(&note).await?;
            let note = aliases
                .remove_alias(&mut note, &name)
                .await
                .map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!("Removed alias '{}' from note {}", name, note.public_id),
                Some(json!({ "remaining": note.aliases.len() })),
            )
        }
        AliasCommands::Primary { note, name } => {
            let mut note = ctx.note(&note).await?;
            let alias = aliases
                .make_alias_primary(&mut note, &name)
                .await
                .map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!("'{}' is now the primary alias of note {}", alias.name, note.public_id),
                Some(json!({ "alias": aliases.to_alias_dto(&alias, &note) })),
            )
        }
    }
}
