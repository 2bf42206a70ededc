use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::error::ApiError;

#[derive(Subcommand)]
pub enum NoteCommands {
    #[command(about = "Create a new note")]
    Create {
        #[arg(long, help = "Owner username (omit to create as guest)")]
        owner: Option<String>,

        #[arg(long, help = "Initial (primary) alias")]
        alias: Option<String>,
    },

    #[command(about = "Show a note")]
    Show {
        #[arg(help = "Note id or alias")]
        note: String,
    },

    #[command(about = "Delete a note with its aliases and grants")]
    Delete {
        #[arg(help = "Note id or alias")]
        note: String,
    },
}

pub async fn handle(cmd: NoteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::connect().await?;

    match cmd {
        NoteCommands::Create { owner, alias } => {
            let owner = ctx.user(owner.as_deref()).await?;
            let note = ctx
                .notes
                .create_note(owner.as_ref(), alias.as_deref())
                .await
                .map_err(ApiError::from)?;

            output_success(
                &output_format,
                &format!("Created note {}", note.public_id),
                Some(json!({ "note": note_summary(&note) })),
            )
        }
        NoteCommands::Show { note } => {
            let note = ctx.note(&note).await?;
            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&note_summary(&note))?);
                }
                OutputFormat::Text => {
                    println!("Note: {}", note.public_id);
                    match note.owner {
                        Some(owner) => println!("Owner: {}", owner),
                        None => println!("Owner: (none)"),
                    }
                    for alias in &note.aliases {
                        let marker = if alias.primary { "*" } else { " " };
                        println!("{} {}", marker, alias.name);
                    }
                }
            }
            Ok(())
        }
        NoteCommands::Delete { note } => {
            let note = ctx.note(&note).await?;
            ctx.notes.delete_note(&note).await.map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!("Note {} deleted successfully", note.public_id),
                None,
            )
        }
    }
}
