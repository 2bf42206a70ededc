use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::IdentityRepository;
use crate::error::ApiError;

#[derive(Subcommand)]
pub enum PermissionCommands {
    #[command(about = "Show what a user (or a guest) may do with a note")]
    Check {
        #[arg(help = "Note id or alias")]
        note: String,
        #[arg(long, help = "Username (omit to check guest access)")]
        user: Option<String>,
    },

    #[command(about = "Grant a user access to a note")]
    GrantUser {
        note: String,
        username: String,
        #[arg(long, help = "Allow editing, not just reading")]
        edit: bool,
    },

    #[command(about = "Revoke a user's access to a note")]
    RevokeUser { note: String, username: String },

    #[command(about = "Grant a group access to a note (_EVERYONE and _LOGGED_IN are built in)")]
    GrantGroup {
        note: String,
        group: String,
        #[arg(long, help = "Allow editing, not just reading")]
        edit: bool,
    },

    #[command(about = "Revoke a group's access to a note")]
    RevokeGroup { note: String, group: String },
}

pub async fn handle(cmd: PermissionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::connect().await?;
    let permissions = ctx.notes.permissions();

    match cmd {
        PermissionCommands::Check { note, user } => {
            let note = ctx.note(&note).await?;
            let user = ctx.user(user.as_deref()).await?;
            let user = user.as_ref();

            let result = json!({
                "note": note.public_id,
                "user": user.map(|u| u.username.clone()),
                "guest_access": permissions.guest_access().to_string(),
                "is_owner": permissions.is_owner(user, &note),
                "may_read": permissions.may_read(user, &note),
                "may_write": permissions.may_write(user, &note),
                "may_create": permissions.may_create(user),
            });

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    println!("Note:      {}", note.public_id);
                    let username = user.map(|u| u.username.as_str()).unwrap_or("(guest)");
                    println!("User:      {}", username);
                    println!("Owner:     {}", permissions.is_owner(user, &note));
                    println!("May read:  {}", permissions.may_read(user, &note));
                    println!("May write: {}", permissions.may_write(user, &note));
                }
            }
            Ok(())
        }
        PermissionCommands::GrantUser { note, username, edit } => {
            let mut note = ctx.note(&note).await?;
            let user = ctx.repo.find_user_by_username(&username).await.map_err(ApiError::from)?;
            ctx.notes
                .set_user_permission(&mut note, &user, edit)
                .await
                .map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!(
                    "Granted {} access to '{}'",
                    if edit { "write" } else { "read" },
                    username
                ),
                Some(json!({ "note": note_summary(&note) })),
            )
        }
        PermissionCommands::RevokeUser { note, username } => {
            let mut note = ctx.note(&note).await?;
            let user = ctx.repo.find_user_by_username(&username).await.map_err(ApiError::from)?;
            ctx.notes
                .remove_user_permission(&mut note, &user)
                .await
                .map_err(ApiError::from)?;
            output_success(&output_format, &format!("Revoked access of '{}'", username), None)
        }
        PermissionCommands::GrantGroup { note, group, edit } => {
            let mut note = ctx.note(&note).await?;
            let group = ctx.repo.find_group_by_name(&group).await.map_err(ApiError::from)?;
            ctx.notes
                .set_group_permission(&mut note, &group, edit)
                .await
                .map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!(
                    "Granted {} access to group '{}'",
                    if edit { "write" } else { "read" },
                    group.display_name()
                ),
                Some(json!({ "note": note_summary(&note) })),
            )
        }
        PermissionCommands::RevokeGroup { note, group } => {
            let mut note = ctx.note(&note).await?;
            let group = ctx.repo.find_group_by_name(&group).await.map_err(ApiError::from)?;
            ctx.notes
                .remove_group_permission(&mut note, &group)
                .await
                .map_err(ApiError::from)?;
            output_success(
                &output_format,
                &format!("Revoked access of group '{}'", group.display_name()),
                None,
            )
        }
    }
}
