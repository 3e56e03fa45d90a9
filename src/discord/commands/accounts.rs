// `/accounts` - create and remove Jellyfin accounts from Discord.
//
// New credentials go to the requester by DM; the channel only sees an
// ephemeral confirmation.

use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::core::media::MediaError;
use crate::discord::embeds::{account_embed, bounded_list};

/// Jellyfin account management.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("create", "list", "delete", "policy", "setpolicy")
)]
pub async fn accounts(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Account commands:\n\
        `/accounts create <name>` - Create a user and DM you the password\n\
        `/accounts list` - List users\n\
        `/accounts delete <name>` - Delete a user\n\
        `/accounts policy` - Show the policy applied to new users\n\
        `/accounts setpolicy <field> <value>` - Change one policy field",
    )
    .await?;
    Ok(())
}

async fn ephemeral(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
        .await?;
    Ok(())
}

/// Create a Jellyfin user with a random password.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "User name"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let account = match data.provisioning.create_account(guild_id, &name).await {
        Ok(account) => account,
        Err(err @ MediaError::PolicyNotApplied { .. }) => {
            return ephemeral(ctx, format!("⚠️ {err}")).await;
        }
        Err(err) => return Err(err.into()),
    };

    let server_url = data
        .settings
        .guild(guild_id)
        .await
        .media
        .normalized_url()
        .unwrap_or_default();
    let dm = serenity::CreateMessage::new().embed(account_embed(&account, &server_url));

    let reply = match ctx.author().direct_message(ctx.http(), dm).await {
        Ok(_) => format!("✅ Created **{}**. Credentials were sent to your DMs.", account.name),
        Err(err) => {
            tracing::warn!(guild_id, user = %account.name, error = %err, "could not DM new account credentials");
            format!(
                "✅ Created **{}**, but your DMs are closed.\nPassword: ||{}||",
                account.name, account.password
            )
        }
    };
    ephemeral(ctx, reply).await
}

/// List the server's users.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;

    let users = ctx.data().provisioning.list_accounts(guild_id).await?;
    if users.is_empty() {
        return ephemeral(ctx, "The server has no users.").await;
    }

    let lines: Vec<String> = users
        .iter()
        .map(|user| {
            let mut line = format!("• {}", user.name);
            if user.is_admin {
                line.push_str(" (admin)");
            }
            if user.is_disabled {
                line.push_str(" (disabled)");
            }
            line
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("Users ({})", users.len()))
        .color(serenity::Colour::DARK_GREEN)
        .description(bounded_list(&lines, 4000));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Delete a Jellyfin user.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "User name"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;

    let user = ctx.data().provisioning.delete_account(guild_id, &name).await?;
    ephemeral(ctx, format!("🗑️ Deleted **{}**.", user.name)).await
}

/// Show the policy applied to new accounts.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn policy(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let policy = ctx.data().provisioning.default_policy(guild_id).await;

    let lines: Vec<String> = policy
        .scalar_fields()
        .into_iter()
        .map(|(field, value)| format!("`{field}`: {value}"))
        .collect();
    let embed = serenity::CreateEmbed::new()
        .title("Default account policy")
        .color(serenity::Colour::DARK_GREEN)
        .description(bounded_list(&lines, 4000));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Change one field of the default policy.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setpolicy(
    ctx: Context<'_>,
    #[description = "Policy field, e.g. EnableRemoteAccess"] field: String,
    #[description = "New value"] value: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data()
        .provisioning
        .set_default_policy(guild_id, &field, &value)
        .await?;
    ephemeral(ctx, format!("✅ `{field}` set to `{value}` for new accounts.")).await
}
