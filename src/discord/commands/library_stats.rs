use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::discord::embeds::library_stats_embed;
use crate::discord::tasks::library_stats_task::publish;

/// Per-library item counts.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("show", "setup", "refresh", "disable")
)]
pub async fn librarystats(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

/// Show the current counts here.
#[poise::command(slash_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

async fn show_inner(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;
    let counts = ctx.data().library_stats.library_counts(guild_id).await?;
    ctx.send(poise::CreateReply::default().embed(library_stats_embed(&counts, Utc::now())))
        .await?;
    Ok(())
}

/// Keep a stats message in a channel, refreshed daily.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Channel for the stats message"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let service = &ctx.data().library_stats;
    service.set_channel(guild_id, channel.id().get()).await?;
    let target = service
        .target(guild_id)
        .await
        .ok_or("stats channel was not saved")?;
    publish(service, ctx.http(), target).await?;

    ctx.say(format!("✅ Library stats posted in <#{}>.", target.channel_id))
        .await?;
    Ok(())
}

/// Refresh the stats message now.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn refresh(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let service = &ctx.data().library_stats;
    let Some(target) = service.target(guild_id).await else {
        ctx.say("No stats channel yet. Use `/librarystats setup`.").await?;
        return Ok(());
    };
    publish(service, ctx.http(), target).await?;
    ctx.say("✅ Library stats refreshed.").await?;
    Ok(())
}

/// Stop updating the stats message.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().library_stats.disable(guild_id).await?;
    ctx.say("Library stats disabled.").await?;
    Ok(())
}
