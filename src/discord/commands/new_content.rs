use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::discord::tasks::new_content_task::announce;

/// Announcements for movies and series added to the server.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("channel", "interval", "check", "reset", "status")
)]
pub async fn newcontent(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Post new arrivals in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Announcement channel"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channel_id = channel.id().get();
    ctx.data().new_content.set_channel(guild_id, channel_id).await?;
    ctx.say(format!("✅ New content will be announced in <#{channel_id}>."))
        .await?;
    Ok(())
}

/// How often to look for new items, in hours.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn interval(
    ctx: Context<'_>,
    #[description = "Hours between checks"]
    #[min = 1]
    #[max = 8760]
    hours: u64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().new_content.set_interval(guild_id, hours).await?;
    ctx.say(format!("✅ Checking for new content every {hours} hour(s)."))
        .await?;
    Ok(())
}

/// Check for new items right away.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn check(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let data = ctx.data();
    let Some(channel_id) = data.new_content.settings(guild_id).await.channel_id else {
        ctx.say("Set a channel first with `/newcontent channel`.").await?;
        return Ok(());
    };

    let first_run = data.new_content.settings(guild_id).await.last_check.is_none();
    let posted = announce(&data.new_content, ctx.http(), guild_id, channel_id).await?;

    let reply = if first_run {
        "Starting point recorded. Items added from now on will be announced.".to_string()
    } else if posted == 0 {
        "Nothing new since the last check.".to_string()
    } else {
        format!("Announced {posted} new item(s) in <#{channel_id}>.")
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Forget the last check; the next run records a new starting point.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().new_content.reset(guild_id).await?;
    ctx.say("New content tracking reset.").await?;
    Ok(())
}

/// Show the announcement settings.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let settings = ctx.data().new_content.settings(guild_id).await;

    let embed = serenity::CreateEmbed::new()
        .title("New content announcements")
        .color(serenity::Colour::BLURPLE)
        .field(
            "Channel",
            settings
                .channel_id
                .map(|id| format!("<#{id}>"))
                .unwrap_or_else(|| "Not set".to_string()),
            true,
        )
        .field("Interval", format!("{} h", settings.check_interval_hours), true)
        .field(
            "Last check",
            settings
                .last_check
                .map(|at| format!("<t:{}:f>", at.timestamp()))
                .unwrap_or_else(|| "Never".to_string()),
            true,
        );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
