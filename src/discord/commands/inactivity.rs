use chrono::Utc;
use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::discord::embeds::inactivity_report_embed;

/// Inactive account monitoring.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("status", "channel", "interval", "thresholds", "enforce", "check")
)]
pub async fn jellyfinmon(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

/// Show the monitor configuration.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

async fn status_inner(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let status = ctx.data().inactivity.status(guild_id).await;
    let settings = &status.settings;

    let embed = serenity::CreateEmbed::new()
        .title("Inactivity monitor")
        .color(serenity::Colour::ORANGE)
        .field(
            "Server",
            status.server_url.unwrap_or_else(|| "Not configured".to_string()),
            false,
        )
        .field(
            "Channel",
            settings
                .notification_channel_id
                .map(|id| format!("<#{id}>"))
                .unwrap_or_else(|| "Not set".to_string()),
            true,
        )
        .field("Interval", format!("{} h", settings.check_interval_hours), true)
        .field(
            "Thresholds",
            format!(
                "disable after {} days\ndelete after {} days",
                settings.disable_after_days, settings.delete_after_days
            ),
            true,
        )
        .field(
            "Mode",
            if settings.enforce {
                "Enforcing"
            } else {
                "Report only"
            },
            true,
        )
        .field(
            "Last check",
            settings
                .last_check
                .map(|at| format!("<t:{}:R>", at.timestamp()))
                .unwrap_or_else(|| "Never".to_string()),
            true,
        )
        .field(
            "Tracked without activity",
            settings.first_seen_inactive.len().to_string(),
            true,
        );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Where inactivity reports are posted.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Report channel"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channel_id = channel.id().get();
    ctx.data().inactivity.set_channel(guild_id, channel_id).await?;
    ctx.say(format!("✅ Inactivity reports will be posted in <#{channel_id}>."))
        .await?;
    Ok(())
}

/// Hours between sweeps.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn interval(
    ctx: Context<'_>,
    #[description = "Hours between checks"]
    #[min = 1]
    #[max = 8760]
    hours: u64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().inactivity.set_interval(guild_id, hours).await?;
    ctx.say(format!("✅ Checking for inactive users every {hours} hour(s)."))
        .await?;
    Ok(())
}

/// Days of inactivity before disabling and before deleting.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn thresholds(
    ctx: Context<'_>,
    #[description = "Disable after this many days"] disable_after: u32,
    #[description = "Delete after this many days"] delete_after: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data()
        .inactivity
        .set_thresholds(guild_id, disable_after, delete_after)
        .await?;
    ctx.say(format!(
        "✅ Users are disabled after {disable_after} days and deleted after {delete_after} days."
    ))
    .await?;
    Ok(())
}

/// Actually disable and delete accounts instead of only reporting them.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn enforce(
    ctx: Context<'_>,
    #[description = "Act on inactive users"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().inactivity.set_enforce(guild_id, enabled).await?;
    let reply = if enabled {
        "⚠️ Enforcement on: inactive users will be disabled and deleted."
    } else {
        "Enforcement off: sweeps only report."
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Run a sweep now.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn check(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let report = ctx.data().inactivity.sweep(guild_id, Utc::now()).await?;
    if report.is_empty() {
        ctx.say("✅ No inactive users found.").await?;
        return Ok(());
    }
    ctx.send(poise::CreateReply::default().embed(inactivity_report_embed(&report)))
        .await?;
    Ok(())
}
