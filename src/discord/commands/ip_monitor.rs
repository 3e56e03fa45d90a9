// `/ipmonitor` - bot-owner controls for the public IP watcher.
// The monitor is global, not per guild, so only owners may touch it.

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use super::{Context, Error};
use crate::core::netwatch::{notify_targets, IpCheck, IpNotifyTarget};
use crate::discord::tasks::ip_monitor_task::{check_and_notify, notify};
use crate::discord::tasks::IpMonitorTask;

/// Public IP change notifications.
#[poise::command(
    slash_command,
    owners_only,
    subcommands("status", "check", "testsend", "forcesave", "user", "channel", "time", "toggle")
)]
pub async fn ipmonitor(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

/// Show the monitor configuration.
#[poise::command(slash_command, owners_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

async fn status_inner(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let settings = data.ip_watch.status().await;
    let targets = notify_targets(&settings);
    let target = if targets.is_empty() {
        "Nobody".to_string()
    } else {
        targets
            .into_iter()
            .map(describe_target)
            .collect::<Vec<_>>()
            .join(", then ")
    };
    let next_run = data
        .scheduler
        .status("ip_monitor")
        .next_run
        .map(|at| format!("<t:{}:R>", at.timestamp()))
        .unwrap_or_else(|| "-".to_string());

    let embed = serenity::CreateEmbed::new()
        .title("IP monitor")
        .color(serenity::Colour::TEAL)
        .field("Enabled", if settings.enabled { "Yes" } else { "No" }, true)
        .field(
            "Daily check",
            format!("{} ({})", settings.check_time, data.scheduler.timezone()),
            true,
        )
        .field("Next run", next_run, true)
        .field("Notify", target, true)
        .field(
            "Last known IP",
            settings
                .last_ip
                .map(|ip| format!("`{ip}`"))
                .unwrap_or_else(|| "None".to_string()),
            true,
        );
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Check the public IP now and notify on change.
#[poise::command(slash_command, owners_only)]
pub async fn check(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let reply = match check_and_notify(&ctx.data().ip_watch, ctx.http()).await? {
        IpCheck::Baseline(ip) => format!("Stored `{ip}` as the reference address."),
        IpCheck::Unchanged(ip) => format!("No change, still `{ip}`."),
        IpCheck::Changed { old, new } => format!("Changed from `{old}` to `{new}`."),
    };
    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

fn describe_target(target: IpNotifyTarget) -> String {
    match target {
        IpNotifyTarget::Channel(id) => format!("<#{id}>"),
        IpNotifyTarget::User(id) => format!("DM to <@{id}>"),
    }
}

/// Send a test notification to the configured target.
#[poise::command(slash_command, owners_only)]
pub async fn testsend(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let body = "🧪 **IP monitor test**\nNotifications from the IP monitor will arrive here.";
    let reply = match notify(&ctx.data().ip_watch, ctx.http(), body).await {
        Ok(Some(target)) => format!("✅ Test message delivered to {}.", describe_target(target)),
        Ok(None) => "Nobody is configured. Use `/ipmonitor user` or `/ipmonitor channel` first."
            .to_string(),
        Err(err) => format!("❌ Delivery failed: {err}"),
    };
    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Store the current IP without notifying anyone.
#[poise::command(slash_command, owners_only)]
pub async fn forcesave(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let ip = ctx.data().ip_watch.force_save().await?;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("Saved `{ip}`."))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Send change notifications to this user by DM.
#[poise::command(slash_command, owners_only)]
pub async fn user(
    ctx: Context<'_>,
    #[description = "User to notify"] user: serenity::User,
) -> Result<(), Error> {
    ctx.data().ip_watch.set_user(user.id.get()).await?;
    ctx.say(format!("✅ <@{}> will be notified of IP changes.", user.id))
        .await?;
    Ok(())
}

/// Post change notifications in a channel. Leave empty to go back to DMs.
#[poise::command(slash_command, owners_only)]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Notification channel"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let channel_id = channel.map(|channel| channel.id().get());
    ctx.data().ip_watch.set_channel(channel_id).await?;
    let reply = match channel_id {
        Some(id) => format!("✅ IP changes will be posted in <#{id}>."),
        None => "✅ IP changes will be sent by DM.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Daily check time, HH:MM in the bot's timezone.
#[poise::command(slash_command, owners_only)]
pub async fn time(
    ctx: Context<'_>,
    #[description = "Time of day, e.g. 08:30"] time: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let parsed = data.ip_watch.set_check_time(&time).await?;
    // Replaces the running loop so the new slot is used right away.
    data.scheduler.spawn(IpMonitorTask::new(
        Arc::clone(&data.ip_watch),
        ctx.serenity_context().http.clone(),
    ));
    ctx.say(format!(
        "✅ The IP is checked daily at {} ({}).",
        parsed.format("%H:%M"),
        data.scheduler.timezone()
    ))
    .await?;
    Ok(())
}

/// Turn the monitor on or off.
#[poise::command(slash_command, owners_only)]
pub async fn toggle(ctx: Context<'_>) -> Result<(), Error> {
    let enabled = ctx.data().ip_watch.toggle().await?;
    let reply = if enabled {
        "IP monitor enabled."
    } else {
        "IP monitor disabled."
    };
    ctx.say(reply).await?;
    Ok(())
}
