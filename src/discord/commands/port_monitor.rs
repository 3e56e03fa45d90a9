use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};

/// Watch TCP ports and get told when they go down or come back.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("add", "remove", "list", "check")
)]
pub async fn portmonitor(ctx: Context<'_>) -> Result<(), Error> {
    list_inner(ctx).await
}

/// Start watching a host and port.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Host name or IP address"] host: String,
    #[description = "TCP port"] port: i64,
    #[description = "Where to post changes (defaults to this channel)"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let channel_id = channel
        .map(|channel| channel.id())
        .unwrap_or_else(|| ctx.channel_id())
        .get();
    let monitor = ctx
        .data()
        .ports
        .add(guild_id, &host, port, channel_id, ctx.author().id.get(), chrono::Utc::now())
        .await?;

    let state = match monitor.last_online {
        Some(true) => "🟢 currently online",
        _ => "🔴 currently offline",
    };
    ctx.say(format!(
        "✅ Watching `{}:{}` ({state}). Changes are posted in <#{channel_id}>.",
        monitor.host, monitor.port
    ))
    .await?;
    Ok(())
}

/// Stop watching a host and port.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Host name or IP address"] host: String,
    #[description = "TCP port"] port: i64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let removed = ctx.data().ports.remove(guild_id, &host, port).await?;
    ctx.say(format!("Stopped watching `{}:{}`.", removed.host, removed.port))
        .await?;
    Ok(())
}

/// List watched ports.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    list_inner(ctx).await
}

async fn list_inner(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let mut monitors = ctx.data().ports.list(guild_id).await;
    if monitors.is_empty() {
        ctx.say("No ports are being watched. Add one with `/portmonitor add`.")
            .await?;
        return Ok(());
    }
    monitors.sort_by_key(|monitor| monitor.key());

    let lines: Vec<String> = monitors
        .iter()
        .map(|monitor| {
            let icon = match monitor.last_online {
                Some(true) => "🟢",
                Some(false) => "🔴",
                None => "⚪",
            };
            format!("{icon} `{}:{}` → <#{}>", monitor.host, monitor.port, monitor.channel_id)
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Watched ports")
        .color(serenity::Colour::BLUE)
        .description(crate::discord::embeds::bounded_list(&lines, 4000));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Probe a host and port once without storing anything.
#[poise::command(slash_command, guild_only)]
pub async fn check(
    ctx: Context<'_>,
    #[description = "Host name or IP address"] host: String,
    #[description = "TCP port"] port: i64,
) -> Result<(), Error> {
    ctx.defer().await?;
    let open = ctx.data().ports.probe(&host, port).await?;
    let reply = if open {
        format!("🟢 `{host}:{port}` accepts connections.")
    } else {
        format!("🔴 `{host}:{port}` is not reachable.")
    };
    ctx.say(reply).await?;
    Ok(())
}
