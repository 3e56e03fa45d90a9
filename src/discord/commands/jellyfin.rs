// `/jellyfin` - server connection, metadata key and library search.
//
// Thin layer: parse arguments, call the catalog service, render the result.

use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::discord::embeds::search_embeds;

/// Media server commands.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("setup", "test", "tmdb", "search", "status")
)]
pub async fn jellyfin(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(
        "Jellyfin commands:\n\
        `/jellyfin setup <url> <api_key>` - Connect this server to Jellyfin\n\
        `/jellyfin test` - Check that the server answers\n\
        `/jellyfin tmdb [api_key]` - Set or clear the TMDb key used for posters\n\
        `/jellyfin search <query>` - Search movies and series\n\
        `/jellyfin status` - Show configuration and background jobs",
    )
    .await?;
    Ok(())
}

/// Connect this Discord server to a Jellyfin instance.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Base URL, e.g. https://media.example.org"] url: String,
    #[description = "Jellyfin API key"] api_key: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer_ephemeral().await?;

    let catalog = &ctx.data().catalog;
    catalog.configure_server(guild_id, &url, &api_key).await?;

    let reply = match catalog.test_connection(guild_id).await {
        Ok(info) => format!(
            "✅ Connected to **{}** (version {}).",
            info.server_name.as_deref().unwrap_or("Jellyfin"),
            info.version.as_deref().unwrap_or("unknown")
        ),
        Err(err) => format!("⚠️ Settings saved, but the server did not answer: {err}"),
    };
    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Check that the configured server answers.
#[poise::command(slash_command, guild_only)]
pub async fn test(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let info = ctx.data().catalog.test_connection(guild_id).await?;
    ctx.say(format!(
        "✅ **{}** is reachable (version {}).",
        info.server_name.as_deref().unwrap_or("Jellyfin"),
        info.version.as_deref().unwrap_or("unknown")
    ))
    .await?;
    Ok(())
}

/// Set the TMDb API key used for posters and descriptions. Leave empty to clear it.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn tmdb(
    ctx: Context<'_>,
    #[description = "TMDb v3 API key"] api_key: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let clearing = api_key.is_none();
    ctx.data().catalog.set_tmdb_key(guild_id, api_key).await?;

    let reply = if clearing {
        "TMDb key removed. Announcements will use the server's own descriptions."
    } else {
        "✅ TMDb key saved."
    };
    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Search the library for movies and series.
#[poise::command(slash_command, guild_only)]
pub async fn search(
    ctx: Context<'_>,
    #[description = "What to look for"] query: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    let results = ctx.data().catalog.search(guild_id, &query).await?;
    if results.items.is_empty() {
        ctx.say(format!("No results for `{query}`.")).await?;
        return Ok(());
    }

    let mut reply = poise::CreateReply::default().content(format!(
        "Found {} result(s) for `{query}`:",
        results.items.len()
    ));
    for embed in search_embeds(&results) {
        reply = reply.embed(embed);
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Show the media configuration and when background jobs run next.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let data = ctx.data();
    let guild = data.settings.guild(guild_id).await;

    let channel = |id: Option<u64>| {
        id.map(|id| format!("<#{id}>"))
            .unwrap_or_else(|| "Not set".to_string())
    };

    let jobs: Vec<String> = [
        "inactivity_sweep",
        "new_content",
        "weekly_recommendation",
        "library_stats",
        "ip_monitor",
        "port_monitor",
    ]
    .iter()
    .map(|name| {
        let status = data.scheduler.status(name);
        let next = status
            .next_run
            .map(|at| format!("<t:{}:R>", at.timestamp()))
            .unwrap_or_else(|| "now".to_string());
        let state = if status.running { "🟢" } else { "🔴" };
        format!("{state} `{name}` next {next}")
    })
    .collect();

    let embed = serenity::CreateEmbed::new()
        .title("Jellyfin configuration")
        .color(serenity::Colour::BLURPLE)
        .field(
            "Server",
            guild
                .media
                .normalized_url()
                .unwrap_or_else(|| "Not configured".to_string()),
            false,
        )
        .field(
            "TMDb",
            if guild.metadata.tmdb_api_key.is_some() { "Configured" } else { "Not set" },
            true,
        )
        .field("New content", channel(guild.new_content.channel_id), true)
        .field("Recommendations", channel(guild.recommendations.channel_id), true)
        .field("Library stats", channel(guild.library_stats.channel_id), true)
        .field("Inactivity reports", channel(guild.inactivity.notification_channel_id), true)
        .field("Background jobs", jobs.join("\n"), false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Bot timezone: {}",
            data.scheduler.timezone()
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
