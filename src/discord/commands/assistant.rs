// `/assistant` - where the AI assistant listens, plus a direct ask command.

use std::sync::Arc;

use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error, Store};
use crate::core::assistant::{split_message, AssistantService, DISCORD_MESSAGE_LIMIT};

/// AI assistant settings.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("enable", "disable", "list", "ask")
)]
pub async fn assistant(ctx: Context<'_>) -> Result<(), Error> {
    list_inner(ctx).await
}

fn service(ctx: Context<'_>) -> Result<Arc<AssistantService<Store>>, Error> {
    ctx.data()
        .assistant
        .clone()
        .ok_or_else(|| "The assistant is not configured on this bot.".into())
}

fn target_channel(ctx: Context<'_>, channel: Option<serenity::Channel>) -> u64 {
    channel
        .map(|channel| channel.id())
        .unwrap_or_else(|| ctx.channel_id())
        .get()
}

/// Let the assistant answer in a channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn enable(
    ctx: Context<'_>,
    #[description = "Channel (defaults to this one)"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let assistant = service(ctx)?;
    let channel_id = target_channel(ctx, channel);

    let reply = if assistant.enable(guild_id, channel_id).await? {
        format!(
            "✅ The assistant now answers in <#{channel_id}> when mentioned or called `{}`.",
            assistant.trigger()
        )
    } else {
        format!("The assistant is already active in <#{channel_id}>.")
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Stop the assistant from answering in a channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn disable(
    ctx: Context<'_>,
    #[description = "Channel (defaults to this one)"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let assistant = service(ctx)?;
    let channel_id = target_channel(ctx, channel);

    let reply = if assistant.disable(guild_id, channel_id).await? {
        format!("The assistant no longer answers in <#{channel_id}>.")
    } else {
        format!("The assistant was not active in <#{channel_id}>.")
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Channels where the assistant is active.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    list_inner(ctx).await
}

async fn list_inner(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let assistant = service(ctx)?;
    let channels = assistant.channels(guild_id).await;

    let reply = if channels.is_empty() {
        "The assistant is not active in any channel. Use `/assistant enable`.".to_string()
    } else {
        let list: Vec<String> = channels.iter().map(|id| format!("<#{id}>")).collect();
        format!("Assistant channels: {}", list.join(", "))
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Ask the assistant directly.
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] prompt: String,
) -> Result<(), Error> {
    let assistant = service(ctx)?;
    ctx.defer().await?;

    let answer = assistant.ask(&prompt).await?;
    for chunk in split_message(&answer, DISCORD_MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}
