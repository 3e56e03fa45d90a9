use poise::serenity_prelude as serenity;

use super::{guild_id, Context, Error};
use crate::discord::embeds::recommendation_embed;

/// Random picks from the library.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("now", "channel", "weekly", "translate")
)]
pub async fn recommend(ctx: Context<'_>) -> Result<(), Error> {
    now_inner(ctx).await
}

/// Recommend something to watch right now.
#[poise::command(slash_command, guild_only)]
pub async fn now(ctx: Context<'_>) -> Result<(), Error> {
    now_inner(ctx).await
}

async fn now_inner(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.defer().await?;

    match ctx.data().catalog.recommend(guild_id).await? {
        Some(recommendation) => {
            ctx.send(poise::CreateReply::default().embed(recommendation_embed(&recommendation)))
                .await?;
        }
        None => {
            ctx.say("The library is empty, nothing to recommend.").await?;
        }
    }
    Ok(())
}

/// Set (or clear) the channel for the weekly Monday recommendation.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Channel to post in; leave empty to stop posting"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channel_id = channel.map(|c| c.id().get());
    ctx.data()
        .catalog
        .set_recommendation_channel(guild_id, channel_id)
        .await?;

    match channel_id {
        Some(id) => ctx.say(format!("✅ Weekly recommendations will be posted in <#{id}>.")).await?,
        None => ctx.say("Weekly recommendations turned off.").await?,
    };
    Ok(())
}

/// Turn the weekly recommendation on or off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn weekly(
    ctx: Context<'_>,
    #[description = "Post every Monday at 18:00"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data().catalog.set_weekly(guild_id, enabled).await?;
    ctx.say(if enabled {
        "✅ Weekly recommendation enabled."
    } else {
        "Weekly recommendation disabled."
    })
    .await?;
    Ok(())
}

/// Translate recommendation descriptions, e.g. `ro`. Leave empty to keep the original.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn translate(
    ctx: Context<'_>,
    #[description = "Target language code"] language: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    ctx.data()
        .catalog
        .set_translation(guild_id, language.clone())
        .await?;

    match language {
        Some(lang) => ctx.say(format!("✅ Descriptions will be translated to `{}`.", lang.trim().to_lowercase())).await?,
        None => ctx.say("Descriptions will be posted untranslated.").await?,
    };
    Ok(())
}
