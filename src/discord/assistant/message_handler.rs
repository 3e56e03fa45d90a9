// Answers messages in assistant channels that mention the bot or start with
// the trigger word.

use poise::serenity_prelude as serenity;

use crate::core::assistant::{split_message, DISCORD_MESSAGE_LIMIT};
use crate::discord::{Data, Error};

const APOLOGY: &str = "Sorry, I couldn't come up with an answer right now. Please try again later.";

pub async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }
    let Some(assistant) = &data.assistant else {
        return Ok(());
    };

    let bot_id = ctx.cache.current_user().id.get();
    let Some(prompt) = assistant.prompt_for(message.channel_id.get(), &message.content, bot_id)
    else {
        return Ok(());
    };

    let _ = message.channel_id.broadcast_typing(&ctx.http).await;

    let answer = match assistant.ask(&prompt).await {
        Ok(answer) => answer,
        Err(err) => {
            tracing::error!(
                channel_id = message.channel_id.get(),
                error = %err,
                "assistant request failed"
            );
            message.reply(&ctx.http, APOLOGY).await?;
            return Ok(());
        }
    };

    let mut chunks = split_message(&answer, DISCORD_MESSAGE_LIMIT).into_iter();
    if let Some(first) = chunks.next() {
        message.reply(&ctx.http, first).await?;
    }
    for chunk in chunks {
        message.channel_id.say(&ctx.http, chunk).await?;
    }
    Ok(())
}
