// Bot presence. Kept to Discord SDK types only.

use poise::serenity_prelude as serenity;

pub const DEFAULT_ACTIVITY: &str = "your Jellyfin server";

/// Show what the bot is keeping an eye on.
pub fn set_watching(ctx: &serenity::Context, what: &str) {
    let activity = serenity::ActivityData::watching(what);
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context) {
    set_watching(ctx, DEFAULT_ACTIVITY);
}
