use std::collections::HashMap;

use poise::serenity_prelude as serenity;

use super::{Context, Error};
use crate::discord::embeds::JELLYFIN_BLUE;

// Display order for help sections.
const CATEGORY_ORDER: &[&str] = &[
    "Media",
    "Announcements",
    "Accounts",
    "Network",
    "Assistant",
    "Utilities",
];

fn category_emoji(category: &str) -> &'static str {
    match category {
        "Media" => "🎬",
        "Announcements" => "📣",
        "Accounts" => "👤",
        "Network" => "🌐",
        "Assistant" => "🤖",
        "Utilities" => "🧰",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    note: Option<&'static str>,
}

fn command_metadata(name: &str) -> CommandMetadata {
    let (category, priority, note) = match name {
        "jellyfin" => (
            "Media",
            100,
            Some("Subcommands: setup, test, tmdb, search, status"),
        ),
        "recommend" => (
            "Media",
            90,
            Some("Subcommands: now, channel, weekly, translate"),
        ),
        "librarystats" => ("Media", 80, Some("Subcommands: show, setup, refresh, disable")),
        "newcontent" => (
            "Announcements",
            70,
            Some("Subcommands: channel, interval, check, reset, status"),
        ),
        "jellyfinmon" => (
            "Accounts",
            60,
            Some("Subcommands: status, channel, interval, thresholds, enforce, check"),
        ),
        "accounts" => (
            "Accounts",
            55,
            Some("Subcommands: create, list, delete, policy, setpolicy"),
        ),
        "portmonitor" => ("Network", 50, Some("Subcommands: add, remove, list, check")),
        "ipmonitor" => ("Network", 45, Some("Bot owners only")),
        "assistant" => ("Assistant", 40, Some("Subcommands: enable, disable, list, ask")),
        _ => ("Utilities", 0, None),
    };
    CommandMetadata {
        category,
        priority,
        note,
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        let metadata = command_metadata(&command.name);
        let description = command
            .description
            .as_deref()
            .or(command.help_text.as_deref())
            .unwrap_or("No description provided.");

        let mut entry = format!("• **/{}** - {}", command.name, description);
        if let Some(note) = metadata.note {
            entry.push_str(&format!("\n  ⤷ {note}"));
        }

        categories
            .entry(metadata.category)
            .or_default()
            .push((metadata.priority, entry));
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Command guide")
        .description("Everything the bot can do for your Jellyfin server, grouped by topic.")
        .color(JELLYFIN_BLUE)
        .timestamp(serenity::Timestamp::now());

    if let Ok(user) = ctx.framework().bot_id.to_user(&ctx).await {
        embed = embed.thumbnail(user.face());
    }

    let mut sorted_categories: Vec<_> = categories.keys().copied().collect();
    sorted_categories.sort_by(|a, b| category_rank(a).cmp(&category_rank(b)).then(a.cmp(b)));

    for category in sorted_categories {
        let Some(entries) = categories.get_mut(category) else {
            continue;
        };
        // Highest priority first, then by name.
        entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let title = format!("{} {}", category_emoji(category), category);
        let formatted: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

        for (i, chunk) in chunk_entries(&formatted).iter().enumerate() {
            let field_name = if i == 0 {
                title.clone()
            } else {
                format!("{title} (cont.)")
            };
            embed = embed.field(field_name, chunk.join("\n"), false);
        }
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Most settings need Manage Server or Administrator.",
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn category_rank(category: &str) -> usize {
    CATEGORY_ORDER
        .iter()
        .position(|&known| known == category)
        .unwrap_or(usize::MAX)
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Field values are capped at 1024.
        if current_length + entry_len + 1 > 1000 && !current_chunk.is_empty() {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1;
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_stay_under_field_limit() {
        let entries: Vec<String> = (0..40).map(|i| format!("{i:03} {}", "x".repeat(60))).collect();
        let chunks = chunk_entries(&entries);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.join("\n").len() <= 1024);
        }
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 40);
    }

    #[test]
    fn known_categories_sort_first() {
        assert!(category_rank("Media") < category_rank("Network"));
        assert_eq!(category_rank("Something else"), usize::MAX);
        assert_eq!(command_metadata("portmonitor").category, "Network");
        assert_eq!(command_metadata("unknown").category, "Utilities");
    }
}
