// Embed builders. Pure translation from core results to Discord payloads.

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

use crate::core::media::{
    format_runtime, truncate, ActionKind, CreatedAccount, InactiveUser, InactivityReport,
    ItemCard, LibraryCount, Recommendation, SearchResults,
};
use crate::core::netwatch::{PortTransition, TransitionKind};

pub const JELLYFIN_BLUE: u32 = 0x00A4DC;
const FIELD_LIMIT: usize = 1024;
const SEARCH_OVERVIEW_LIMIT: usize = 300;

fn timestamp(at: DateTime<Utc>) -> serenity::Timestamp {
    serenity::Timestamp::from_unix_timestamp(at.timestamp()).unwrap_or_else(|_| serenity::Timestamp::now())
}

fn title_with_year(card: &ItemCard) -> String {
    match card.item.year {
        Some(year) => format!("{} ({})", card.item.name, year),
        None => card.item.name.clone(),
    }
}

/// Full card for one movie or series.
pub fn item_embed(card: &ItemCard, heading: &str) -> serenity::CreateEmbed {
    let item = &card.item;
    let mut embed = serenity::CreateEmbed::new()
        .author(serenity::CreateEmbedAuthor::new(heading))
        .title(title_with_year(card))
        .url(&card.details_url)
        .description(card.overview.clone().unwrap_or_else(|| "No description available.".to_string()))
        .color(JELLYFIN_BLUE)
        .field("Type", item.kind.label(), true)
        .field("Runtime", format_runtime(item.runtime_ticks), true);

    if let Some(rating) = item.community_rating {
        embed = embed.field("Rating", format!("⭐ {rating:.1}/10"), true);
    }
    if let Some(rating) = &item.official_rating {
        embed = embed.field("Age rating", rating, true);
    }
    if !item.genres.is_empty() {
        embed = embed.field("Genres", truncate(&item.genres.join(", "), FIELD_LIMIT), false);
    }
    if !item.studios.is_empty() {
        embed = embed.field("Studios", truncate(&item.studios.join(", "), FIELD_LIMIT), false);
    }
    embed = embed.field(
        "Links",
        format!("[Details]({}) • [▶ Play]({})", card.details_url, card.play_url),
        false,
    );
    if let Some(poster) = &card.poster_url {
        embed = embed.image(poster);
    }
    if let Some(created) = item.date_created {
        embed = embed.timestamp(timestamp(created));
    }
    embed
}

pub fn recommendation_embed(recommendation: &Recommendation) -> serenity::CreateEmbed {
    let mut embed = item_embed(&recommendation.card, "🎬 Recommendation of the week");
    if let Some(lang) = &recommendation.translated_to {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "Description translated to {lang}"
        )));
    }
    embed
}

pub fn new_content_embed(card: &ItemCard) -> serenity::CreateEmbed {
    let heading = format!("🆕 New {} on the server", card.item.kind.label().to_lowercase());
    item_embed(card, &heading)
}

/// One compact embed per search hit.
pub fn search_embeds(results: &SearchResults) -> Vec<serenity::CreateEmbed> {
    results
        .items
        .iter()
        .map(|item| {
            let url = crate::core::media::details_url(&results.base_url, &item.id);
            let title = match item.year {
                Some(year) => format!("{} ({})", item.name, year),
                None => item.name.clone(),
            };
            serenity::CreateEmbed::new()
                .title(title)
                .url(url)
                .description(truncate(
                    item.overview.as_deref().unwrap_or("No description available."),
                    SEARCH_OVERVIEW_LIMIT,
                ))
                .color(JELLYFIN_BLUE)
                .field("Type", item.kind.label(), true)
                .field("Runtime", format_runtime(item.runtime_ticks), true)
        })
        .collect()
}

fn user_line(user: &InactiveUser) -> String {
    let status = if user.already_disabled { " (disabled)" } else { "" };
    match user.last_activity {
        Some(last) => format!(
            "• **{}**{} — {} days, last seen {}",
            user.name,
            status,
            user.inactive_days,
            last.format("%Y-%m-%d")
        ),
        None => format!("• **{}**{} — never active", user.name, status),
    }
}

/// Join lines into one field value, noting how many did not fit.
pub fn bounded_list(lines: &[String], limit: usize) -> String {
    let full = lines.join("\n");
    if full.chars().count() <= limit {
        return full;
    }

    for keep in (0..lines.len()).rev() {
        let mut out = lines[..keep].join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("…and {} more", lines.len() - keep));
        if out.chars().count() <= limit {
            return out;
        }
    }
    String::new()
}

pub fn inactivity_report_embed(report: &InactivityReport) -> serenity::CreateEmbed {
    let title = if report.enforced {
        "🧹 Inactive account cleanup"
    } else {
        "🧹 Inactive account report"
    };
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(serenity::Colour::ORANGE)
        .timestamp(serenity::Timestamp::now());

    if !report.to_disable.is_empty() {
        let lines: Vec<String> = report.to_disable.iter().map(user_line).collect();
        embed = embed.field(
            format!("To disable ({})", lines.len()),
            bounded_list(&lines, FIELD_LIMIT),
            false,
        );
    }
    if !report.to_delete.is_empty() {
        let lines: Vec<String> = report.to_delete.iter().map(user_line).collect();
        embed = embed.field(
            format!("To delete ({})", lines.len()),
            bounded_list(&lines, FIELD_LIMIT),
            false,
        );
    }

    if report.enforced {
        let lines: Vec<String> = report
            .actions
            .iter()
            .map(|action| {
                let verb = match action.kind {
                    ActionKind::Disabled => "disabled",
                    ActionKind::Deleted => "deleted",
                };
                match &action.error {
                    None => format!("✅ {} {}", action.user, verb),
                    Some(err) => format!("❌ {} not {}: {}", action.user, verb, err),
                }
            })
            .collect();
        if !lines.is_empty() {
            embed = embed.field("Actions", bounded_list(&lines, FIELD_LIMIT), false);
        }
    } else {
        embed = embed.footer(serenity::CreateEmbedFooter::new(
            "Report only. Enable enforcement with /jellyfinmon enforce",
        ));
    }
    embed
}

pub fn library_stats_embed(counts: &[LibraryCount], updated: DateTime<Utc>) -> serenity::CreateEmbed {
    let total: u64 = counts.iter().map(|c| c.count).sum();
    let mut embed = serenity::CreateEmbed::new()
        .title("📚 Library statistics")
        .color(JELLYFIN_BLUE)
        .timestamp(timestamp(updated))
        .footer(serenity::CreateEmbedFooter::new(format!("{total} items in total")));

    if counts.is_empty() {
        embed = embed.description("No libraries found.");
    }
    for library in counts {
        embed = embed.field(&library.name, library.count.to_string(), true);
    }
    embed
}

pub fn port_transition_embed(transition: &PortTransition) -> serenity::CreateEmbed {
    let monitor = &transition.monitor;
    let (title, colour) = match transition.kind {
        TransitionKind::WentOffline => ("🔴 Port offline", serenity::Colour::RED),
        TransitionKind::CameOnline => ("🟢 Port back online", serenity::Colour::DARK_GREEN),
    };
    serenity::CreateEmbed::new()
        .title(title)
        .description(format!("`{}:{}`", monitor.host, monitor.port))
        .color(colour)
        .field("Watched since", monitor.added_at.format("%Y-%m-%d").to_string(), true)
        .field("Added by", format!("<@{}>", monitor.added_by), true)
        .timestamp(serenity::Timestamp::now())
}

pub fn ip_change_message(old: &str, new: &str) -> String {
    format!("🌐 **Public IP changed**\nOld: `{old}`\nNew: `{new}`")
}

/// Sent privately to whoever asked for the account.
pub fn account_embed(account: &CreatedAccount, server_url: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("Your {} account", account.server_name))
        .color(JELLYFIN_BLUE)
        .field("Server", server_url, false)
        .field("Username", &account.name, true)
        .field("Password", format!("||{}||", account.password), true)
        .footer(serenity::CreateEmbedFooter::new("Change your password after the first login."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_list_keeps_everything_that_fits() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(bounded_list(&lines, 100), "a\nb");
        assert_eq!(bounded_list(&[], 100), "");
    }

    #[test]
    fn bounded_list_reports_overflow() {
        let lines: Vec<String> = (0..50).map(|i| format!("user number {i:02}")).collect();
        let out = bounded_list(&lines, 100);
        assert!(out.chars().count() <= 100);
        assert!(out.starts_with("user number 00"));
        assert!(out.ends_with("more"));
    }

    #[test]
    fn never_active_users_are_labelled() {
        let user = InactiveUser {
            id: "1".into(),
            name: "ghost".into(),
            last_activity: None,
            inactive_days: 31,
            already_disabled: true,
        };
        assert_eq!(user_line(&user), "• **ghost** (disabled) — never active");
    }
}
