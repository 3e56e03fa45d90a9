pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Returns the question addressed to the bot, if any.
///
/// A message is addressed to the bot when it mentions it (`<@id>` or
/// `<@!id>`) or starts with `trigger` as a whole word, ignoring case. The
/// mention and trigger are removed; a blank remainder means there is nothing
/// to answer.
pub fn extract_prompt(content: &str, bot_id: u64, trigger: &str) -> Option<String> {
    let mentions = [format!("<@{bot_id}>"), format!("<@!{bot_id}>")];
    let mentioned = mentions.iter().any(|m| content.contains(m.as_str()));

    let mut text = content.to_string();
    if mentioned {
        for mention in &mentions {
            text = text.replace(mention.as_str(), "");
        }
    }

    let trimmed = text.trim_start();
    let triggered = starts_with_word(trimmed, trigger);
    if !mentioned && !triggered {
        return None;
    }

    let rest = if triggered {
        &trimmed[trigger.len()..]
    } else {
        trimmed
    };
    let prompt = rest
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '!'))
        .trim();

    (!prompt.is_empty()).then(|| prompt.to_string())
}

fn starts_with_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let Some(head) = text.get(..word.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(word)
        && text[word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric())
}

/// Splits `text` into pieces of at most `limit` characters. A piece ends at a
/// word boundary when possible: after a newline in its second half, else after
/// a space in its second half, else with a hard cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(idx, _)| idx);
        let window = &rest[..hard_end];
        let in_second_half = |idx: usize| window[..idx].chars().count() >= limit / 2;
        let end = if rest[hard_end..].starts_with(char::is_whitespace) {
            hard_end
        } else if let Some(idx) = window.rfind('\n').filter(|idx| in_second_half(*idx)) {
            idx + 1
        } else if let Some(idx) = window.rfind(' ').filter(|idx| in_second_half(*idx)) {
            idx + 1
        } else {
            hard_end
        };
        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}
