use super::types::Turn;

const SKILL_TOPIC: (&str, &[&str]) = (
    "discussed skills/projects",
    &["skill", "project", "experience"],
);
const HIRING_TOPIC: (&str, &[&str]) = (
    "discussed contact/hiring",
    &["contact", "hire", "work"],
);

/// Lossy summary of everything older than the last `keep_recent` turns.
///
/// Returns `""` when there are no older turns or no topic matched;
/// otherwise `"Earlier: <tag>, <tag>"` with tags in a fixed order.
pub fn summarize_turns(turns: &[Turn], keep_recent: usize) -> String {
    if turns.len() <= keep_recent {
        return String::new();
    }

    let older = &turns[..turns.len() - keep_recent];
    let tags: Vec<&str> = [SKILL_TOPIC, HIRING_TOPIC]
        .iter()
        .filter(|(_, words)| older.iter().any(|t| mentions_any(&t.user_text, words)))
        .map(|(tag, _)| *tag)
        .collect();

    if tags.is_empty() {
        return String::new();
    }

    format!("Earlier: {}", tags.join(", "))
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}
