//! Trigger detection: is the caret sitting at the end of an unresolved
//! `@query`?

use crate::types::{Query, TrackedMention};

/// Character that opens a mention query unless configured otherwise.
pub const DEFAULT_TRIGGER: char = '@';

/// Detect a query ending at `caret` using the default trigger.
pub fn detect_trigger(text: &str, caret: usize) -> Option<Query> {
    detect_trigger_with(text, caret, DEFAULT_TRIGGER)
}

/// Detect a query ending at `caret` (char offset).
///
/// Looks at the text before the caret, takes the last trigger character, and
/// returns everything after it as the query. Whitespace in the query means
/// the user moved on. A caret past the end is clamped.
pub fn detect_trigger_with(text: &str, caret: usize, trigger: char) -> Option<Query> {
    detect_in_window(text, 0, caret, trigger)
}

/// Detect a query whose search window starts at `window_start`.
///
/// Offsets are absolute char offsets into `text`.
pub fn detect_in_window(
    text: &str,
    window_start: usize,
    caret: usize,
    trigger: char,
) -> Option<Query> {
    let before: Vec<char> = text.chars().take(caret).collect();
    let window = before.get(window_start..)?;

    let trigger_index = window.iter().rposition(|&c| c == trigger)?;
    let query: String = window[trigger_index + 1..].iter().collect();
    if query.chars().any(char::is_whitespace) {
        tracing::trace!(target: "mention::trigger", %query, "query contains whitespace");
        return None;
    }

    let trigger_offset = window_start + trigger_index;
    tracing::trace!(target: "mention::trigger", %query, trigger_offset, "trigger detected");
    Some(Query::new(query, trigger_offset).with_trigger(trigger))
}

/// Detect a query in a linear buffer without looking inside tracked mentions.
///
/// The window starts after the last mention ending at or before the caret.
/// A caret strictly inside a mention never yields a query.
pub fn detect_with_mentions(
    text: &str,
    caret: usize,
    mentions: &[TrackedMention],
    trigger: char,
) -> Option<Query> {
    let caret = caret.min(text.chars().count());
    if mentions.iter().any(|m| m.strictly_contains(caret)) {
        return None;
    }
    let window_start = mentions
        .iter()
        .filter(|m| m.end <= caret)
        .map(|m| m.end)
        .max()
        .unwrap_or(0);
    detect_in_window(text, window_start, caret, trigger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MentionToken, NodeKey};

    #[test]
    fn test_simple_query() {
        assert_eq!(detect_trigger("hello @jo", 9), Some(Query::new("jo", 6)));
    }

    #[test]
    fn test_whitespace_ends_query() {
        assert_eq!(detect_trigger("hello @jo smith", 15), None);
    }

    #[test]
    fn test_bare_trigger_is_empty_query() {
        assert_eq!(detect_trigger("@", 1), Some(Query::new("", 0)));
    }

    #[test]
    fn test_no_trigger() {
        assert_eq!(detect_trigger("hello", 5), None);
        assert_eq!(detect_trigger("", 0), None);
    }

    #[test]
    fn test_last_trigger_wins() {
        assert_eq!(detect_trigger("a@b@c", 5), Some(Query::new("c", 3)));
    }

    #[test]
    fn test_caret_limits_query() {
        // Only text before the caret counts.
        assert_eq!(detect_trigger("hi @jones", 6), Some(Query::new("jo", 3)));
        assert_eq!(detect_trigger("hi @jones", 3), None);
    }

    #[test]
    fn test_caret_past_end_clamps() {
        assert_eq!(detect_trigger("@ann", 99), Some(Query::new("ann", 0)));
    }

    #[test]
    fn test_custom_trigger() {
        assert_eq!(
            detect_trigger_with("see #apo", 8, '#'),
            Some(Query::new("apo", 4).with_trigger('#'))
        );
        assert_eq!(detect_trigger_with("see @apo", 8, '#'), None);
    }

    #[test]
    fn test_non_ascii_offsets_are_chars() {
        assert_eq!(detect_trigger("café @zoë", 9), Some(Query::new("zoë", 5)));
    }

    #[test]
    fn test_mentions_bound_the_window() {
        // "@Acme Co" is a materialized mention whose display name has a trigger.
        let text = "hi @Acme Co";
        let mention = TrackedMention::new(NodeKey(0), MentionToken::project("1", "@Acme Co"), 3);
        assert_eq!(detect_with_mentions(text, 11, &[mention.clone()], '@'), None);
        assert_eq!(detect_with_mentions(text, 5, &[mention.clone()], '@'), None);

        let text = "hi @Acme Co @b";
        assert_eq!(
            detect_with_mentions(text, 14, &[mention], '@'),
            Some(Query::new("b", 12))
        );
    }
}
