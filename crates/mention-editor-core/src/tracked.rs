//! Linear-buffer token model: mentions tracked by char offsets.
//!
//! A tracked mention is only trusted while the buffer still holds its display
//! name at its span. Every edit runs one pass that evicts overlapping
//! mentions, validates the rest at the position they would move to, and only
//! then shifts the survivors.

use std::ops::Range;

use crate::error::{MentionError, Result};
use crate::offset::slice_chars;
use crate::text::TextBuffer;
use crate::types::{KeyAllocator, MentionToken, NodeKey, Query, TrackedMention};

/// Drop every mention whose span no longer holds its display name.
pub fn validate(mentions: Vec<TrackedMention>, text: &str) -> Vec<TrackedMention> {
    mentions
        .into_iter()
        .filter(|m| {
            let valid = slice_chars(text, m.start, m.end) == Some(m.token.display_name.as_str());
            if !valid {
                tracing::trace!(
                    target: "mention::sync",
                    key = %m.key,
                    start = m.start,
                    end = m.end,
                    "dropping stale mention"
                );
            }
            valid
        })
        .collect()
}

/// Shift mentions starting at or after `edit_offset` by `delta` chars.
pub fn shift_after_edit(
    mentions: Vec<TrackedMention>,
    edit_offset: usize,
    delta: isize,
) -> Vec<TrackedMention> {
    mentions
        .into_iter()
        .map(|mut m| {
            if m.start >= edit_offset {
                m.start = m.start.saturating_add_signed(delta);
                m.end = m.end.saturating_add_signed(delta);
            }
            m
        })
        .collect()
}

/// The set of mentions tracked in one linear buffer, ordered by `start`.
#[derive(Clone, Debug, Default)]
pub struct TrackedMentions {
    mentions: Vec<TrackedMention>,
    keys: KeyAllocator,
}

impl TrackedMentions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt existing spans, e.g. restored from storage, dropping any that do
    /// not match `text` or overlap an earlier span.
    pub fn from_spans(spans: Vec<TrackedMention>, text: &str) -> Self {
        let mut keys = KeyAllocator::default();
        for m in &spans {
            keys.observe(m.key);
        }
        let mut mentions = validate(spans, text);
        mentions.sort_by_key(|m| m.start);
        let mut last_end = 0;
        mentions.retain(|m| {
            let ok = m.start >= last_end;
            if ok {
                last_end = m.end;
            }
            ok
        });
        Self { mentions, keys }
    }

    pub fn as_slice(&self) -> &[TrackedMention] {
        &self.mentions
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn get(&self, key: NodeKey) -> Option<&TrackedMention> {
        self.mentions.iter().find(|m| m.key == key)
    }

    /// Record a splice of `range` (pre-edit offsets) replaced by
    /// `inserted_len` chars. `text_after` is the buffer after the splice.
    ///
    /// Returns the evicted mentions.
    pub fn apply_splice(
        &mut self,
        range: Range<usize>,
        inserted_len: usize,
        text_after: &str,
    ) -> Vec<TrackedMention> {
        let delta = inserted_len as isize - range.len() as isize;
        let mut evicted = Vec::new();
        let mut kept = Vec::with_capacity(self.mentions.len());

        for m in std::mem::take(&mut self.mentions) {
            let before = m.end <= range.start;
            let after = m.start >= range.end;
            if !before && !after {
                tracing::trace!(target: "mention::sync", key = %m.key, ?range, "edit overlaps mention");
                evicted.push(m);
                continue;
            }

            let shift = if after { delta } else { 0 };
            let start = m.start.saturating_add_signed(shift);
            let end = m.end.saturating_add_signed(shift);
            if slice_chars(text_after, start, end) == Some(m.token.display_name.as_str()) {
                kept.push(m);
            } else {
                tracing::trace!(target: "mention::sync", key = %m.key, start, end, "dropping stale mention");
                evicted.push(m);
            }
        }

        self.mentions = shift_after_edit(kept, range.start, delta);
        if delta != 0 {
            tracing::trace!(target: "mention::sync", edit_offset = range.start, delta, "shifted mentions");
        }
        evicted
    }

    /// Splice `token`'s display name plus one space over the query span.
    ///
    /// Returns the new mention's key and the caret offset after the space.
    pub fn insert<B: TextBuffer>(
        &mut self,
        buffer: &mut B,
        token: MentionToken,
        query: &Query,
    ) -> Result<(NodeKey, usize)> {
        if token.display_name.is_empty() {
            return Err(MentionError::EmptyDisplayName {
                id: token.id.to_string(),
            });
        }
        let span = query.span();
        let typed = buffer.slice(span.start + 1..span.end);
        if span.end > buffer.len_chars()
            || buffer.char_at(span.start) != Some(query.trigger)
            || typed.as_deref() != Some(query.query_text.as_str())
        {
            return Err(MentionError::StaleQuery {
                start: span.start,
                end: span.end,
            });
        }
        if self.mentions.iter().any(|m| m.start < span.end && m.end > span.start) {
            return Err(MentionError::StaleQuery {
                start: span.start,
                end: span.end,
            });
        }

        let replacement = format!("{} ", token.display_name);
        let inserted_len = replacement.chars().count();
        buffer.replace(span.clone(), &replacement);
        let text_after = buffer.to_string();
        self.apply_splice(span.clone(), inserted_len, &text_after);

        let key = self.keys.next_key();
        let mention = TrackedMention::new(key, token, span.start);
        let at = self.mentions.partition_point(|m| m.start < mention.start);
        self.mentions.insert(at, mention);

        let caret = span.start + inserted_len;
        tracing::debug!(target: "mention::sync", %key, caret, "inserted tracked mention");
        Ok((key, caret))
    }

    /// If the caret sits exactly at a mention's end, delete its whole span.
    ///
    /// Returns the removed mention; the new caret is its `start`.
    pub fn delete_at_boundary<B: TextBuffer>(
        &mut self,
        buffer: &mut B,
        caret: usize,
    ) -> Option<TrackedMention> {
        let key = self.mentions.iter().find(|m| m.end == caret)?.key;
        self.delete_mention(buffer, key)
    }

    /// Delete the mention with `key` and its span. Missing keys are a no-op.
    pub fn delete_mention<B: TextBuffer>(
        &mut self,
        buffer: &mut B,
        key: NodeKey,
    ) -> Option<TrackedMention> {
        let index = self.mentions.iter().position(|m| m.key == key)?;
        let mention = self.mentions.remove(index);
        buffer.delete(mention.range());
        let text_after = buffer.to_string();
        self.apply_splice(mention.range(), 0, &text_after);
        tracing::debug!(target: "mention::sync", %key, "deleted tracked mention");
        Some(mention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::EditorRope;
    use crate::types::EntityType;

    fn jane() -> MentionToken {
        MentionToken::person("42", "Jane Smith")
    }

    fn with_jane(text: &str, query: Query) -> (EditorRope, TrackedMentions) {
        let mut buffer = EditorRope::from_str(text);
        let mut mentions = TrackedMentions::new();
        mentions.insert(&mut buffer, jane(), &query).unwrap();
        (buffer, mentions)
    }

    #[test]
    fn test_insert_replaces_query() {
        let mut buffer = EditorRope::from_str("hello @ja");
        let mut mentions = TrackedMentions::new();
        let (key, caret) = mentions
            .insert(&mut buffer, jane(), &Query::new("ja", 6))
            .unwrap();

        assert_eq!(buffer.to_string(), "hello Jane Smith ");
        assert_eq!(caret, 17);
        assert_eq!(mentions.get(key).map(|m| m.range()), Some(6..16));
    }

    #[test]
    fn test_insert_stale_query_is_rejected() {
        let mut buffer = EditorRope::from_str("hello @j");
        let mut mentions = TrackedMentions::new();
        let err = mentions
            .insert(&mut buffer, jane(), &Query::new("ja", 6))
            .unwrap_err();
        assert_eq!(err, MentionError::StaleQuery { start: 6, end: 9 });
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_insert_requires_trigger_at_query_start() {
        let mut buffer = EditorRope::from_str("hello #ja");
        let mut mentions = TrackedMentions::new();
        let err = mentions
            .insert(&mut buffer, jane(), &Query::new("ja", 6))
            .unwrap_err();
        assert_eq!(err, MentionError::StaleQuery { start: 6, end: 9 });
        assert_eq!(buffer.to_string(), "hello #ja");

        // The same text is fine for a query opened by `#`.
        mentions
            .insert(&mut buffer, jane(), &Query::new("ja", 6).with_trigger('#'))
            .unwrap();
        assert_eq!(buffer.to_string(), "hello Jane Smith ");
    }

    #[test]
    fn test_insert_rejects_empty_display_name() {
        let mut buffer = EditorRope::from_str("hi @");
        let mut mentions = TrackedMentions::new();
        let err = mentions
            .insert(&mut buffer, MentionToken::create_new("", EntityType::Person), &Query::new("", 3))
            .unwrap_err();
        assert!(matches!(err, MentionError::EmptyDisplayName { .. }));
        assert_eq!(buffer.to_string(), "hi @");
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_edit_before_mention_shifts_it() {
        let (mut buffer, mut mentions) = with_jane("hello @ja", Query::new("ja", 6));
        buffer.insert(0, "oh ");
        let evicted = mentions.apply_splice(0..0, 3, &buffer.to_string());

        assert!(evicted.is_empty());
        let m = &mentions.as_slice()[0];
        assert_eq!(m.range(), 9..19);
        assert_eq!(buffer.slice(m.range()).as_deref(), Some("Jane Smith"));
    }

    #[test]
    fn test_insert_at_start_shifts_and_at_end_does_not() {
        let (mut buffer, mut mentions) = with_jane("@j", Query::new("j", 0));
        buffer.insert(0, "x");
        mentions.apply_splice(0..0, 1, &buffer.to_string());
        assert_eq!(mentions.as_slice()[0].range(), 1..11);

        buffer.insert(11, "!");
        mentions.apply_splice(11..11, 1, &buffer.to_string());
        assert_eq!(mentions.as_slice()[0].range(), 1..11);
        assert_eq!(buffer.to_string(), "xJane Smith! ");
    }

    #[test]
    fn test_delete_inside_mention_evicts_it() {
        for i in 6..16 {
            let (mut buffer, mut mentions) = with_jane("hello @ja", Query::new("ja", 6));
            buffer.delete(i..i + 1);
            let evicted = mentions.apply_splice(i..i + 1, 0, &buffer.to_string());
            assert_eq!(evicted.len(), 1, "deleting char {i}");
            assert!(mentions.is_empty());
        }
    }

    #[test]
    fn test_delete_at_boundary_removes_span() {
        let (mut buffer, mut mentions) = with_jane("hi @j", Query::new("j", 3));
        assert!(mentions.delete_at_boundary(&mut buffer, 14).is_none());

        let removed = mentions.delete_at_boundary(&mut buffer, 13).unwrap();
        assert_eq!(removed.token, jane());
        assert_eq!(buffer.to_string(), "hi  ");
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_later_mentions_shift_on_boundary_delete() {
        let (mut buffer, mut mentions) = with_jane("@j ", Query::new("j", 0));
        // Buffer: "Jane Smith  " then a second mention typed after it.
        buffer.insert(12, "@a");
        mentions.apply_splice(12..12, 2, &buffer.to_string());
        mentions
            .insert(&mut buffer, MentionToken::project("7", "Apollo"), &Query::new("a", 12))
            .unwrap();
        assert_eq!(buffer.to_string(), "Jane Smith  Apollo ");

        mentions.delete_at_boundary(&mut buffer, 10).unwrap();
        assert_eq!(buffer.to_string(), "  Apollo ");
        assert_eq!(mentions.as_slice()[0].range(), 2..8);
    }

    #[test]
    fn test_validate_and_shift_helpers() {
        let m = TrackedMention::new(NodeKey(0), MentionToken::person("1", "Ann"), 2);
        assert_eq!(validate(vec![m.clone()], "hiAnn").len(), 1);
        assert!(validate(vec![m.clone()], "hiAnt").is_empty());

        let shifted = shift_after_edit(vec![m.clone()], 2, -2);
        assert_eq!(shifted[0].range(), 0..3);
        let untouched = shift_after_edit(vec![m], 3, 5);
        assert_eq!(untouched[0].range(), 2..5);
    }

    #[test]
    fn test_from_spans_drops_mismatches() {
        let good = TrackedMention::new(NodeKey(3), MentionToken::person("1", "Ann"), 0);
        let bad = TrackedMention::new(NodeKey(4), MentionToken::person("2", "Bob"), 4);
        let mentions = TrackedMentions::from_spans(vec![bad, good], "Ann Bib");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions.as_slice()[0].key, NodeKey(3));
    }
}
