//! Core mention types: tokens, tracked spans, queries, caret geometry.
//!
//! These types are framework-agnostic and shared by both token models
//! (linear buffer and structured tree).

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Kind of entity a mention points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Project,
}

impl EntityType {
    /// Lowercase name, as used in DOM attributes and serialized forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Project => "project",
        }
    }

    /// Parse the lowercase name back into an entity type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(Self::Person),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved reference to a person or project.
///
/// Tokens are never mutated once materialized. Changing a mention means
/// deleting it and inserting a new one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionToken {
    /// Opaque entity identifier.
    pub id: SmolStr,
    /// Text rendered in place of the reference.
    pub display_name: SmolStr,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MentionToken {
    /// Distinguished id of the synthetic "create new" candidate.
    pub const CREATE_NEW_ID: &'static str = "__create_new__";

    pub fn new(
        id: impl Into<SmolStr>,
        display_name: impl Into<SmolStr>,
        entity_type: EntityType,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            entity_type,
            image_url: None,
        }
    }

    pub fn person(id: impl Into<SmolStr>, display_name: impl Into<SmolStr>) -> Self {
        Self::new(id, display_name, EntityType::Person)
    }

    pub fn project(id: impl Into<SmolStr>, display_name: impl Into<SmolStr>) -> Self {
        Self::new(id, display_name, EntityType::Project)
    }

    /// Builder-style image url.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Synthetic candidate offering to create a new entity named `name`.
    pub fn create_new(name: impl Into<SmolStr>, entity_type: EntityType) -> Self {
        Self::new(Self::CREATE_NEW_ID, name, entity_type)
    }

    pub fn is_create_new(&self) -> bool {
        self.id == Self::CREATE_NEW_ID
    }

    /// Length of the display name in chars.
    pub fn display_len(&self) -> usize {
        self.display_name.chars().count()
    }
}

/// Identity of one materialized mention within a surface.
///
/// Two mentions of the same entity get distinct keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub u64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl NodeKey {
    /// Parse the `m{n}` form written by `Display`.
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix('m')?.parse().ok().map(NodeKey)
    }
}

/// Monotonic allocator for [`NodeKey`]s, one per surface.
#[derive(Clone, Debug, Default)]
pub struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub fn next_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next);
        self.next += 1;
        key
    }

    /// Ensure future keys are greater than `key`.
    pub fn observe(&mut self, key: NodeKey) {
        if key.0 >= self.next {
            self.next = key.0 + 1;
        }
    }
}

/// A mention token tracked by char offsets in a linear buffer.
///
/// Valid while `buffer[start..end] == token.display_name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedMention {
    pub key: NodeKey,
    pub token: MentionToken,
    /// Char offset of the first display-name char.
    pub start: usize,
    /// Exclusive end char offset.
    pub end: usize,
}

impl TrackedMention {
    pub fn new(key: NodeKey, token: MentionToken, start: usize) -> Self {
        let end = start + token.display_len();
        Self {
            key,
            token,
            start,
            end,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if `offset` is strictly inside the span (not on either edge).
    pub fn strictly_contains(&self, offset: usize) -> bool {
        offset > self.start && offset < self.end
    }
}

/// An in-progress, unresolved mention the user is typing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Text typed after the trigger character, up to the caret.
    pub query_text: SmolStr,
    /// Char offset of the trigger character itself.
    pub trigger_offset: usize,
    /// The trigger character expected at `trigger_offset`.
    pub trigger: char,
}

impl Query {
    /// A query opened by the default `@` trigger.
    pub fn new(query_text: impl Into<SmolStr>, trigger_offset: usize) -> Self {
        Self {
            query_text: query_text.into(),
            trigger_offset,
            trigger: crate::trigger::DEFAULT_TRIGGER,
        }
    }

    pub fn with_trigger(mut self, trigger: char) -> Self {
        self.trigger = trigger;
        self
    }

    /// Char range covering the trigger character and the query text.
    pub fn span(&self) -> Range<usize> {
        self.trigger_offset..self.end_offset()
    }

    /// Char offset just past the last query char.
    pub fn end_offset(&self) -> usize {
        self.trigger_offset + 1 + self.query_text.chars().count()
    }
}

/// Pixel-space caret box used to anchor the suggestion popup.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CaretRect {
    pub top: f64,
    pub left: f64,
    pub height: f64,
}

impl CaretRect {
    pub const ORIGIN: Self = Self {
        top: 0.0,
        left: 0.0,
        height: 0.0,
    };

    pub fn new(top: f64, left: f64, height: f64) -> Self {
        Self { top, left, height }
    }

    /// Y coordinate just below the caret, where a popup would start.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_span() {
        let q = Query::new("ja", 6);
        assert_eq!(q.span(), 6..9);
        assert_eq!(q.end_offset(), 9);

        let empty = Query::new("", 0);
        assert_eq!(empty.span(), 0..1);
    }

    #[test]
    fn test_query_span_counts_chars() {
        let q = Query::new("zoë", 2);
        assert_eq!(q.end_offset(), 6);
    }

    #[test]
    fn test_tracked_mention_bounds() {
        let m = TrackedMention::new(NodeKey(0), MentionToken::person("42", "Jane Smith"), 6);
        assert_eq!(m.range(), 6..16);
        assert_eq!(m.len(), 10);
        assert!(!m.strictly_contains(6));
        assert!(m.strictly_contains(7));
        assert!(!m.strictly_contains(16));
    }

    #[test]
    fn test_node_key_roundtrip() {
        let key = NodeKey(17);
        assert_eq!(key.to_string(), "m17");
        assert_eq!(NodeKey::parse("m17"), Some(key));
        assert_eq!(NodeKey::parse("17"), None);
    }

    #[test]
    fn test_key_allocator_observe() {
        let mut keys = KeyAllocator::default();
        assert_eq!(keys.next_key(), NodeKey(0));
        keys.observe(NodeKey(9));
        assert_eq!(keys.next_key(), NodeKey(10));
    }

    #[test]
    fn test_create_new_candidate() {
        let c = MentionToken::create_new("Apollo", EntityType::Project);
        assert!(c.is_create_new());
        assert!(!MentionToken::project("p1", "Apollo").is_create_new());
    }
}
