//! Persisted form of a mention-bearing text: the plain text plus structured
//! token spans.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{MentionError, Result};
use crate::offset::slice_chars;
use crate::tree::{MentionTree, TreeNode};
use crate::types::{EntityType, MentionToken, NodeKey, TrackedMention};

/// One mention span in [`StoredContent`], in char offsets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMention {
    pub id: SmolStr,
    pub display_name: SmolStr,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl StoredMention {
    pub fn token(&self) -> MentionToken {
        MentionToken {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            entity_type: self.entity_type,
            image_url: self.image_url.clone(),
        }
    }
}

impl From<&TrackedMention> for StoredMention {
    fn from(m: &TrackedMention) -> Self {
        Self {
            id: m.token.id.clone(),
            display_name: m.token.display_name.clone(),
            entity_type: m.token.entity_type,
            image_url: m.token.image_url.clone(),
            start: m.start,
            end: m.end,
        }
    }
}

/// Text plus the mentions embedded in it, ordered by `start`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContent {
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<StoredMention>,
}

impl StoredContent {
    pub fn new(text: impl Into<String>, mentions: &[TrackedMention]) -> Self {
        let mut mentions: Vec<StoredMention> = mentions.iter().map(StoredMention::from).collect();
        mentions.sort_by_key(|m| m.start);
        Self {
            text: text.into(),
            mentions,
        }
    }

    /// Plain text with no mentions.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mentions: Vec::new(),
        }
    }

    /// Check that spans are ordered, disjoint, and hold their display names.
    pub fn validate(&self) -> Result<()> {
        let mut last_end = 0;
        for m in &self.mentions {
            if m.start < last_end {
                return Err(MentionError::InvalidStored(format!(
                    "mention at {} overlaps the previous one",
                    m.start
                )));
            }
            if slice_chars(&self.text, m.start, m.end) != Some(m.display_name.as_str()) {
                return Err(MentionError::InvalidStored(format!(
                    "span {}..{} does not hold {:?}",
                    m.start, m.end, m.display_name
                )));
            }
            last_end = m.end;
        }
        Ok(())
    }

    /// Spans as tracked mentions with fresh keys, in order.
    pub fn tracked(&self) -> Vec<TrackedMention> {
        self.mentions
            .iter()
            .enumerate()
            .map(|(i, m)| TrackedMention {
                key: NodeKey(i as u64),
                token: m.token(),
                start: m.start,
                end: m.end,
            })
            .collect()
    }

    /// Build a tree. Validates first so no span is split.
    pub fn to_tree(&self) -> Result<MentionTree> {
        self.validate()?;
        let mut nodes = Vec::with_capacity(self.mentions.len() * 2 + 1);
        let mut cursor = 0;
        for (mention, tracked) in self.mentions.iter().zip(self.tracked()) {
            if let Some(text) = slice_chars(&self.text, cursor, mention.start) {
                nodes.push(TreeNode::text(text));
            }
            nodes.push(TreeNode::mention(tracked.key, tracked.token));
            cursor = mention.end;
        }
        let len = self.text.chars().count();
        if let Some(text) = slice_chars(&self.text, cursor, len) {
            nodes.push(TreeNode::text(text));
        }
        Ok(MentionTree::from_nodes(nodes))
    }

    pub fn from_tree(tree: &MentionTree) -> Self {
        Self::new(tree.extract_plain_text(), &tree.mention_spans())
    }
}

/// Rebuild mentions for legacy plain text by searching for known display
/// names.
///
/// This is lossy: any literal occurrence of a display name becomes a
/// mention, and two entities sharing a display name cannot be told apart
/// (the first in `known` wins). Longer names are matched first.
pub fn reannotate(text: &str, known: &[MentionToken]) -> StoredContent {
    let mut candidates: Vec<&MentionToken> = known
        .iter()
        .filter(|t| !t.display_name.is_empty())
        .collect();
    candidates.sort_by_key(|t| std::cmp::Reverse(t.display_len()));

    let chars: Vec<char> = text.chars().collect();
    let mut mentions = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let hit = candidates.iter().find(|t| {
            let name: Vec<char> = t.display_name.chars().collect();
            chars[i..].starts_with(&name)
        });
        match hit {
            Some(token) => {
                let tracked = TrackedMention::new(NodeKey(mentions.len() as u64), (*token).clone(), i);
                i = tracked.end;
                mentions.push(tracked);
            }
            None => i += 1,
        }
    }
    tracing::debug!(target: "mention::sync", found = mentions.len(), "re-annotated plain text");
    StoredContent::new(text, &mentions)
}
