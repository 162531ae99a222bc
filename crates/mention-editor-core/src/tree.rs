//! Structured document model: an ordered sequence of text runs and atomic
//! mention nodes.
//!
//! Mentions are indivisible. They can be inserted or removed as a unit but
//! never partially edited, so the tree needs no span validation. Plain text
//! is derived by walking the nodes in order.

use std::ops::Range;

use crate::error::{MentionError, Result};
use crate::offset::{self, SnapDirection, TreePosition};
use crate::types::{KeyAllocator, MentionToken, NodeKey, Query, TrackedMention};

/// One child of a [`MentionTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeNode {
    Text(String),
    Mention { key: NodeKey, token: MentionToken },
}

impl TreeNode {
    pub fn text(s: impl Into<String>) -> Self {
        TreeNode::Text(s.into())
    }

    pub fn mention(key: NodeKey, token: MentionToken) -> Self {
        TreeNode::Mention { key, token }
    }

    /// Length in chars of the text this node contributes.
    pub fn len_chars(&self) -> usize {
        match self {
            TreeNode::Text(text) => text.chars().count(),
            TreeNode::Mention { token, .. } => token.display_len(),
        }
    }

    pub fn is_mention(&self) -> bool {
        matches!(self, TreeNode::Mention { .. })
    }

    pub fn mention_key(&self) -> Option<NodeKey> {
        match self {
            TreeNode::Mention { key, .. } => Some(*key),
            TreeNode::Text(_) => None,
        }
    }
}

/// A mention removed from the tree by an edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedMention {
    pub key: NodeKey,
    pub token: MentionToken,
}

/// Ordered text runs and atomic mentions.
///
/// Kept normalized: no empty text runs and no two adjacent text runs.
#[derive(Clone, Debug, Default)]
pub struct MentionTree {
    nodes: Vec<TreeNode>,
    keys: KeyAllocator,
}

impl PartialEq for MentionTree {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl MentionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_nodes(vec![TreeNode::text(text)])
    }

    /// Build from raw nodes, normalizing and reserving every mention key.
    pub fn from_nodes(nodes: Vec<TreeNode>) -> Self {
        let mut keys = KeyAllocator::default();
        for key in nodes.iter().filter_map(TreeNode::mention_key) {
            keys.observe(key);
        }
        let mut tree = Self { nodes, keys };
        tree.normalize();
        tree
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len_chars(&self) -> usize {
        self.nodes.iter().map(TreeNode::len_chars).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a key for a mention about to be added from outside the tree.
    pub fn allocate_key(&mut self) -> NodeKey {
        self.keys.next_key()
    }

    /// Concatenate text runs and mention display names in order.
    pub fn extract_plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                TreeNode::Text(text) => out.push_str(text),
                TreeNode::Mention { token, .. } => out.push_str(&token.display_name),
            }
        }
        out
    }

    /// Mentions in document order with their linear spans.
    pub fn mention_spans(&self) -> Vec<TrackedMention> {
        let mut spans = Vec::new();
        let mut start = 0;
        for node in &self.nodes {
            if let TreeNode::Mention { key, token } = node {
                spans.push(TrackedMention::new(*key, token.clone(), start));
            }
            start += node.len_chars();
        }
        spans
    }

    pub fn mention_keys(&self) -> Vec<NodeKey> {
        self.nodes.iter().filter_map(TreeNode::mention_key).collect()
    }

    /// The text run containing `caret` and the linear offset where it starts.
    ///
    /// Returns None when the caret is not inside or at the edge of a text run
    /// (between two mentions, or strictly inside one).
    pub fn text_run_at(&self, caret: usize) -> Option<(usize, &str)> {
        let mut start = 0;
        for node in &self.nodes {
            let len = node.len_chars();
            match node {
                TreeNode::Text(text) if caret <= start + len => {
                    return (caret >= start).then_some((start, text.as_str()));
                }
                TreeNode::Mention { .. } if caret > start && caret < start + len => return None,
                _ => {}
            }
            start += len;
        }
        None
    }

    /// Replace a query span inside one text run with an atomic mention node
    /// followed by a single space.
    ///
    /// Returns the new node's key and the caret offset just past the space.
    pub fn insert_atomic(&mut self, token: MentionToken, query: &Query) -> Result<(NodeKey, usize)> {
        if token.display_name.is_empty() {
            return Err(MentionError::EmptyDisplayName {
                id: token.id.to_string(),
            });
        }
        let span = query.span();
        let stale = || MentionError::StaleQuery {
            start: span.start,
            end: span.end,
        };

        let TreePosition::InText { node, offset } =
            offset::offset_to_position(self, span.start, SnapDirection::Forward)
        else {
            return Err(stale());
        };
        let Some(TreeNode::Text(run)) = self.nodes.get(node) else {
            return Err(stale());
        };
        let run_len = run.chars().count();
        if offset + span.len() > run_len {
            return Err(stale());
        }
        let trigger = offset::slice_chars(run, offset, offset + 1);
        let typed = offset::slice_chars(run, offset + 1, offset + span.len());
        if trigger.and_then(|t| t.chars().next()) != Some(query.trigger)
            || typed != Some(query.query_text.as_str())
        {
            return Err(stale());
        }

        let split_at = offset::char_to_byte(run, offset);
        let resume_at = offset::char_to_byte(run, offset + span.len());
        let before = run[..split_at].to_string();
        let after = format!(" {}", &run[resume_at..]);

        let key = self.keys.next_key();
        let display_len = token.display_len();
        self.nodes.splice(
            node..=node,
            [
                TreeNode::Text(before),
                TreeNode::Mention { key, token },
                TreeNode::Text(after),
            ],
        );
        self.normalize();

        let caret = span.start + display_len + 1;
        tracing::debug!(target: "mention::tree", %key, caret, "inserted atomic mention");
        Ok((key, caret))
    }

    /// Remove the mention immediately before `caret`, if there is one.
    ///
    /// Returns the removed mention and the new caret offset.
    pub fn delete_atomic(&mut self, caret: usize) -> Option<(RemovedMention, usize)> {
        let position = offset::offset_to_position(self, caret, SnapDirection::Backward);
        let index = offset::node_before(position)?;
        let TreeNode::Mention { key, .. } = self.nodes.get(index)? else {
            return None;
        };
        let key = *key;
        let start: usize = self.nodes[..index].iter().map(TreeNode::len_chars).sum();
        let removed = self.remove_mention(key)?;
        tracing::debug!(target: "mention::tree", %key, "deleted atomic mention at caret");
        Some((removed, start))
    }

    /// Remove the mention with `key`. Missing keys are a no-op.
    pub fn remove_mention(&mut self, key: NodeKey) -> Option<RemovedMention> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.mention_key() == Some(key))?;
        let TreeNode::Mention { key, token } = self.nodes.remove(index) else {
            return None;
        };
        self.normalize();
        Some(RemovedMention { key, token })
    }

    /// Insert plain text at a linear offset.
    ///
    /// Offsets inside a mention snap past it.
    pub fn insert_text(&mut self, at: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        match offset::offset_to_position(self, at, SnapDirection::Forward) {
            TreePosition::InText { node, offset } => {
                if let Some(TreeNode::Text(run)) = self.nodes.get_mut(node) {
                    let byte = offset::char_to_byte(run, offset);
                    run.insert_str(byte, text);
                }
            }
            TreePosition::Between { index } => {
                self.nodes.insert(index, TreeNode::text(text));
            }
        }
        self.normalize();
    }

    /// Delete a linear range. Any mention overlapping it is removed whole.
    pub fn delete_range(&mut self, range: Range<usize>) -> Vec<RemovedMention> {
        let mut removed = Vec::new();
        if range.start >= range.end {
            return removed;
        }

        let mut kept = Vec::with_capacity(self.nodes.len());
        let mut start = 0;
        for node in std::mem::take(&mut self.nodes) {
            let len = node.len_chars();
            let end = start + len;
            match node {
                TreeNode::Text(text) => {
                    let cut_from = range.start.clamp(start, end) - start;
                    let cut_to = range.end.clamp(start, end) - start;
                    if cut_from == cut_to {
                        kept.push(TreeNode::Text(text));
                    } else {
                        let mut run = String::with_capacity(text.len());
                        run.push_str(&text[..offset::char_to_byte(&text, cut_from)]);
                        run.push_str(&text[offset::char_to_byte(&text, cut_to)..]);
                        kept.push(TreeNode::Text(run));
                    }
                }
                TreeNode::Mention { key, token } => {
                    if start < range.end && end > range.start {
                        removed.push(RemovedMention { key, token });
                    } else {
                        kept.push(TreeNode::Mention { key, token });
                    }
                }
            }
            start = end;
        }
        self.nodes = kept;
        self.normalize();
        removed
    }

    /// Merge adjacent text runs and drop empty ones.
    pub fn normalize(&mut self) {
        let mut out: Vec<TreeNode> = Vec::with_capacity(self.nodes.len());
        for node in std::mem::take(&mut self.nodes) {
            match (out.last_mut(), node) {
                (_, TreeNode::Text(text)) if text.is_empty() => {}
                (Some(TreeNode::Text(prev)), TreeNode::Text(text)) => prev.push_str(&text),
                (_, node) => out.push(node),
            }
        }
        self.nodes = out;
    }
}
