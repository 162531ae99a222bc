//! Mapping between linear char offsets and concrete cursor locations.
//!
//! A linear offset counts chars of the serialized text, where every mention
//! contributes its display name. A [`TreePosition`] names a text node plus an
//! in-node char offset, or a child-index boundary when no text node is
//! adjacent (e.g. between two mentions).

use crate::tree::{MentionTree, TreeNode};

/// Which way to move an offset that lands strictly inside a mention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SnapDirection {
    /// Toward the start of the mention (deletions).
    #[default]
    Backward,
    /// Toward the end of the mention (insertions).
    Forward,
}

/// A concrete cursor location inside a [`MentionTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreePosition {
    /// Char offset within the text node at index `node`.
    InText { node: usize, offset: usize },
    /// Boundary before the child at `index` (`index == len` is the end).
    Between { index: usize },
}

/// Byte index of the `char_offset`-th char, clamped to the string length.
pub fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Slice `text` by char offsets. Returns None if the range is out of bounds.
pub fn slice_chars(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let mut indices = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len()));
    let start_byte = indices.nth(start)?;
    let end_byte = if end == start {
        start_byte
    } else {
        indices.nth(end - start - 1)?
    };
    Some(&text[start_byte..end_byte])
}

/// Convert a char offset into UTF-16 code units, clamped to the text.
pub fn char_to_utf16(text: &str, char_offset: usize) -> usize {
    text.chars().take(char_offset).map(char::len_utf16).sum()
}

/// Convert UTF-16 code units into a char offset, clamped to the text.
///
/// An offset between the halves of a surrogate pair maps to the char
/// containing it.
pub fn utf16_to_char(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (i, c) in text.chars().enumerate() {
        if units >= utf16_offset {
            return i;
        }
        units += c.len_utf16();
        if units > utf16_offset {
            return i;
        }
    }
    text.chars().count()
}

/// Linear offset of a tree position.
pub fn position_to_offset(tree: &MentionTree, position: TreePosition) -> usize {
    let nodes = tree.nodes();
    match position {
        TreePosition::InText { node, offset } => {
            let before: usize = nodes.iter().take(node).map(TreeNode::len_chars).sum();
            let within = nodes
                .get(node)
                .map(|n| offset.min(n.len_chars()))
                .unwrap_or(0);
            before + within
        }
        TreePosition::Between { index } => nodes.iter().take(index).map(TreeNode::len_chars).sum(),
    }
}

/// Tree position of a linear offset.
///
/// Boundaries next to a text node resolve into that text node. Offsets
/// strictly inside a mention snap to the boundary chosen by `snap`.
pub fn offset_to_position(tree: &MentionTree, offset: usize, snap: SnapDirection) -> TreePosition {
    let nodes = tree.nodes();
    let offset = offset.min(tree.len_chars());
    let mut start = 0;

    for (i, node) in nodes.iter().enumerate() {
        let len = node.len_chars();
        match node {
            TreeNode::Text(_) => {
                if offset <= start + len {
                    return TreePosition::InText {
                        node: i,
                        offset: offset - start,
                    };
                }
            }
            TreeNode::Mention { .. } => {
                if offset == start {
                    return TreePosition::Between { index: i };
                }
                if offset < start + len {
                    tracing::trace!(
                        target: "mention::tree",
                        offset,
                        mention_index = i,
                        ?snap,
                        "snapping offset out of mention"
                    );
                    return match snap {
                        SnapDirection::Backward => boundary_before(nodes, i),
                        SnapDirection::Forward => boundary_after(nodes, i),
                    };
                }
            }
        }
        start += len;
    }

    TreePosition::Between { index: nodes.len() }
}

fn boundary_before(nodes: &[TreeNode], index: usize) -> TreePosition {
    match index.checked_sub(1).and_then(|i| nodes.get(i).map(|n| (i, n))) {
        Some((i, TreeNode::Text(text))) => TreePosition::InText {
            node: i,
            offset: text.chars().count(),
        },
        _ => TreePosition::Between { index },
    }
}

fn boundary_after(nodes: &[TreeNode], index: usize) -> TreePosition {
    match nodes.get(index + 1) {
        Some(TreeNode::Text(_)) => TreePosition::InText {
            node: index + 1,
            offset: 0,
        },
        _ => TreePosition::Between { index: index + 1 },
    }
}

/// Index of the node immediately before a position, if any.
pub fn node_before(position: TreePosition) -> Option<usize> {
    match position {
        TreePosition::InText { node, offset: 0 } => node.checked_sub(1),
        TreePosition::InText { .. } => None,
        TreePosition::Between { index } => index.checked_sub(1),
    }
}
