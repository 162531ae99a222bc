//! Selection API handling for contenteditable surfaces.
//!
//! Maps between DOM positions `(node, offset)` and linear char offsets. A
//! mention element counts as its display name and is never entered: DOM
//! positions inside one snap to its edges, and linear offsets strictly
//! inside one resolve to the boundary after it.
//!
//! Line breaks count one char each, whether the browser wrote a `<br>` or
//! wrapped the line in a block element. A block counts its break before
//! its content, unless it is the first child of its parent. Placeholder
//! breaks count nothing: the `<br>` a browser puts in an empty block, and
//! the filler `<br>` [`render_tree`](crate::dom_sync::render_tree) appends
//! after a trailing newline.

use std::ops::Range;

use mention_editor_core::{CaretRect, MentionError, Result, char_to_utf16, utf16_to_char};
use wasm_bindgen::JsCast;
use web_sys::{Element, Node};

use crate::dom_sync::{FILLER_ATTR, MENTION_KEY_ATTR};

const TEXT_NODE: u16 = 3;
const ELEMENT_NODE: u16 = 1;

/// Is `node` a rendered mention element?
pub fn is_mention_element(node: &Node) -> bool {
    node.node_type() == ELEMENT_NODE
        && node
            .dyn_ref::<Element>()
            .is_some_and(|el| el.has_attribute(MENTION_KEY_ATTR))
}

fn is_line_break(node: &Node) -> bool {
    node.node_type() == ELEMENT_NODE && node.node_name().eq_ignore_ascii_case("BR")
}

fn is_block(node: &Node) -> bool {
    node.node_type() == ELEMENT_NODE
        && !is_mention_element(node)
        && matches!(node.node_name().to_ascii_uppercase().as_str(), "DIV" | "P")
}

/// Is `node` a `<br>` that holds a line open without adding a char?
pub fn is_placeholder_break(node: &Node) -> bool {
    if !is_line_break(node) {
        return false;
    }
    let filler = node
        .dyn_ref::<Element>()
        .is_some_and(|el| el.has_attribute(FILLER_ATTR));
    let sole_child_of_block = node.parent_node().is_some_and(|parent| {
        is_block(&parent) && node.previous_sibling().is_none() && node.next_sibling().is_none()
    });
    filler || sole_child_of_block
}

/// Chars a block element contributes before its content: the break that
/// starts its line.
pub fn block_prefix(node: &Node) -> usize {
    usize::from(is_block(node) && node.previous_sibling().is_some())
}

fn children(node: &Node) -> Vec<Node> {
    let list = node.child_nodes();
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn text_of(node: &Node) -> String {
    node.text_content().unwrap_or_default()
}

/// Chars a DOM subtree contributes to the linear text.
pub fn measure_node(node: &Node) -> usize {
    if node.node_type() == TEXT_NODE || is_mention_element(node) {
        text_of(node).chars().count()
    } else if is_line_break(node) {
        usize::from(!is_placeholder_break(node))
    } else {
        block_prefix(node) + children(node).iter().map(measure_node).sum::<usize>()
    }
}

/// The mention element enclosing `node`, stopping at `root`.
pub fn enclosing_mention(root: &Node, node: &Node) -> Option<Node> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if n.is_same_node(Some(root)) {
            return None;
        }
        if is_mention_element(&n) {
            return Some(n);
        }
        current = n.parent_node();
    }
    None
}

/// Linear offset at which `target` starts, including a block's leading
/// break.
fn start_offset(container: &Node, target: &Node) -> Option<usize> {
    let mut acc = 0;
    for child in children(container) {
        if child.is_same_node(Some(target)) {
            return Some(acc);
        }
        if child.contains(Some(target)) {
            return start_offset(&child, target).map(|o| acc + block_prefix(&child) + o);
        }
        acc += measure_node(&child);
    }
    None
}

/// Convert a DOM position under `root` to a linear char offset.
///
/// Returns None when the position is outside `root`.
pub fn dom_position_to_offset(root: &Node, node: &Node, offset: u32) -> Option<usize> {
    if !root.contains(Some(node)) {
        return None;
    }

    if let Some(mention) = enclosing_mention(root, node) {
        let start = start_offset(root, &mention)?;
        // Anywhere but the very start of the mention counts as after it.
        let at_start = offset == 0
            && (node.is_same_node(Some(&mention)) || node.previous_sibling().is_none());
        return Some(if at_start {
            start
        } else {
            start + measure_node(&mention)
        });
    }

    let base = if node.is_same_node(Some(root)) {
        0
    } else {
        start_offset(root, node)? + block_prefix(node)
    };

    if node.node_type() == TEXT_NODE {
        return Some(base + utf16_to_char(&text_of(node), offset as usize));
    }

    let before: usize = children(node)
        .iter()
        .take(offset as usize)
        .map(measure_node)
        .sum();
    Some(base + before)
}

/// Convert a linear char offset to a DOM position under `container`.
///
/// A boundary between a text node and a mention resolves into the text
/// node. Offsets past the end land at the container's end.
pub fn offset_to_dom_position(container: &Node, offset: usize) -> (Node, u32) {
    let nodes = children(container);
    let mut acc = 0;
    for (index, child) in nodes.iter().enumerate() {
        let len = measure_node(child);
        if child.node_type() == TEXT_NODE {
            if offset <= acc + len {
                let text = text_of(child);
                let utf16 = char_to_utf16(&text, offset - acc);
                return (child.clone(), utf16 as u32);
            }
        } else if is_mention_element(child) || is_line_break(child) {
            if offset == acc {
                return (container.clone(), index as u32);
            }
            if offset < acc + len {
                tracing::trace!(target: "mention::cursor", offset, "snapping caret out of mention");
                return (container.clone(), index as u32 + 1);
            }
        } else {
            let prefix = block_prefix(child);
            if offset < acc + prefix {
                // On the break that starts the block.
                return (container.clone(), index as u32);
            }
            if offset <= acc + len {
                return offset_to_dom_position(child, offset - acc - prefix);
            }
        }
        acc += len;
    }
    (container.clone(), nodes.len() as u32)
}

/// Read the caret from the window selection, if it lies inside `root`.
pub fn read_caret(root: &Node) -> Option<usize> {
    let selection = web_sys::window()?.get_selection().ok()??;
    let focus = selection.focus_node()?;
    dom_position_to_offset(root, &focus, selection.focus_offset())
}

/// Read the window selection as an ordered linear range, if both ends lie
/// inside `root`.
pub fn read_selection(root: &Node) -> Option<Range<usize>> {
    let selection = web_sys::window()?.get_selection().ok()??;
    let anchor = dom_position_to_offset(root, &selection.anchor_node()?, selection.anchor_offset())?;
    let focus = dom_position_to_offset(root, &selection.focus_node()?, selection.focus_offset())?;
    Some(anchor.min(focus)..anchor.max(focus))
}

/// Place a collapsed selection at linear `offset` within `root`.
pub fn restore_caret(root: &Node, offset: usize) -> Result<()> {
    let (node, node_offset) = offset_to_dom_position(root, offset);

    tracing::trace!(
        target: "mention::cursor",
        offset,
        node_offset,
        "restoring caret"
    );

    let window = web_sys::window().ok_or_else(|| MentionError::dom("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| MentionError::dom("no document"))?;
    let selection = window
        .get_selection()
        .map_err(|e| MentionError::dom(format!("get_selection failed: {:?}", e)))?
        .ok_or_else(|| MentionError::dom("no selection object"))?;
    let range = document
        .create_range()
        .map_err(|e| MentionError::dom(format!("create_range failed: {:?}", e)))?;

    range
        .set_start(&node, node_offset)
        .map_err(|e| MentionError::dom(format!("set_start failed: {:?}", e)))?;
    range.collapse_with_to_start(true);

    selection
        .remove_all_ranges()
        .map_err(|e| MentionError::dom(format!("remove_all_ranges failed: {:?}", e)))?;
    selection
        .add_range(&range)
        .map_err(|e| MentionError::dom(format!("add_range failed: {:?}", e)))?;

    Ok(())
}

/// Viewport rect of a collapsed range at linear `offset` within `root`.
///
/// Collapsed ranges at element boundaries often report an empty rect, so
/// those fall back to the adjacent element's edge.
pub fn caret_rect_at(root: &Node, offset: usize) -> Result<CaretRect> {
    let (node, node_offset) = offset_to_dom_position(root, offset);

    let range = gloo_utils::document()
        .create_range()
        .map_err(|e| MentionError::dom(format!("create_range failed: {:?}", e)))?;
    range
        .set_start(&node, node_offset)
        .map_err(|e| MentionError::dom(format!("set_start failed: {:?}", e)))?;
    range.collapse_with_to_start(true);

    let rect = range.get_bounding_client_rect();
    if rect.height() > 0.0 {
        return Ok(CaretRect::new(rect.y(), rect.x(), rect.height()));
    }

    let child_list = node.child_nodes();
    let fallback = child_list
        .item(node_offset)
        .and_then(|n| n.dyn_into::<Element>().ok())
        .map(|el| {
            let r = el.get_bounding_client_rect();
            CaretRect::new(r.y(), r.x(), r.height())
        })
        .or_else(|| {
            node_offset
                .checked_sub(1)
                .and_then(|i| child_list.item(i))
                .and_then(|n| n.dyn_into::<Element>().ok())
                .map(|el| {
                    let r = el.get_bounding_client_rect();
                    CaretRect::new(r.y(), r.right(), r.height())
                })
        })
        .or_else(|| {
            node.dyn_ref::<Element>().map(|el| {
                let r = el.get_bounding_client_rect();
                CaretRect::new(r.y(), r.x(), 0.0)
            })
        });

    fallback.ok_or_else(|| MentionError::geometry("collapsed range has no rect"))
}
