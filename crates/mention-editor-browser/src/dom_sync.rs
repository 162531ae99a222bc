//! DOM to model synchronization for contenteditable surfaces.
//!
//! [`render_tree`] writes a [`MentionTree`] into an element: text runs become
//! text nodes, mentions become non-editable spans keyed by
//! `data-mention-key`. [`read_tree`] walks whatever the browser left in the
//! element and rebuilds a tree from it, so edits can be derived by
//! reconciling the two. Both sides count line breaks the way
//! [`crate::cursor`] does.

use std::collections::HashSet;

use mention_editor_core::{
    EntityType, MentionError, MentionToken, MentionTree, NodeKey, Result, TreeNode,
};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, Node};

use crate::cursor::{block_prefix, is_mention_element, is_placeholder_break};

pub const MENTION_KEY_ATTR: &str = "data-mention-key";
pub const MENTION_ID_ATTR: &str = "data-mention-id";
pub const ENTITY_TYPE_ATTR: &str = "data-entity-type";
pub const IMAGE_URL_ATTR: &str = "data-image-url";
/// Marks the `<br>` that keeps a trailing empty line visible.
pub const FILLER_ATTR: &str = "data-mention-filler";

/// Build the element for one mention.
pub fn create_mention_element(key: NodeKey, token: &MentionToken) -> Result<Element> {
    let document = gloo_utils::document();
    let span = document
        .create_element("span")
        .map_err(|e| MentionError::dom(format!("create_element failed: {:?}", e)))?;

    let set = |name: &str, value: &str| {
        span.set_attribute(name, value)
            .map_err(|e| MentionError::dom(format!("set_attribute {} failed: {:?}", name, e)))
    };
    set("contenteditable", "false")?;
    set(MENTION_KEY_ATTR, &key.to_string())?;
    set(MENTION_ID_ATTR, &token.id)?;
    set(ENTITY_TYPE_ATTR, token.entity_type.as_str())?;
    if let Some(url) = &token.image_url {
        set(IMAGE_URL_ATTR, url)?;
    }
    set(
        "class",
        &format!("mention mention-{}", token.entity_type.as_str()),
    )?;
    span.set_text_content(Some(&token.display_name));
    Ok(span)
}

/// Replace the children of `root` with the rendering of `tree`.
pub fn render_tree(root: &HtmlElement, tree: &MentionTree) -> Result<()> {
    let document = gloo_utils::document();
    root.set_text_content(None);

    for node in tree.nodes() {
        let child: Node = match node {
            TreeNode::Text(text) => document.create_text_node(text).into(),
            TreeNode::Mention { key, token } => create_mention_element(*key, token)?.into(),
        };
        root.append_child(&child)
            .map_err(|e| MentionError::dom(format!("append_child failed: {:?}", e)))?;
    }

    // A trailing newline in a text node does not open a visible line.
    let trailing_newline = matches!(tree.nodes().last(), Some(TreeNode::Text(t)) if t.ends_with('\n'));
    if trailing_newline {
        let filler = document
            .create_element("br")
            .map_err(|e| MentionError::dom(format!("create_element failed: {:?}", e)))?;
        filler
            .set_attribute(FILLER_ATTR, "")
            .map_err(|e| MentionError::dom(format!("set_attribute failed: {:?}", e)))?;
        root.append_child(&filler)
            .map_err(|e| MentionError::dom(format!("append_child failed: {:?}", e)))?;
    }

    tracing::trace!(
        target: "mention::dom",
        nodes = tree.nodes().len(),
        "rendered mention tree"
    );
    Ok(())
}

/// Token for a mention element: the model's token when the key is known and
/// the rendered name still matches, otherwise rebuilt from the attributes.
fn token_for(element: &Element, key: Option<NodeKey>, model: &MentionTree) -> MentionToken {
    let display_name = element.text_content().unwrap_or_default();
    let known = key.and_then(|key| {
        model.nodes().iter().find_map(|n| match n {
            TreeNode::Mention { key: k, token } if *k == key => Some(token),
            _ => None,
        })
    });
    if let Some(token) = known {
        // A mismatched name stays mismatched so reconciliation sees the
        // divergence.
        if token.display_name == display_name.as_str() {
            return token.clone();
        }
    }

    let id = element.get_attribute(MENTION_ID_ATTR).unwrap_or_default();
    let entity_type = element
        .get_attribute(ENTITY_TYPE_ATTR)
        .and_then(|t| EntityType::parse(&t))
        .unwrap_or(EntityType::Person);
    let token = MentionToken::new(id, display_name, entity_type);
    match element.get_attribute(IMAGE_URL_ATTR) {
        Some(url) => token.with_image(url),
        None => token,
    }
}

fn collect(node: &Node, model: &MentionTree, out: &mut Vec<(Option<NodeKey>, TreeNode)>) {
    let list = node.child_nodes();
    for i in 0..list.length() {
        let Some(child) = list.item(i) else { continue };

        if let Some(text) = child.dyn_ref::<web_sys::Text>() {
            if let Some(data) = text.text_content() {
                out.push((None, TreeNode::text(data)));
            }
            continue;
        }

        let Some(element) = child.dyn_ref::<Element>() else {
            continue;
        };

        if is_mention_element(&child) {
            let key = element
                .get_attribute(MENTION_KEY_ATTR)
                .and_then(|k| NodeKey::parse(&k));
            let token = token_for(element, key, model);
            out.push((key, TreeNode::mention(NodeKey(0), token)));
        } else if element.tag_name().eq_ignore_ascii_case("BR") {
            if !is_placeholder_break(&child) {
                out.push((None, TreeNode::text("\n")));
            }
        } else {
            // Browsers may wrap new lines in block elements.
            if block_prefix(&child) > 0 {
                out.push((None, TreeNode::text("\n")));
            }
            collect(&child, model, out);
        }
    }
}

/// Rebuild a tree from the children of `root`.
///
/// Mention keys are taken from `data-mention-key`. Elements without a
/// usable key, or whose key repeats (pasted copies), get fresh keys.
pub fn read_tree(root: &HtmlElement, model: &MentionTree) -> MentionTree {
    let mut raw = Vec::new();
    collect(root, model, &mut raw);

    let mut seen = HashSet::new();
    let mut next_fresh = raw
        .iter()
        .filter_map(|(key, _)| key.map(|k| k.0 + 1))
        .chain(model.mention_keys().iter().map(|k| k.0 + 1))
        .max()
        .unwrap_or(0);

    let nodes = raw
        .into_iter()
        .map(|(key, node)| match node {
            TreeNode::Mention { token, .. } => {
                let key = match key {
                    Some(key) if seen.insert(key) => key,
                    _ => {
                        let fresh = NodeKey(next_fresh);
                        next_fresh += 1;
                        seen.insert(fresh);
                        fresh
                    }
                };
                TreeNode::mention(key, token)
            }
            text => text,
        })
        .collect();

    MentionTree::from_nodes(nodes)
}
