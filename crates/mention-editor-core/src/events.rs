//! Edit events: the closed set of mutations a token model accepts.
//!
//! Surfaces never hand raw DOM mutations to a token model. They diff what
//! they observe against the model and describe the difference as
//! [`EditEvent`]s. Because edits are derived by diffing, observing the same
//! state twice yields no events.

use std::collections::HashSet;
use std::ops::Range;

use smol_str::SmolStr;

use crate::tree::MentionTree;
use crate::types::NodeKey;

/// A single edit, in linear char offsets of the text before the edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditEvent {
    InsertText { offset: usize, text: SmolStr },
    DeleteRange { range: Range<usize> },
    /// Remove a whole mention. A no-op if the key is already gone.
    DeleteAtomicNode { key: NodeKey },
}

impl EditEvent {
    pub fn insert(offset: usize, text: impl Into<SmolStr>) -> Self {
        EditEvent::InsertText {
            offset,
            text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        EditEvent::DeleteRange { range }
    }
}

/// Describe the change from `old` to `new` as at most one delete followed by
/// at most one insert.
///
/// `caret` is the caret offset in `new` after the edit. When a change sits in
/// a run of repeated characters the common prefix alone is ambiguous, and the
/// caret places the edit where the user actually typed.
pub fn diff_text(old: &str, new: &str, caret: Option<usize>) -> Vec<EditEvent> {
    if old == new {
        return Vec::new();
    }
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let mut prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let mut suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    if let Some(caret) = caret {
        let edit_end = new.len() - suffix;
        if edit_end > caret {
            let shift = (edit_end - caret).min(prefix);
            let candidate_suffix = suffix + shift;
            let suffix_matches = candidate_suffix <= old.len()
                && old[old.len() - candidate_suffix..] == new[new.len() - candidate_suffix..];
            if shift > 0 && suffix_matches {
                prefix -= shift;
                suffix = candidate_suffix;
            }
        }
    }

    let deleted = old.len() - prefix - suffix;
    let inserted: String = new[prefix..new.len() - suffix].iter().collect();

    let mut events = Vec::with_capacity(2);
    if deleted > 0 {
        events.push(EditEvent::delete(prefix..prefix + deleted));
    }
    if !inserted.is_empty() {
        events.push(EditEvent::insert(prefix, inserted));
    }
    tracing::trace!(target: "mention::sync", ?events, "diffed text");
    events
}

/// Result of reconciling an observed tree with the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub events: Vec<EditEvent>,
    /// Applying `events` to the model does not reproduce the observed tree,
    /// so the observed tree should be adopted or the surface re-rendered.
    pub diverged: bool,
}

/// Derive edit events turning `model` into `observed`.
///
/// Mentions missing from `observed` become [`EditEvent::DeleteAtomicNode`];
/// the remaining difference is diffed as plain text.
pub fn reconcile_trees(model: &MentionTree, observed: &MentionTree, caret: Option<usize>) -> Reconciled {
    let observed_keys: HashSet<NodeKey> = observed.mention_keys().into_iter().collect();
    let mut events: Vec<EditEvent> = model
        .mention_keys()
        .into_iter()
        .filter(|key| !observed_keys.contains(key))
        .map(|key| EditEvent::DeleteAtomicNode { key })
        .collect();

    let mut scratch = model.clone();
    for event in &events {
        apply_to_tree(&mut scratch, event);
    }

    let text_events = diff_text(
        &scratch.extract_plain_text(),
        &observed.extract_plain_text(),
        caret,
    );
    for event in &text_events {
        apply_to_tree(&mut scratch, event);
    }
    events.extend(text_events);

    let diverged = scratch != *observed;
    if diverged {
        tracing::warn!(
            target: "mention::sync",
            "observed tree diverges from model after reconciling"
        );
    }
    Reconciled { events, diverged }
}

/// Apply one event to a tree, returning how many mentions it removed.
pub fn apply_to_tree(tree: &mut MentionTree, event: &EditEvent) -> usize {
    match event {
        EditEvent::InsertText { offset, text } => {
            tree.insert_text(*offset, text);
            0
        }
        EditEvent::DeleteRange { range } => tree.delete_range(range.clone()).len(),
        EditEvent::DeleteAtomicNode { key } => usize::from(tree.remove_mention(*key).is_some()),
    }
}
