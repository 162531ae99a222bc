//! Editable-surface capability trait and its two model implementations.
//!
//! The session drives any [`MentionSurface`]. [`LinearSurface`] keeps the
//! text in a [`TextBuffer`] and tracks mentions by offset; [`TreeSurface`]
//! keeps a [`MentionTree`] with atomic mention nodes. The browser crate wraps
//! each of these with a DOM element.

use crate::error::{MentionError, Result};
use crate::events::{self, EditEvent};
use crate::geometry::{CaretLayout, MonospaceLayout};
use crate::stored::StoredContent;
use crate::text::{EditorRope, TextBuffer};
use crate::tracked::TrackedMentions;
use crate::tree::MentionTree;
use crate::trigger;
use crate::types::{CaretRect, MentionToken, NodeKey, Query, TrackedMention};

/// What the session needs from an editable surface.
pub trait MentionSurface {
    /// Caret as a linear char offset.
    fn caret(&self) -> usize;

    fn set_caret(&mut self, caret: usize);

    /// Query ending at the caret, ignoring text inside mentions.
    fn detect_trigger(&self, trigger: char) -> Option<Query>;

    /// Viewport caret rect at `offset`.
    fn measure_caret(&self, offset: usize, min_height: f64) -> Result<CaretRect>;

    /// Viewport position of the surface's top-left corner. Anchors the popup
    /// when caret measurement fails.
    fn origin(&self) -> CaretRect {
        CaretRect::ORIGIN
    }

    /// Replace the query span with a mention plus one space and move the
    /// caret past the space.
    fn insert_token(&mut self, token: MentionToken, query: &Query) -> Result<NodeKey>;

    /// Remove the mention ending exactly at the caret.
    fn delete_at_boundary(&mut self) -> Option<MentionToken>;

    fn apply_edit(&mut self, event: &EditEvent);

    /// Plain text with mentions rendered as their display names.
    fn serialize(&self) -> String;

    /// Mentions in document order with linear spans.
    fn mentions(&self) -> Vec<TrackedMention>;

    fn stored(&self) -> StoredContent {
        StoredContent::new(self.serialize(), &self.mentions())
    }

    /// Replace the whole content. The caret moves to the end.
    fn load(&mut self, content: &StoredContent) -> Result<()>;
}

/// Linear buffer plus offset-tracked mentions.
#[derive(Debug, Clone, Default)]
pub struct LinearSurface<B = EditorRope, L = MonospaceLayout> {
    buffer: B,
    mentions: TrackedMentions,
    caret: usize,
    layout: L,
}

impl<B: TextBuffer + Default, L: CaretLayout> LinearSurface<B, L> {
    pub fn new(layout: L) -> Self {
        Self {
            buffer: B::default(),
            mentions: TrackedMentions::new(),
            caret: 0,
            layout,
        }
    }
}

impl<B: TextBuffer, L: CaretLayout> LinearSurface<B, L> {
    pub fn with_buffer(buffer: B, layout: L) -> Self {
        let caret = buffer.len_chars();
        Self {
            buffer,
            mentions: TrackedMentions::new(),
            caret,
            layout,
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn tracked(&self) -> &TrackedMentions {
        &self.mentions
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut L {
        &mut self.layout
    }
}

impl<B: TextBuffer, L: CaretLayout> MentionSurface for LinearSurface<B, L> {
    fn caret(&self) -> usize {
        self.caret
    }

    fn set_caret(&mut self, caret: usize) {
        self.caret = caret.min(self.buffer.len_chars());
    }

    fn detect_trigger(&self, trigger: char) -> Option<Query> {
        trigger::detect_with_mentions(
            &self.buffer.to_string(),
            self.caret,
            self.mentions.as_slice(),
            trigger,
        )
    }

    fn measure_caret(&self, offset: usize, min_height: f64) -> Result<CaretRect> {
        self.layout
            .measure(&self.buffer.to_string(), offset, min_height)
    }

    fn origin(&self) -> CaretRect {
        layout_origin(&self.layout)
    }

    fn insert_token(&mut self, token: MentionToken, query: &Query) -> Result<NodeKey> {
        let (key, caret) = self.mentions.insert(&mut self.buffer, token, query)?;
        self.caret = caret;
        Ok(key)
    }

    fn delete_at_boundary(&mut self) -> Option<MentionToken> {
        let removed = self
            .mentions
            .delete_at_boundary(&mut self.buffer, self.caret)?;
        self.caret = removed.start;
        Some(removed.token)
    }

    fn apply_edit(&mut self, event: &EditEvent) {
        match event {
            EditEvent::InsertText { offset, text } => {
                let offset = (*offset).min(self.buffer.len_chars());
                self.buffer.insert(offset, text);
                let text_after = self.buffer.to_string();
                self.mentions
                    .apply_splice(offset..offset, text.chars().count(), &text_after);
            }
            EditEvent::DeleteRange { range } => {
                let len = self.buffer.len_chars();
                let range = range.start.min(len)..range.end.min(len);
                if range.is_empty() {
                    return;
                }
                self.buffer.delete(range.clone());
                let text_after = self.buffer.to_string();
                self.mentions.apply_splice(range, 0, &text_after);
            }
            EditEvent::DeleteAtomicNode { key } => {
                self.mentions.delete_mention(&mut self.buffer, *key);
            }
        }
        self.caret = self.caret.min(self.buffer.len_chars());
    }

    fn serialize(&self) -> String {
        self.buffer.to_string()
    }

    fn mentions(&self) -> Vec<TrackedMention> {
        self.mentions.as_slice().to_vec()
    }

    fn load(&mut self, content: &StoredContent) -> Result<()> {
        content.validate()?;
        self.buffer.delete(0..self.buffer.len_chars());
        self.buffer.insert(0, &content.text);
        self.mentions = TrackedMentions::from_spans(content.tracked(), &content.text);
        self.caret = self.buffer.len_chars();
        Ok(())
    }
}

/// Structured tree with atomic mention nodes.
#[derive(Debug, Clone, Default)]
pub struct TreeSurface<L = MonospaceLayout> {
    tree: MentionTree,
    caret: usize,
    layout: L,
}

impl<L: CaretLayout> TreeSurface<L> {
    pub fn new(layout: L) -> Self {
        Self {
            tree: MentionTree::new(),
            caret: 0,
            layout,
        }
    }

    pub fn tree(&self) -> &MentionTree {
        &self.tree
    }

    /// Adopt an observed tree wholesale, e.g. after the DOM diverged from
    /// anything edit events can describe.
    pub fn replace_tree(&mut self, tree: MentionTree) {
        self.tree = tree;
        self.caret = self.caret.min(self.tree.len_chars());
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }
}

impl<L: CaretLayout> MentionSurface for TreeSurface<L> {
    fn caret(&self) -> usize {
        self.caret
    }

    fn set_caret(&mut self, caret: usize) {
        self.caret = caret.min(self.tree.len_chars());
    }

    fn detect_trigger(&self, trigger: char) -> Option<Query> {
        let (run_start, run) = self.tree.text_run_at(self.caret)?;
        trigger::detect_trigger_with(run, self.caret - run_start, trigger)
            .map(|q| Query {
                trigger_offset: q.trigger_offset + run_start,
                ..q
            })
    }

    fn measure_caret(&self, offset: usize, min_height: f64) -> Result<CaretRect> {
        self.layout
            .measure(&self.tree.extract_plain_text(), offset, min_height)
    }

    fn origin(&self) -> CaretRect {
        layout_origin(&self.layout)
    }

    fn insert_token(&mut self, token: MentionToken, query: &Query) -> Result<NodeKey> {
        let (key, caret) = self.tree.insert_atomic(token, query)?;
        self.caret = caret;
        Ok(key)
    }

    fn delete_at_boundary(&mut self) -> Option<MentionToken> {
        let (removed, caret) = self.tree.delete_atomic(self.caret)?;
        self.caret = caret;
        Some(removed.token)
    }

    fn apply_edit(&mut self, event: &EditEvent) {
        events::apply_to_tree(&mut self.tree, event);
        self.caret = self.caret.min(self.tree.len_chars());
    }

    fn serialize(&self) -> String {
        self.tree.extract_plain_text()
    }

    fn mentions(&self) -> Vec<TrackedMention> {
        self.tree.mention_spans()
    }

    fn load(&mut self, content: &StoredContent) -> Result<()> {
        self.tree = content.to_tree()?;
        self.caret = self.tree.len_chars();
        Ok(())
    }
}

fn layout_origin<L: CaretLayout>(layout: &L) -> CaretRect {
    layout
        .box_metrics()
        .map(|m| CaretRect::new(m.origin_top, m.origin_left, 0.0))
        .unwrap_or(CaretRect::ORIGIN)
}

/// Check that `offset` lies within a surface's text.
pub fn check_offset<S: MentionSurface + ?Sized>(surface: &S, offset: usize) -> Result<()> {
    let len = surface.serialize().chars().count();
    if offset > len {
        return Err(MentionError::OffsetOutOfBounds { offset, len });
    }
    Ok(())
}
