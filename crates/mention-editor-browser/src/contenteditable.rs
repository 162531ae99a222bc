//! Contenteditable surface: a [`MentionTree`] rendered into an element.
//!
//! Mentions render as non-editable spans, so the browser can only remove
//! them whole. After each edit the element is read back into a tree and
//! reconciled with the model. When the difference cannot be described as
//! edit events the observed tree is adopted and the element re-rendered.

use mention_editor_core::{
    BoxMetrics, CaretLayout, CaretRect, EditEvent, MentionError, MentionSurface, MentionToken,
    MentionTree, NodeKey, Query, Result, StoredContent, TrackedMention, TreeSurface,
    reconcile_trees,
};
use std::ops::Range;

use web_sys::{HtmlElement, Node};

use crate::cursor;
use crate::dom_sync;

/// Caret geometry from DOM ranges. Range rects are already in viewport
/// coordinates, so the box metrics are all zero.
pub struct RangeLayout {
    root: HtmlElement,
}

impl CaretLayout for RangeLayout {
    fn marker_rect(&self, _text: &str, offset: usize) -> Result<CaretRect> {
        cursor::caret_rect_at(&self.root, offset)
    }

    fn box_metrics(&self) -> Result<BoxMetrics> {
        Ok(BoxMetrics::default())
    }
}

pub struct ContentEditableSurface {
    element: HtmlElement,
    model: TreeSurface<RangeLayout>,
}

impl ContentEditableSurface {
    /// Take over `element`: mark it editable and adopt its current content.
    ///
    /// Line breaks render as `\n` in text nodes, so the element preserves
    /// white space.
    pub fn new(element: HtmlElement) -> Result<Self> {
        element
            .set_attribute("contenteditable", "true")
            .map_err(|e| MentionError::dom(format!("set_attribute failed: {:?}", e)))?;
        element
            .style()
            .set_property("white-space", "pre-wrap")
            .map_err(|e| MentionError::dom(format!("set white-space failed: {:?}", e)))?;

        let mut model = TreeSurface::new(RangeLayout {
            root: element.clone(),
        });
        model.replace_tree(dom_sync::read_tree(&element, &MentionTree::new()));
        let surface = Self { element, model };
        surface.render_model()?;
        Ok(surface)
    }

    pub fn tree(&self) -> &MentionTree {
        self.model.tree()
    }

    fn render_model(&self) -> Result<()> {
        dom_sync::render_tree(&self.element, self.model.tree())?;
        if self.is_focused() {
            cursor::restore_caret(&self.element, self.model.caret())?;
        }
        Ok(())
    }

    fn render_or_log(&self) {
        if let Err(err) = self.render_model() {
            tracing::warn!(target: "mention::dom", error = %err, "failed to render mention tree");
        }
    }

    fn is_focused(&self) -> bool {
        gloo_utils::document()
            .active_element()
            .is_some_and(|active| {
                let node: &Node = &active;
                self.element.contains(Some(node))
            })
    }
}

impl MentionSurface for ContentEditableSurface {
    fn caret(&self) -> usize {
        self.model.caret()
    }

    fn set_caret(&mut self, caret: usize) {
        self.model.set_caret(caret);
    }

    fn detect_trigger(&self, trigger: char) -> Option<Query> {
        self.model.detect_trigger(trigger)
    }

    fn measure_caret(&self, offset: usize, min_height: f64) -> Result<CaretRect> {
        self.model.measure_caret(offset, min_height)
    }

    fn origin(&self) -> CaretRect {
        let rect = self.element.get_bounding_client_rect();
        CaretRect::new(rect.top(), rect.left(), 0.0)
    }

    fn insert_token(&mut self, token: MentionToken, query: &Query) -> Result<NodeKey> {
        let key = self.model.insert_token(token, query)?;
        self.render_or_log();
        Ok(key)
    }

    fn delete_at_boundary(&mut self) -> Option<MentionToken> {
        let removed = self.model.delete_at_boundary()?;
        self.render_or_log();
        Some(removed)
    }

    fn apply_edit(&mut self, event: &EditEvent) {
        self.model.apply_edit(event);
    }

    fn serialize(&self) -> String {
        self.model.serialize()
    }

    fn mentions(&self) -> Vec<TrackedMention> {
        self.model.mentions()
    }

    fn load(&mut self, content: &StoredContent) -> Result<()> {
        self.model.load(content)?;
        self.render_model()
    }
}

impl crate::surface::DomSurface for ContentEditableSurface {
    fn element(&self) -> &HtmlElement {
        &self.element
    }

    fn read_edits(&mut self) -> (Vec<EditEvent>, usize) {
        let observed = dom_sync::read_tree(&self.element, self.model.tree());
        let caret = cursor::read_caret(&self.element).unwrap_or_else(|| observed.len_chars());
        let reconciled = reconcile_trees(self.model.tree(), &observed, Some(caret));

        if reconciled.diverged {
            tracing::debug!(target: "mention::dom", "adopting observed tree after divergence");
            self.model.replace_tree(observed);
            self.model.set_caret(caret);
            self.render_or_log();
            return (Vec::new(), caret);
        }
        (reconciled.events, caret)
    }

    fn read_caret(&self) -> Option<usize> {
        cursor::read_caret(&self.element)
    }

    fn read_selection(&self) -> Option<Range<usize>> {
        cursor::read_selection(&self.element)
    }

    fn render(&self) -> Result<()> {
        self.render_model()
    }

    fn observes_mutations(&self) -> bool {
        true
    }
}
