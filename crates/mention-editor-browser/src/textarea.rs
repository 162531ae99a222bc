//! Textarea surface: linear buffer with offset-tracked mentions.
//!
//! The textarea's `value` is plain text, so mentions are tracked by offset
//! in the model and re-validated after every edit. Caret offsets cross the
//! boundary as UTF-16 code units and are converted to chars here.

use std::ops::Range;

use mention_editor_core::{
    CaretRect, EditEvent, EditorRope, LinearSurface, MentionError, MentionSurface, MentionToken,
    NodeKey, Query, Result, StoredContent, TrackedMention, char_to_utf16, diff_text,
    utf16_to_char,
};
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, HtmlTextAreaElement};

use crate::mirror::DomMirror;

pub struct TextareaSurface {
    element: HtmlTextAreaElement,
    html: HtmlElement,
    model: LinearSurface<EditorRope, DomMirror>,
}

impl TextareaSurface {
    /// Wrap `element`, adopting its current value as plain text.
    pub fn new(element: HtmlTextAreaElement, mirror_id_prefix: &str) -> Self {
        let html: HtmlElement = element.clone().unchecked_into();
        let value = element.value();
        let model = LinearSurface::with_buffer(
            EditorRope::from_str(&value),
            DomMirror::new(element.clone(), mirror_id_prefix),
        );
        let mut surface = Self {
            element,
            html,
            model,
        };
        if let Some(caret) = surface.read_dom_caret() {
            surface.model.set_caret(caret);
        }
        surface
    }

    pub fn textarea(&self) -> &HtmlTextAreaElement {
        &self.element
    }

    pub fn model(&self) -> &LinearSurface<EditorRope, DomMirror> {
        &self.model
    }

    fn read_dom_caret(&self) -> Option<usize> {
        let utf16 = self.element.selection_start().ok()??;
        Some(utf16_to_char(&self.element.value(), utf16 as usize))
    }

    fn read_dom_selection(&self) -> Option<Range<usize>> {
        let start = self.element.selection_start().ok()??;
        let end = self.element.selection_end().ok()??;
        let value = self.element.value();
        Some(utf16_to_char(&value, start as usize)..utf16_to_char(&value, end as usize))
    }

    fn write_dom(&self) -> Result<()> {
        let text = self.model.serialize();
        self.element.set_value(&text);
        let caret = char_to_utf16(&text, self.model.caret()) as u32;
        self.element
            .set_selection_range(caret, caret)
            .map_err(|e| MentionError::dom(format!("set_selection_range failed: {:?}", e)))
    }

    fn write_or_log(&self) {
        if let Err(err) = self.write_dom() {
            tracing::warn!(target: "mention::dom", error = %err, "failed to write textarea");
        }
    }
}

impl MentionSurface for TextareaSurface {
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
        self.model.origin()
    }

    fn insert_token(&mut self, token: MentionToken, query: &Query) -> Result<NodeKey> {
        let key = self.model.insert_token(token, query)?;
        self.write_or_log();
        Ok(key)
    }

    fn delete_at_boundary(&mut self) -> Option<MentionToken> {
        let removed = self.model.delete_at_boundary()?;
        self.write_or_log();
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
        self.write_dom()
    }
}

impl crate::surface::DomSurface for TextareaSurface {
    fn element(&self) -> &HtmlElement {
        &self.html
    }

    fn read_edits(&mut self) -> (Vec<EditEvent>, usize) {
        let value = self.element.value();
        let caret = self
            .read_dom_caret()
            .unwrap_or_else(|| value.chars().count());
        let events = diff_text(&self.model.serialize(), &value, Some(caret));
        if !events.is_empty() {
            tracing::trace!(target: "mention::dom", count = events.len(), caret, "textarea edits");
        }
        (events, caret)
    }

    fn read_caret(&self) -> Option<usize> {
        self.read_dom_caret()
    }

    fn read_selection(&self) -> Option<Range<usize>> {
        self.read_dom_selection()
    }

    fn render(&self) -> Result<()> {
        self.write_dom()
    }
}
