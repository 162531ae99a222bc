//! Caret measurement for textareas through an off-screen mirror element.
//!
//! A textarea exposes no geometry for its caret. The mirror is a `div` that
//! copies the textarea's text-affecting styles, holds the text up to the
//! caret followed by a marker span, and is measured then removed.

use std::cell::Cell;

use mention_editor_core::{
    BoxMetrics, CaretLayout, CaretRect, MIRRORED_PROPERTIES, MentionError, Result,
    offset::slice_chars,
};
use wasm_bindgen::JsCast;
use web_sys::{CssStyleDeclaration, Element, HtmlElement, HtmlTextAreaElement};

/// Parse a computed CSS pixel length. Anything unparseable reads as zero.
pub fn parse_px(value: &str) -> f64 {
    value
        .trim()
        .trim_end_matches("px")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn computed_style(element: &Element) -> Result<CssStyleDeclaration> {
    web_sys::window()
        .ok_or_else(|| MentionError::dom("no window"))?
        .get_computed_style(element)
        .map_err(|e| MentionError::dom(format!("get_computed_style failed: {:?}", e)))?
        .ok_or_else(|| MentionError::dom("no computed style"))
}

/// Removes the mirror from the document when measurement is done.
struct MirrorGuard(HtmlElement);

impl Drop for MirrorGuard {
    fn drop(&mut self) {
        self.0.remove();
    }
}

/// [`CaretLayout`] backed by a textarea and a transient mirror element.
pub struct DomMirror {
    textarea: HtmlTextAreaElement,
    id_prefix: String,
    counter: Cell<u32>,
}

impl DomMirror {
    pub fn new(textarea: HtmlTextAreaElement, id_prefix: impl Into<String>) -> Self {
        Self {
            textarea,
            id_prefix: id_prefix.into(),
            counter: Cell::new(0),
        }
    }

    pub fn textarea(&self) -> &HtmlTextAreaElement {
        &self.textarea
    }

    fn build_mirror(&self, before: &str, after: &str) -> Result<(MirrorGuard, HtmlElement)> {
        let document = gloo_utils::document();
        let source = computed_style(&self.textarea)?;

        let mirror: HtmlElement = document
            .create_element("div")
            .map_err(|e| MentionError::dom(format!("create_element failed: {:?}", e)))?
            .dyn_into()
            .map_err(|_| MentionError::dom("mirror is not HtmlElement"))?;
        let n = self.counter.get();
        self.counter.set(n.wrapping_add(1));
        mirror.set_id(&format!("{}-{}", self.id_prefix, n));

        let style = mirror.style();
        for property in MIRRORED_PROPERTIES {
            let copied = source
                .get_property_value(property)
                .and_then(|value| style.set_property(property, &value));
            if let Err(e) = copied {
                tracing::debug!(target: "mention::dom", property, error = ?e, "could not mirror style property");
            }
        }
        for (property, value) in [
            ("position", "absolute"),
            ("visibility", "hidden"),
            ("top", "0"),
            ("left", "-9999px"),
            ("white-space", "pre-wrap"),
            ("word-wrap", "break-word"),
            ("overflow", "hidden"),
        ] {
            style
                .set_property(property, value)
                .map_err(|e| MentionError::dom(format!("set_property failed: {:?}", e)))?;
        }

        mirror.set_text_content(Some(before));

        let marker: HtmlElement = document
            .create_element("span")
            .map_err(|e| MentionError::dom(format!("create_element failed: {:?}", e)))?
            .dyn_into()
            .map_err(|_| MentionError::dom("marker is not HtmlElement"))?;
        // An empty span has no box; the remainder keeps wrapping faithful.
        marker.set_text_content(Some(if after.is_empty() { "." } else { after }));
        mirror
            .append_child(&marker)
            .map_err(|e| MentionError::dom(format!("append_child failed: {:?}", e)))?;

        let body = document
            .body()
            .ok_or_else(|| MentionError::dom("no document body"))?;
        body.append_child(&mirror)
            .map_err(|e| MentionError::dom(format!("append_child failed: {:?}", e)))?;

        Ok((MirrorGuard(mirror), marker))
    }
}

impl CaretLayout for DomMirror {
    fn marker_rect(&self, text: &str, offset: usize) -> Result<CaretRect> {
        let len = text.chars().count();
        let before = slice_chars(text, 0, offset).ok_or(MentionError::OffsetOutOfBounds {
            offset,
            len,
        })?;
        let after = slice_chars(text, offset, len).unwrap_or_default();

        let (guard, marker) = self.build_mirror(before, after)?;
        let mirror_style = computed_style(&guard.0)?;
        let px = |name: &str| parse_px(&mirror_style.get_property_value(name).unwrap_or_default());

        let line_height = px("line-height");
        let height = if line_height > 0.0 {
            line_height
        } else {
            marker.offset_height() as f64
        };

        // offsetTop is measured from the mirror's padding edge.
        let rect = CaretRect::new(
            marker.offset_top() as f64 - px("padding-top"),
            marker.offset_left() as f64 - px("padding-left"),
            height,
        );
        drop(guard);
        Ok(rect)
    }

    fn box_metrics(&self) -> Result<BoxMetrics> {
        let style = computed_style(&self.textarea)?;
        let px = |name: &str| parse_px(&style.get_property_value(name).unwrap_or_default());
        let origin = self.textarea.get_bounding_client_rect();
        Ok(BoxMetrics {
            border_top: px("border-top-width"),
            border_left: px("border-left-width"),
            padding_top: px("padding-top"),
            padding_left: px("padding-left"),
            scroll_top: self.textarea.scroll_top() as f64,
            scroll_left: self.textarea.scroll_left() as f64,
            origin_top: origin.top(),
            origin_left: origin.left(),
        })
    }
}
