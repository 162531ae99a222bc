//! Caret geometry: where on screen a linear offset sits.
//!
//! The measurement itself is delegated to a [`CaretLayout`]. The browser
//! crate measures through an off-screen mirror element; [`MonospaceLayout`]
//! is a deterministic fixed-pitch layout for native hosts and tests. Both
//! report a marker box relative to the surface's content box, which
//! [`resolve_caret_rect`] turns into viewport coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{MentionError, Result};
use crate::types::CaretRect;

/// Style properties a mirror element must copy from a textarea for its text
/// to wrap identically.
pub const MIRRORED_PROPERTIES: &[&str] = &[
    "direction",
    "box-sizing",
    "width",
    "height",
    "overflow-x",
    "overflow-y",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-style",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "font-style",
    "font-variant",
    "font-weight",
    "font-stretch",
    "font-size",
    "font-size-adjust",
    "line-height",
    "font-family",
    "font-feature-settings",
    "text-align",
    "text-transform",
    "text-indent",
    "text-decoration",
    "letter-spacing",
    "word-spacing",
    "tab-size",
    "-moz-tab-size",
    "white-space",
    "word-wrap",
    "word-break",
];

/// Box-model numbers of the measured surface, in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxMetrics {
    pub border_top: f64,
    pub border_left: f64,
    pub padding_top: f64,
    pub padding_left: f64,
    pub scroll_top: f64,
    pub scroll_left: f64,
    /// Viewport position of the surface's border box.
    pub origin_top: f64,
    pub origin_left: f64,
}

/// Turn a marker box measured relative to the content box into a viewport
/// caret rect.
pub fn resolve_caret_rect(marker: CaretRect, metrics: &BoxMetrics) -> CaretRect {
    CaretRect {
        top: metrics.origin_top + marker.top + metrics.border_top + metrics.padding_top
            - metrics.scroll_top,
        left: metrics.origin_left + marker.left + metrics.border_left + metrics.padding_left
            - metrics.scroll_left,
        height: marker.height,
    }
}

impl CaretRect {
    /// Reject non-finite values and enforce a minimum height.
    pub fn sanitize(self, min_height: f64) -> Result<Self> {
        if !(self.top.is_finite() && self.left.is_finite() && self.height.is_finite()) {
            return Err(MentionError::geometry(format!(
                "non-finite caret rect {:?}",
                self
            )));
        }
        Ok(Self {
            height: self.height.max(min_height),
            ..self
        })
    }
}

/// Measures where the caret would sit in a laid-out text surface.
pub trait CaretLayout {
    /// Marker box for `offset` (char offset into `text`), relative to the
    /// surface's content box.
    fn marker_rect(&self, text: &str, offset: usize) -> Result<CaretRect>;

    /// Current box-model numbers of the surface.
    fn box_metrics(&self) -> Result<BoxMetrics>;

    /// Viewport caret rect for `offset`.
    fn measure(&self, text: &str, offset: usize, min_height: f64) -> Result<CaretRect> {
        let marker = self.marker_rect(text, offset)?;
        let metrics = self.box_metrics()?;
        let rect = resolve_caret_rect(marker, &metrics).sanitize(min_height)?;
        tracing::trace!(target: "mention::geometry", offset, ?rect, "measured caret");
        Ok(rect)
    }
}

/// Fixed-pitch layout with optional soft wrapping.
///
/// Every char is `char_width` wide, `\n` starts a new line, and when
/// `columns` is set a line wraps after that many chars.
#[derive(Clone, Debug, PartialEq)]
pub struct MonospaceLayout {
    pub char_width: f64,
    pub line_height: f64,
    pub columns: Option<usize>,
    pub metrics: BoxMetrics,
}

impl Default for MonospaceLayout {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            columns: None,
            metrics: BoxMetrics::default(),
        }
    }
}

impl MonospaceLayout {
    pub fn new(char_width: f64, line_height: f64) -> Self {
        Self {
            char_width,
            line_height,
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_metrics(mut self, metrics: BoxMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

impl CaretLayout for MonospaceLayout {
    fn marker_rect(&self, text: &str, offset: usize) -> Result<CaretRect> {
        let len = text.chars().count();
        if offset > len {
            return Err(MentionError::OffsetOutOfBounds { offset, len });
        }

        let mut line = 0usize;
        let mut column = 0usize;
        for c in text.chars().take(offset) {
            if c == '\n' {
                line += 1;
                column = 0;
                continue;
            }
            if self.columns.is_some_and(|cols| column >= cols) {
                line += 1;
                column = 0;
            }
            column += 1;
        }

        Ok(CaretRect::new(
            line as f64 * self.line_height,
            column as f64 * self.char_width,
            self.line_height,
        ))
    }

    fn box_metrics(&self) -> Result<BoxMetrics> {
        Ok(self.metrics)
    }
}

/// Fixed size reserved for the suggestion popup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopupBudget {
    pub width: f64,
    pub height: f64,
}

impl Default for PopupBudget {
    fn default() -> Self {
        Self {
            width: 280.0,
            height: 240.0,
        }
    }
}

/// Where to place the popup, in viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopupPlacement {
    pub top: f64,
    pub left: f64,
    /// Popup opens upward because there was no room below the caret.
    pub above: bool,
}

/// Keep a popup anchored at the caret inside a `viewport_width` by
/// `viewport_height` viewport.
///
/// Prefers opening below the caret; flips above when it would overflow the
/// bottom and there is room above. Horizontally it slides left to stay
/// visible, never past the left edge.
pub fn clamp_to_viewport(
    anchor: CaretRect,
    popup: PopupBudget,
    viewport_width: f64,
    viewport_height: f64,
) -> PopupPlacement {
    let below = anchor.bottom();
    let fits_below = below + popup.height <= viewport_height;
    let fits_above = anchor.top - popup.height >= 0.0;
    let (top, above) = if !fits_below && fits_above {
        (anchor.top - popup.height, true)
    } else {
        (below, false)
    };
    let left = anchor
        .left
        .min(viewport_width - popup.width)
        .max(0.0);
    PopupPlacement { top, left, above }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_single_line() {
        let layout = MonospaceLayout::new(10.0, 20.0);
        let rect = layout.marker_rect("hello @jo", 6).unwrap();
        assert_eq!(rect, CaretRect::new(0.0, 60.0, 20.0));
    }

    #[test]
    fn test_monospace_newlines_and_wrapping() {
        let layout = MonospaceLayout::new(10.0, 20.0).with_columns(4);
        // "abcd" fills the first line, "ef" wraps to the second.
        assert_eq!(
            layout.marker_rect("abcdef", 6).unwrap(),
            CaretRect::new(20.0, 20.0, 20.0)
        );
        assert_eq!(
            layout.marker_rect("ab\ncd", 4).unwrap(),
            CaretRect::new(20.0, 10.0, 20.0)
        );
    }

    #[test]
    fn test_monospace_out_of_bounds() {
        let layout = MonospaceLayout::default();
        assert_eq!(
            layout.marker_rect("abc", 4),
            Err(MentionError::OffsetOutOfBounds { offset: 4, len: 3 })
        );
    }

    #[test]
    fn test_resolve_applies_box_model() {
        let metrics = BoxMetrics {
            border_top: 1.0,
            border_left: 1.0,
            padding_top: 4.0,
            padding_left: 6.0,
            scroll_top: 30.0,
            scroll_left: 0.0,
            origin_top: 100.0,
            origin_left: 50.0,
        };
        let rect = resolve_caret_rect(CaretRect::new(40.0, 24.0, 18.0), &metrics);
        assert_eq!(rect, CaretRect::new(115.0, 81.0, 18.0));
    }

    #[test]
    fn test_measure_enforces_min_height() {
        let layout = MonospaceLayout::new(8.0, 10.0);
        let rect = layout.measure("ab", 2, 16.0).unwrap();
        assert_eq!(rect.height, 16.0);
        assert_eq!(rect.left, 16.0);
    }

    #[test]
    fn test_sanitize_rejects_nan() {
        let rect = CaretRect::new(f64::NAN, 0.0, 10.0);
        assert!(matches!(rect.sanitize(16.0), Err(MentionError::Geometry(_))));
    }

    #[test]
    fn test_popup_opens_below() {
        let placement = clamp_to_viewport(
            CaretRect::new(100.0, 40.0, 16.0),
            PopupBudget::default(),
            1024.0,
            768.0,
        );
        assert_eq!(
            placement,
            PopupPlacement {
                top: 116.0,
                left: 40.0,
                above: false
            }
        );
    }

    #[test]
    fn test_popup_flips_and_slides() {
        let placement = clamp_to_viewport(
            CaretRect::new(600.0, 900.0, 16.0),
            PopupBudget::default(),
            1024.0,
            768.0,
        );
        assert_eq!(
            placement,
            PopupPlacement {
                top: 360.0,
                left: 744.0,
                above: true
            }
        );
    }
}
