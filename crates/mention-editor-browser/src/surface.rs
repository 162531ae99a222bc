//! DOM-backed surfaces.
//!
//! Each wraps one of the core model surfaces together with the element it
//! mirrors. The model is authoritative for mentions; the element is
//! authoritative for what the user typed, which is read back as edit events.

use std::ops::Range;

use mention_editor_core::{EditEvent, MentionSurface, Result};
use web_sys::HtmlElement;

/// A [`MentionSurface`] whose content lives in a DOM element.
pub trait DomSurface: MentionSurface {
    /// The editable element listeners attach to.
    fn element(&self) -> &HtmlElement;

    /// Derive edit events from the element's current content and read the
    /// DOM caret. Reading an unchanged element yields no events.
    fn read_edits(&mut self) -> (Vec<EditEvent>, usize);

    /// DOM caret as a linear char offset.
    fn read_caret(&self) -> Option<usize>;

    /// DOM selection as an ordered linear range. Empty when collapsed.
    fn read_selection(&self) -> Option<Range<usize>>;

    /// Write the model into the element and restore the caret.
    fn render(&self) -> Result<()>;

    /// Whether structural changes should also be picked up by a
    /// `MutationObserver`.
    fn observes_mutations(&self) -> bool {
        false
    }
}
