//! Browser event handling for the mention surfaces.
//!
//! Extracts what the session needs from `beforeinput` and `keydown` events
//! and intercepts the few inputs the browser would get wrong around
//! mentions: single-step backspace after a mention, rich pastes, block
//! wrapping on Enter, and formatting commands.

use std::ops::Range;

use mention_editor_core::{
    EditEvent, InputType, Key, KeydownResult, MentionObserver, MentionSession, Modifiers,
};
use wasm_bindgen::prelude::*;

use crate::cursor::dom_position_to_offset;
use crate::surface::DomSurface;

// === StaticRange binding ===
//
// web-sys does not expose StaticRange, which InputEvent.getTargetRanges()
// returns.

#[wasm_bindgen]
extern "C" {
    /// A fixed DOM range that does not track later mutations.
    pub type StaticRange;

    #[wasm_bindgen(method, getter, structural)]
    pub fn startContainer(this: &StaticRange) -> web_sys::Node;

    #[wasm_bindgen(method, getter, structural)]
    pub fn startOffset(this: &StaticRange) -> u32;

    #[wasm_bindgen(method, getter, structural)]
    pub fn endContainer(this: &StaticRange) -> web_sys::Node;

    #[wasm_bindgen(method, getter, structural)]
    pub fn endOffset(this: &StaticRange) -> u32;
}

/// Parse a browser inputType string.
pub fn parse_browser_input_type(s: &str) -> InputType {
    InputType::parse(s)
}

/// Get input type from a beforeinput event.
pub fn get_input_type_from_event(event: &web_sys::InputEvent) -> InputType {
    parse_browser_input_type(&event.input_type())
}

/// Get data from a beforeinput event, falling back to the plain-text
/// payload of a paste or drop.
pub fn get_data_from_event(event: &web_sys::InputEvent) -> Option<String> {
    if let Some(data) = event.data() {
        if !data.is_empty() {
            return Some(data);
        }
    }

    if let Some(data_transfer) = event.data_transfer() {
        if let Ok(text) = data_transfer.get_data("text/plain") {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

/// Linear range the browser intends to modify, from getTargetRanges().
pub fn get_target_range_from_event(
    event: &web_sys::InputEvent,
    root: &web_sys::Node,
) -> Option<Range<usize>> {
    use wasm_bindgen::JsCast;

    let ranges = event.get_target_ranges();
    if ranges.length() == 0 {
        return None;
    }
    let static_range: StaticRange = ranges.get(0).unchecked_into();

    let start = dom_position_to_offset(
        root,
        &static_range.startContainer(),
        static_range.startOffset(),
    )?;
    let end = dom_position_to_offset(root, &static_range.endContainer(), static_range.endOffset())?;
    Some(start.min(end)..start.max(end))
}

/// Key and modifier state of a keydown event.
pub fn key_from_event(event: &web_sys::KeyboardEvent) -> (Key, Modifiers) {
    let modifiers = Modifiers {
        ctrl: event.ctrl_key(),
        alt: event.alt_key(),
        shift: event.shift_key(),
        meta: event.meta_key(),
    };
    (Key::parse(&event.key()), modifiers)
}

/// Result of handling a beforeinput event.
#[derive(Debug, Clone, PartialEq)]
pub enum BeforeInputResult {
    /// Handled here, prevent the browser's default.
    Handled,
    /// Let the browser apply it; the resulting mutation is observed later.
    PassThrough,
}

/// What the beforeinput handler needs from the event.
#[derive(Debug, Clone)]
pub struct BeforeInputContext {
    pub input_type: InputType,
    pub data: Option<String>,
    /// Linear range from getTargetRanges(), if available.
    pub target_range: Option<Range<usize>>,
    pub is_composing: bool,
}

impl BeforeInputContext {
    pub fn from_event(event: &web_sys::InputEvent, root: &web_sys::Node) -> Self {
        Self {
            input_type: get_input_type_from_event(event),
            data: get_data_from_event(event),
            target_range: get_target_range_from_event(event, root),
            is_composing: event.is_composing(),
        }
    }
}

/// Handle a beforeinput event against a session.
///
/// `caret` is the DOM caret read just before the event.
pub fn handle_beforeinput<S, O>(
    session: &mut MentionSession<S, O>,
    ctx: &BeforeInputContext,
    caret: usize,
) -> BeforeInputResult
where
    S: DomSurface,
    O: MentionObserver,
{
    if ctx.is_composing {
        return BeforeInputResult::PassThrough;
    }

    match &ctx.input_type {
        InputType::Format(kind) => {
            tracing::trace!(target: "mention::input", kind = %kind, "rejecting formatting input");
            BeforeInputResult::Handled
        }

        input if input.is_backward_char_deletion() => {
            // Only a collapsed caret deletes a mention as one step; a
            // selection is deleted by the browser and reconciled.
            let collapsed = ctx
                .target_range
                .as_ref()
                .is_none_or(|r| r.end == caret && r.len() <= 1);
            if !collapsed {
                return BeforeInputResult::PassThrough;
            }
            session.surface_mut().set_caret(caret);
            match session.delete_at_caret() {
                Some(_) => BeforeInputResult::Handled,
                None => BeforeInputResult::PassThrough,
            }
        }

        InputType::InsertFromPaste | InputType::InsertFromDrop
            if session.surface().observes_mutations() =>
        {
            // Plain-text payload only.
            let Some(text) = ctx.data.as_deref() else {
                return BeforeInputResult::Handled;
            };
            insert_plain(session, ctx, caret, text);
            BeforeInputResult::Handled
        }

        // Left alone, the browser wraps the new line in a block element.
        InputType::InsertParagraph | InputType::InsertLineBreak
            if session.surface().observes_mutations() =>
        {
            insert_plain(session, ctx, caret, "\n");
            BeforeInputResult::Handled
        }

        _ => BeforeInputResult::PassThrough,
    }
}

/// Replace the target range (or insert at the caret) with plain text, then
/// re-render.
fn insert_plain<S, O>(session: &mut MentionSession<S, O>, ctx: &BeforeInputContext, caret: usize, text: &str)
where
    S: DomSurface,
    O: MentionObserver,
{
    let range = ctx.target_range.clone().unwrap_or(caret..caret);
    let mut events = Vec::with_capacity(2);
    if !range.is_empty() {
        events.push(EditEvent::delete(range.clone()));
    }
    events.push(EditEvent::insert(range.start, text));

    let new_caret = range.start + text.chars().count();
    session.handle_edit(&events, new_caret);
    if let Err(err) = session.surface().render() {
        tracing::warn!(target: "mention::input", error = %err, "failed to render inserted text");
    }
}

/// Handle a keydown against a session.
///
/// `selection` is the DOM selection read just before the event. Its end
/// becomes the session caret. Backspace over a non-collapsed selection is
/// left to the browser, which deletes the selected text.
pub fn handle_keydown_event<S, O>(
    session: &mut MentionSession<S, O>,
    key: &Key,
    modifiers: Modifiers,
    selection: Option<Range<usize>>,
) -> KeydownResult
where
    S: DomSurface,
    O: MentionObserver,
{
    if let Some(selection) = selection {
        if *key == Key::Backspace && !selection.is_empty() {
            return KeydownResult::NotHandled;
        }
        session.surface_mut().set_caret(selection.end);
    }
    session.handle_keydown(key, modifiers)
}
