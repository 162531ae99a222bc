//! Browser DOM layer for the mention editor.
//!
//! Binds the core session to real editable elements. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `textarea`: linear surface over an `HtmlTextAreaElement`, with caret
//!   geometry measured through an off-screen mirror (`mirror`)
//! - `contenteditable`: tree surface rendered into an element, with
//!   mentions as non-editable spans (`dom_sync`) and caret mapping through
//!   the Selection API (`cursor`)
//! - `events`: beforeinput and keydown extraction
//! - `listeners`: DOM listeners and the mutation observer feeding a session
//! - `editor`: a mounted editor tying the above together
//!
//! # Re-exports
//!
//! This crate re-exports `mention-editor-core` for convenience, so consumers
//! only need to depend on `mention-editor-browser`.

pub use mention_editor_core;
pub use mention_editor_core::*;

pub mod contenteditable;
pub mod cursor;
pub mod dom_sync;
pub mod editor;
pub mod events;
pub mod listeners;
pub mod mirror;
pub mod surface;
pub mod textarea;

pub use contenteditable::{ContentEditableSurface, RangeLayout};
pub use editor::{EditorHandle, MentionEditor};
pub use events::{
    BeforeInputContext, BeforeInputResult, handle_beforeinput, handle_keydown_event,
    parse_browser_input_type,
};
pub use listeners::{SharedSession, SurfaceListeners};
pub use mirror::DomMirror;
pub use surface::DomSurface;
pub use textarea::TextareaSurface;
