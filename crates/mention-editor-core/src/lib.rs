//! mention-editor-core: inline @-mention editing without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage, with the ropey-backed `EditorRope`
//! - Trigger detection and the offset/position mapping it relies on
//! - Two token models: offset-tracked mentions in a linear buffer
//!   (`TrackedMentions`) and atomic mention nodes in a tree (`MentionTree`)
//! - `EditEvent`s and the diffing that derives them from observed state
//! - Caret geometry resolution behind the `CaretLayout` trait
//! - The suggestion lifecycle and the `MentionSession` state machine that
//!   drives any `MentionSurface`

pub mod actions;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod lifecycle;
pub mod offset;
pub mod session;
pub mod stored;
pub mod surface;
pub mod text;
pub mod tracked;
pub mod tree;
pub mod trigger;
pub mod types;

pub use actions::{InputType, Key, KeydownResult, Modifiers};
pub use config::MentionConfig;
pub use error::{MentionError, ResolveError, Result};
pub use events::{EditEvent, Reconciled, apply_to_tree, diff_text, reconcile_trees};
pub use geometry::{
    BoxMetrics, CaretLayout, MIRRORED_PROPERTIES, MonospaceLayout, PopupBudget, PopupPlacement,
    clamp_to_viewport, resolve_caret_rect,
};
pub use lifecycle::{
    FetchRequest, Generation, LifecycleState, SuggestionLifecycle, SuggestionSource, Transition,
    run_fetch,
};
pub use offset::{
    SnapDirection, TreePosition, char_to_utf16, offset_to_position, position_to_offset,
    utf16_to_char,
};
pub use session::{MentionObserver, MentionSession};
pub use smol_str::SmolStr;
pub use stored::{StoredContent, StoredMention, reannotate};
pub use surface::{LinearSurface, MentionSurface, TreeSurface};
pub use text::{EditorRope, TextBuffer};
pub use tracked::{TrackedMentions, shift_after_edit, validate};
pub use tree::{MentionTree, RemovedMention, TreeNode};
pub use trigger::{DEFAULT_TRIGGER, detect_trigger, detect_trigger_with};
pub use types::{
    CaretRect, EntityType, KeyAllocator, MentionToken, NodeKey, Query, TrackedMention,
};
