//! Input intents and keys.
//!
//! Platform-agnostic definitions of what an input event means. Browser
//! `beforeinput` and `keydown` events are converted into these types by the
//! browser crate before the session sees them.

use smol_str::SmolStr;

/// Semantic input types from input events.
///
/// Based on the W3C Input Events specification, reduced to what a plain-text
/// surface with atomic mentions distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    // === Insertion ===
    /// Insert typed text.
    InsertText,
    /// Insert text from IME composition.
    InsertCompositionText,
    InsertLineBreak,
    InsertParagraph,
    InsertFromPaste,
    InsertFromDrop,
    /// Spell check correction and similar.
    InsertReplacementText,

    // === Deletion ===
    /// Backspace.
    DeleteContentBackward,
    /// Delete key.
    DeleteContentForward,
    DeleteWordBackward,
    DeleteWordForward,
    DeleteSoftLineBackward,
    DeleteHardLineBackward,
    DeleteByCut,
    DeleteByDrag,
    DeleteContent,

    // === History ===
    HistoryUndo,
    HistoryRedo,

    // === Formatting ===
    /// Any `format*` input; plain-text surfaces reject these.
    Format(String),

    /// Unrecognized input type.
    Unknown(String),
}

impl InputType {
    /// Parse a DOM `inputType` string.
    pub fn parse(s: &str) -> Self {
        match s {
            "insertText" => Self::InsertText,
            "insertCompositionText" => Self::InsertCompositionText,
            "insertLineBreak" => Self::InsertLineBreak,
            "insertParagraph" => Self::InsertParagraph,
            "insertFromPaste" => Self::InsertFromPaste,
            "insertFromDrop" => Self::InsertFromDrop,
            "insertReplacementText" => Self::InsertReplacementText,
            "deleteContentBackward" => Self::DeleteContentBackward,
            "deleteContentForward" => Self::DeleteContentForward,
            "deleteWordBackward" => Self::DeleteWordBackward,
            "deleteWordForward" => Self::DeleteWordForward,
            "deleteSoftLineBackward" => Self::DeleteSoftLineBackward,
            "deleteHardLineBackward" => Self::DeleteHardLineBackward,
            "deleteByCut" => Self::DeleteByCut,
            "deleteByDrag" => Self::DeleteByDrag,
            "deleteContent" => Self::DeleteContent,
            "historyUndo" => Self::HistoryUndo,
            "historyRedo" => Self::HistoryRedo,
            other if other.starts_with("format") => Self::Format(other.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Single-step backward deletion, the one that removes a mention whole.
    pub fn is_backward_char_deletion(&self) -> bool {
        matches!(self, Self::DeleteContentBackward)
    }
}

/// Key values for keyboard input the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    /// Anything else, by its DOM `key` name.
    Other(SmolStr),
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn parse(s: &str) -> Self {
        match s {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            other if other.chars().count() == 1 => Self::character(other),
            other => Self::Other(other.into()),
        }
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
        )
    }
}

/// Modifier key state for a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not ours, let the platform handle it.
    NotHandled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_types() {
        assert_eq!(InputType::parse("insertText"), InputType::InsertText);
        assert!(!InputType::parse("deleteByCut").is_backward_char_deletion());
        assert!(InputType::parse("deleteContentBackward").is_backward_char_deletion());
        assert_eq!(
            InputType::parse("formatBold"),
            InputType::Format("formatBold".into())
        );
        assert_eq!(
            InputType::parse("insertLink"),
            InputType::Unknown("insertLink".into())
        );
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(Key::parse("Escape"), Key::Escape);
        assert_eq!(Key::parse("@"), Key::character("@"));
        assert_eq!(Key::parse("é"), Key::character("é"));
        assert_eq!(Key::parse("F5"), Key::Other("F5".into()));
        assert!(Key::parse("ArrowUp").is_navigation());
    }
}
