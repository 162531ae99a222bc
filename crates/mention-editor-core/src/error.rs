//! Error types for mention editing operations.
//!
//! None of these are fatal to the editing surface: callers log them and
//! degrade mention tracking while the text stays editable.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by token models, surfaces, and geometry resolution.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[non_exhaustive]
pub enum MentionError {
    /// The query span no longer matches the text it was detected in.
    #[error("query span {start}..{end} no longer matches the surface text")]
    #[diagnostic(code(mention::stale_query))]
    StaleQuery { start: usize, end: usize },

    /// A selection was made with no query in progress.
    #[error("no mention query is active")]
    #[diagnostic(code(mention::no_active_query))]
    NoActiveQuery,

    /// A mention must render as at least one char.
    #[error("mention {id:?} has an empty display name")]
    #[diagnostic(code(mention::empty_display_name))]
    EmptyDisplayName { id: String },

    /// Offset past the end of the text.
    #[error("offset {offset} out of bounds (len {len})")]
    #[diagnostic(code(mention::offset_out_of_bounds))]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// Caret measurement produced no usable value.
    #[error("caret geometry unavailable: {0}")]
    #[diagnostic(
        code(mention::geometry),
        help("the surface may not be laid out yet; fall back to its origin")
    )]
    Geometry(String),

    /// A DOM call failed.
    #[error("DOM operation failed: {0}")]
    #[diagnostic(code(mention::dom))]
    Dom(String),

    /// Stored content failed validation.
    #[error("invalid stored content: {0}")]
    #[diagnostic(code(mention::invalid_stored))]
    InvalidStored(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(mention::config))]
    Config(String),
}

impl MentionError {
    pub fn dom(context: impl Into<String>) -> Self {
        MentionError::Dom(context.into())
    }

    pub fn geometry(context: impl Into<String>) -> Self {
        MentionError::Geometry(context.into())
    }
}

/// Failure reported by an external suggestion source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("suggestion resolution failed: {0}")]
pub struct ResolveError(pub String);

impl From<&str> for ResolveError {
    fn from(s: &str) -> Self {
        ResolveError(s.to_string())
    }
}

impl From<String> for ResolveError {
    fn from(s: String) -> Self {
        ResolveError(s)
    }
}

pub type Result<T, E = MentionError> = std::result::Result<T, E>;
