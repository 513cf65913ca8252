//! The rich editing surface driven by the sync engine.
//!
//! [`RichEditor`] is the contract the engine needs from an editor library:
//! load and replace markdown, report and place the cursor as a char offset,
//! and publish content-changed events. [`EditorBuffer`] is the rope-backed
//! in-memory implementation.

mod buffer;

pub use buffer::{Direction, EditorBuffer};

use crate::events::Subscription;

/// Notifications published by an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// The document content may have changed.
    ContentChanged,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("editor failed to replace content: {0}")]
    Replace(String),
    #[error("cursor offset {offset} is outside the document (length {len})")]
    CursorOutOfRange { offset: usize, len: usize },
    #[error("editor failed to initialize: {0}")]
    Init(String),
}

/// What the sync engine requires from a rich-text editor.
pub trait RichEditor {
    /// Create a fresh editor holding `body`.
    ///
    /// # Errors
    /// Returns [`EditorError::Init`] if the editor cannot be constructed.
    fn create(body: &str) -> Result<Self, EditorError>
    where
        Self: Sized;

    /// Serialize the current content back to markdown.
    fn markdown(&self) -> String;

    /// Swap the whole content in place, keeping editor-side state such as history.
    ///
    /// # Errors
    /// Returns [`EditorError::Replace`] if the incremental swap fails.
    fn replace_content(&mut self, body: &str) -> Result<(), EditorError>;

    /// Cursor position as a char offset.
    fn cursor_offset(&self) -> usize;

    /// Place the cursor at a char offset.
    ///
    /// # Errors
    /// Returns [`EditorError::CursorOutOfRange`] if `offset` exceeds the content.
    fn set_cursor_offset(&mut self, offset: usize) -> Result<(), EditorError>;

    /// Content length in chars.
    fn len_chars(&self) -> usize;

    /// Subscribe to content-changed events.
    fn subscribe(&mut self) -> Subscription<EditorEvent>;
}
