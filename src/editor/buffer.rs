use ropey::Rope;

use super::{EditorError, EditorEvent, RichEditor};
use crate::events::{Listeners, Subscription};

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A markdown editing surface backed by a rope.
///
/// The cursor is a char offset into the rope. Every mutation bumps
/// [`revision`](Self::revision) and publishes [`EditorEvent::ContentChanged`].
pub struct EditorBuffer {
    rope: Rope,
    cursor: usize,
    /// Remembered column for vertical movement (sticky column), in chars.
    col_memory: usize,
    revision: u64,
    dirty: bool,
    fail_next_replace: bool,
    listeners: Listeners<EditorEvent>,
}

impl EditorBuffer {
    /// Create a new buffer from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: 0,
            col_memory: 0,
            revision: 0,
            dirty: false,
            fail_next_replace: false,
            listeners: Listeners::new(),
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// The full text content of the buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Cursor position as a char offset.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position as zero-based (line, column in chars).
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let line = self.rope.char_to_line(self.cursor);
        (line, self.cursor - self.rope.line_to_char(line))
    }

    /// Number of content mutations since creation.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the user has typed since creation or the last [`mark_clean`](Self::mark_clean).
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// Make the next [`RichEditor::replace_content`] call fail.
    pub const fn fail_next_replace(&mut self) {
        self.fail_next_replace = true;
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, ch: char) {
        self.rope.insert_char(self.cursor, ch);
        self.set_cursor(self.cursor + 1);
        self.user_edit();
    }

    /// Insert a string at the cursor, leaving the cursor after it.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.rope.insert(self.cursor, s);
        self.set_cursor(self.cursor + s.chars().count());
        self.user_edit();
    }

    /// Split the current line at the cursor (Enter key).
    pub fn split_line(&mut self) {
        self.insert_char('\n');
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.rope.remove(self.cursor - 1..self.cursor);
        self.set_cursor(self.cursor - 1);
        self.user_edit();
        true
    }

    /// Delete the character at the cursor (Delete key).
    ///
    /// Returns `true` if a character was deleted.
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.rope.len_chars() {
            return false;
        }
        self.rope.remove(self.cursor..=self.cursor);
        self.user_edit();
        true
    }

    /// Convert CRLF and lone CR line endings to LF.
    ///
    /// Mirrors a serializer pass in an editor library: it always publishes a
    /// change event, even when nothing had to be rewritten.
    pub fn reformat(&mut self) {
        let text = self.text();
        let normalized = crate::preamble::normalize_line_endings(&text);
        if normalized != text {
            self.rope = Rope::from_str(&normalized);
            self.set_cursor(self.cursor.min(self.rope.len_chars()));
            self.revision += 1;
        }
        self.listeners.emit(&EditorEvent::ContentChanged);
    }

    /// Move the cursor in the given direction.
    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.set_cursor(self.cursor.saturating_sub(1)),
            Direction::Right => self.set_cursor((self.cursor + 1).min(self.rope.len_chars())),
            Direction::Up => {
                let (line, _) = self.cursor_line_col();
                if line > 0 {
                    self.move_vertical(line - 1);
                }
            }
            Direction::Down => {
                let (line, _) = self.cursor_line_col();
                if line + 1 < self.line_count() {
                    self.move_vertical(line + 1);
                }
            }
        }
    }

    /// Move cursor to the beginning of the line (Home).
    pub fn move_home(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.set_cursor(self.rope.line_to_char(line));
    }

    /// Move cursor to the end of the line (End).
    pub fn move_end(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.set_cursor(self.rope.line_to_char(line) + self.line_len_chars(line));
    }

    /// Move cursor to a specific line and column, clamped to the content.
    pub fn move_to(&mut self, line: usize, col: usize) {
        let line = line.min(self.line_count().saturating_sub(1));
        let col = col.min(self.line_len_chars(line));
        self.set_cursor(self.rope.line_to_char(line) + col);
    }

    /// Move cursor to the start of the buffer (Ctrl+Home).
    pub fn move_to_start(&mut self) {
        self.set_cursor(0);
    }

    /// Move cursor to the end of the buffer (Ctrl+End).
    pub fn move_to_end(&mut self) {
        self.set_cursor(self.rope.len_chars());
    }

    // --- Private helpers ---

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset;
        self.col_memory = self.cursor_line_col().1;
    }

    fn move_vertical(&mut self, target: usize) {
        let col = self.col_memory.min(self.line_len_chars(target));
        self.cursor = self.rope.line_to_char(target) + col;
    }

    fn line_len_chars(&self, line_idx: usize) -> usize {
        if line_idx >= self.rope.len_lines() {
            return 0;
        }
        let line = self.rope.line(line_idx);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && line.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        len
    }

    fn user_edit(&mut self) {
        self.revision += 1;
        self.dirty = true;
        self.listeners.emit(&EditorEvent::ContentChanged);
    }
}

impl RichEditor for EditorBuffer {
    fn create(body: &str) -> Result<Self, EditorError> {
        Ok(Self::from_text(body))
    }

    fn markdown(&self) -> String {
        self.text()
    }

    fn replace_content(&mut self, body: &str) -> Result<(), EditorError> {
        if std::mem::take(&mut self.fail_next_replace) {
            return Err(EditorError::Replace("injected failure".to_string()));
        }
        self.rope = Rope::from_str(body);
        self.set_cursor(self.cursor.min(self.rope.len_chars()));
        self.revision += 1;
        self.listeners.emit(&EditorEvent::ContentChanged);
        Ok(())
    }

    fn cursor_offset(&self) -> usize {
        self.cursor
    }

    fn set_cursor_offset(&mut self, offset: usize) -> Result<(), EditorError> {
        let len = self.rope.len_chars();
        if offset > len {
            return Err(EditorError::CursorOutOfRange { offset, len });
        }
        self.set_cursor(offset);
        Ok(())
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn subscribe(&mut self) -> Subscription<EditorEvent> {
        self.listeners.subscribe()
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("cursor", &self.cursor)
            .field("revision", &self.revision)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
