//! Editor → host: filter echo, coalesce edits, send the combined document.

use std::time::Instant;

use tracing::{debug, trace};

use super::session::EditorSession;
use crate::editor::RichEditor;
use crate::preamble::{self, Preamble};
use crate::transport::OutboundMessage;

impl<E: RichEditor> EditorSession<E> {
    /// Handle whatever change events the editor has queued.
    pub(super) fn process_editor_events(&mut self, now: Instant) {
        let Some(events) = &self.events else {
            return;
        };
        let count = events.drain().len();
        if count == 0 {
            return;
        }
        if self.applying_external {
            trace!(count, "ignoring editor events during external apply");
            self.stats.ignored_events += count as u64;
            return;
        }
        self.on_content_changed(now);
    }

    fn on_content_changed(&mut self, now: Instant) {
        let Some(editor) = self.editor.as_ref() else {
            return;
        };
        let content = editor.markdown();
        if content == self.last_editor_content {
            trace!("editor event without content change");
            self.stats.ignored_events += 1;
            return;
        }
        self.last_local_edit = Some(now);

        let (body, leaked) = self.sanitize_body(content.clone(), "outbound");
        if leaked.is_empty() {
            self.last_editor_content = content;
        } else {
            self.absorb_leaked(&body, leaked);
        }

        let document = preamble::combine(self.preamble.as_ref().map(Preamble::raw), &body);
        self.outbound.push(document, now);
    }

    /// The user typed a front matter block into the body.
    ///
    /// With no preamble yet, the first block becomes the preamble; otherwise
    /// the blocks are dropped rather than duplicated. The editor is rewritten
    /// to the clean body without that rewrite counting as a user edit.
    fn absorb_leaked(&mut self, body: &str, leaked: Vec<Preamble>) {
        if self.preamble.is_none() {
            self.set_preamble(leaked.into_iter().next());
        }
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        self.applying_external = true;
        let removed = editor.len_chars().saturating_sub(body.chars().count());
        let cursor = editor.cursor_offset().saturating_sub(removed);
        match editor.replace_content(body) {
            Ok(()) => {
                if let Err(err) = editor.set_cursor_offset(cursor.min(editor.len_chars())) {
                    debug!(%err, "cursor restore after strip failed");
                }
            }
            Err(err) => debug!(%err, "could not rewrite editor body; next edit retries"),
        }
        self.last_editor_content = editor.markdown();
        self.discard_editor_events();
        self.applying_external = false;
    }

    /// Send the pending edit if its window has closed.
    pub(super) fn flush_outbound(&mut self, now: Instant) {
        if let Some(content) = self.outbound.take_ready(now) {
            self.send_edit(content);
        }
    }

    pub(super) fn send_edit(&mut self, content: String) {
        if self.last_synced.as_deref() == Some(content.as_str()) {
            debug!("edit matches synced content; not sending");
            self.stats.skipped_edits += 1;
            return;
        }
        let _scope = crate::perf::scope("edit.send");
        let message = OutboundMessage::Edit {
            content: content.clone(),
        };
        match self.endpoint.send(&message) {
            Ok(()) => {
                debug!(len = content.len(), "sent edit");
                self.stats.edits_sent += 1;
                self.last_synced = Some(content);
            }
            Err(err) => {
                debug!(%err, "dropping outbound edit");
                self.stats.dropped_messages += 1;
            }
        }
    }
}
