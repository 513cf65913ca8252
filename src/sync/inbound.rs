//! Host → editor: coalesce updates, wait for the user to pause, apply.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::SessionState;
use super::session::EditorSession;
use crate::editor::RichEditor;
use crate::preamble::{self, normalize_line_endings};
use crate::transport::InboundMessage;

/// An update waiting in the inbound slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingUpdate {
    pub(crate) content: String,
    pub(crate) version: u64,
}

impl<E: RichEditor> EditorSession<E> {
    pub(super) fn receive(&mut self, message: InboundMessage, now: Instant) {
        let InboundMessage::Update { content, version } = message;
        if self
            .last_version
            .is_some_and(|last| version < last)
        {
            debug!(version, last = ?self.last_version, "update version went backwards");
        }
        self.last_version = Some(version);
        self.stats.updates_received += 1;

        match self.state {
            SessionState::Uninitialized => self.initialize(content, version),
            SessionState::Ready => self.inbound.push(PendingUpdate { content, version }, now),
            SessionState::Disposed => self.stats.dropped_messages += 1,
        }
    }

    /// First update: build the editor from scratch.
    fn initialize(&mut self, content: String, version: u64) {
        let _scope = crate::perf::scope("session.init");
        let extracted = preamble::extract(&content);
        let (body, _) = self.sanitize_body(extracted.body, "inbound");
        let mut editor = match E::create(&body) {
            Ok(editor) => editor,
            Err(err) => {
                error!(%err, version, "editor initialization failed; waiting for next update");
                return;
            }
        };
        self.events = Some(editor.subscribe());
        self.last_editor_content = editor.markdown();
        self.editor = Some(editor);
        self.set_preamble(extracted.preamble);
        self.last_synced = Some(content);
        self.state = SessionState::Ready;
        self.stats.applies += 1;
        info!(version, "editor session initialized");
        crate::perf::log_event("session.init", format!("version={version}"));
    }

    /// Fire the inbound slot if due, deferring while the user is typing.
    pub(super) fn fire_inbound(&mut self, now: Instant) {
        let Some(update) = self.inbound.take_ready(now) else {
            return;
        };
        if let Some(last_edit) = self.last_local_edit {
            let resume_at = last_edit + self.timings.idle_threshold;
            if now < resume_at {
                debug!(
                    version = update.version,
                    wait = ?(resume_at - now),
                    "user is typing; deferring external update"
                );
                self.stats.deferrals += 1;
                self.inbound.push_until(update, resume_at);
                return;
            }
        }
        // A local edit still waiting for its window goes out first, so it is
        // never sent after the update that replaces it in the editor.
        if let Some(content) = self.outbound.cancel() {
            debug!(version = update.version, "sending pending edit before external update");
            self.send_edit(content);
        }
        self.commit(update);
    }

    fn commit(&mut self, update: PendingUpdate) {
        let unchanged = self.last_synced.as_deref().is_some_and(|last| {
            normalize_line_endings(last) == normalize_line_endings(&update.content)
        });
        if unchanged {
            debug!(version = update.version, "update matches editor content; skipping");
            self.stats.skipped_applies += 1;
            return;
        }
        self.apply_external(update);
    }

    fn apply_external(&mut self, update: PendingUpdate) {
        let _scope = crate::perf::scope("apply.external");
        if self.editor.is_none() {
            return;
        }
        self.applying_external = true;
        let extracted = preamble::extract(&update.content);
        let (body, _) = self.sanitize_body(extracted.body, "inbound");

        let Some(editor) = self.editor.as_mut() else {
            self.applying_external = false;
            return;
        };
        let cursor = editor.cursor_offset();
        if let Err(err) = editor.replace_content(&body) {
            warn!(%err, version = update.version, "content replace failed; rebuilding editor");
            self.stats.fallbacks += 1;
            crate::perf::log_event("apply.fallback", format!("{err}"));
            match E::create(&body) {
                Ok(mut fresh) => {
                    self.events = Some(fresh.subscribe());
                    *editor = fresh;
                }
                Err(err) => {
                    error!(%err, "editor rebuild failed; keeping previous content");
                    self.applying_external = false;
                    return;
                }
            }
        }

        let target = cursor.min(editor.len_chars());
        if let Err(err) = editor.set_cursor_offset(target) {
            debug!(%err, "cursor restore failed; moving to start");
            if let Err(err) = editor.set_cursor_offset(0) {
                debug!(%err, "editor rejected cursor at start");
            }
        }
        self.last_editor_content = editor.markdown();

        self.set_preamble(extracted.preamble);
        self.last_synced = Some(update.content);
        self.discard_editor_events();
        self.stats.applies += 1;
        self.applying_external = false;
        debug!(version = update.version, "applied external update");
    }
}
