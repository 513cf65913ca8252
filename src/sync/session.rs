use std::time::Instant;

use tracing::{debug, info, warn};

use super::debounce::Debounced;
use super::inbound::PendingUpdate;
use super::{SessionState, SessionStats, SyncTimings};
use crate::editor::{EditorEvent, RichEditor};
use crate::events::Subscription;
use crate::preamble::{self, DisplayTree, Preamble};
use crate::transport::{OutboundMessage, SurfaceEndpoint};

/// One rich editor bound to one document view.
pub struct EditorSession<E: RichEditor> {
    pub(super) endpoint: SurfaceEndpoint,
    pub(super) timings: SyncTimings,
    pub(super) state: SessionState,
    pub(super) editor: Option<E>,
    pub(super) events: Option<Subscription<EditorEvent>>,
    pub(super) preamble: Option<Preamble>,
    pub(super) display: DisplayTree,
    /// Last document known to be on both sides: applied from the host or sent to it.
    pub(super) last_synced: Option<String>,
    /// Editor markdown as of the last event we handled.
    pub(super) last_editor_content: String,
    pub(super) last_local_edit: Option<Instant>,
    pub(super) last_version: Option<u64>,
    pub(super) applying_external: bool,
    pub(super) outbound: Debounced<String>,
    pub(super) inbound: Debounced<PendingUpdate>,
    pub(super) stats: SessionStats,
}

impl<E: RichEditor> EditorSession<E> {
    /// Open a session on `endpoint` and announce it with a `ready` message.
    pub fn open(endpoint: SurfaceEndpoint, timings: SyncTimings) -> Self {
        let mut session = Self {
            endpoint,
            timings,
            state: SessionState::Uninitialized,
            editor: None,
            events: None,
            preamble: None,
            display: DisplayTree::default(),
            last_synced: None,
            last_editor_content: String::new(),
            last_local_edit: None,
            last_version: None,
            applying_external: false,
            outbound: Debounced::new(timings.outbound_debounce),
            inbound: Debounced::new(timings.inbound_debounce),
            stats: SessionStats::default(),
        };
        if let Err(err) = session.endpoint.send(&OutboundMessage::Ready) {
            warn!(%err, "could not announce session");
            session.stats.dropped_messages += 1;
        }
        session
    }

    /// Run one scheduling step at time `now`.
    ///
    /// Order: incoming messages, editor events, outbound flush, inbound apply.
    /// Flushing first means a finished local edit leaves before an external
    /// update can replace the content it was made on.
    pub fn tick(&mut self, now: Instant) {
        if self.state == SessionState::Disposed {
            let dropped = self.endpoint.drain().len() as u64;
            if dropped > 0 {
                debug!(dropped, "session disposed; dropping messages");
                self.stats.dropped_messages += dropped;
            }
            return;
        }
        while let Some(message) = self.endpoint.try_recv() {
            self.receive(message, now);
        }
        self.process_editor_events(now);
        self.flush_outbound(now);
        self.fire_inbound(now);
    }

    /// Run a local edit against the editor and register it at `now`.
    ///
    /// Returns `None` when there is no editor yet (or any more).
    pub fn edit<R>(&mut self, now: Instant, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        let result = f(self.editor.as_mut()?);
        self.process_editor_events(now);
        Some(result)
    }

    /// Earliest pending deadline in either direction.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.outbound.deadline(), self.inbound.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Close the session.
    ///
    /// A pending local edit is sent right away so typing is never lost; a
    /// pending inbound update is dropped. The editor, its subscription and all
    /// cached state go away.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        if let Some(content) = self.outbound.cancel() {
            self.send_edit(content);
        }
        if self.inbound.cancel().is_some() {
            self.stats.dropped_messages += 1;
        }
        self.events = None;
        self.editor = None;
        self.preamble = None;
        self.display = DisplayTree::default();
        self.last_synced = None;
        self.last_editor_content.clear();
        self.last_local_edit = None;
        self.state = SessionState::Disposed;
        info!("editor session disposed");
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    pub const fn timings(&self) -> SyncTimings {
        self.timings
    }

    pub const fn editor(&self) -> Option<&E> {
        self.editor.as_ref()
    }

    /// Direct editor access. Changes made here are picked up on the next tick.
    pub const fn editor_mut(&mut self) -> Option<&mut E> {
        self.editor.as_mut()
    }

    pub const fn preamble(&self) -> Option<&Preamble> {
        self.preamble.as_ref()
    }

    /// Rendered view of the current preamble; empty when there is none.
    pub const fn preamble_display(&self) -> &DisplayTree {
        &self.display
    }

    pub fn last_synced(&self) -> Option<&str> {
        self.last_synced.as_deref()
    }

    /// The full document as the editor currently sees it.
    pub fn document(&self) -> Option<String> {
        let editor = self.editor.as_ref()?;
        Some(preamble::combine(
            self.preamble.as_ref().map(Preamble::raw),
            &editor.markdown(),
        ))
    }

    pub const fn is_applying_external(&self) -> bool {
        self.applying_external
    }

    pub(super) fn set_preamble(&mut self, preamble: Option<Preamble>) {
        self.display = preamble.as_ref().map(Preamble::render).unwrap_or_default();
        self.preamble = preamble;
    }

    /// Strip any preamble block still sitting at the front of `body`.
    ///
    /// Returns the cleaned body and the stripped blocks.
    pub(super) fn sanitize_body(&mut self, body: String, direction: &str) -> (String, Vec<Preamble>) {
        if !body.starts_with(preamble::FENCE) {
            return (body, Vec::new());
        }
        let stripped = preamble::strip_leaked(&body);
        if stripped.blocks.is_empty() {
            return (body, Vec::new());
        }
        let count = stripped.blocks.len();
        warn!(count, direction, "front matter block found in editor body; stripping");
        crate::perf::log_event(
            "preamble.leaked",
            format!("direction={direction} blocks={count}"),
        );
        self.stats.leaked_blocks += count as u64;
        (stripped.body, stripped.blocks)
    }

    /// Drop editor events queued so far without treating them as edits.
    pub(super) fn discard_editor_events(&self) {
        if let Some(events) = &self.events {
            events.drain();
        }
    }
}

impl<E: RichEditor> Drop for EditorSession<E> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<E: RichEditor> std::fmt::Debug for EditorSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("state", &self.state)
            .field("has_preamble", &self.preamble.is_some())
            .field("outbound_pending", &self.outbound.is_pending())
            .field("inbound_pending", &self.inbound.is_pending())
            .field("applying_external", &self.applying_external)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
