use std::fmt;

use tracing::{debug, info, warn};

use super::tracker::{EchoGuard, EditCache};
use super::{BufferChange, HostBuffer};
use crate::events::Subscription;
use crate::transport::{self, HostEndpoint, InboundMessage, OutboundMessage, SurfaceEndpoint};

/// Identifies one editor view attached to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

struct View {
    id: ViewId,
    endpoint: HostEndpoint,
    ready: bool,
    /// Last document this view is known to hold.
    last_sent: Option<String>,
    connected: bool,
}

/// Connects one host buffer to its editor views.
pub struct HostController<B: HostBuffer> {
    buffer: B,
    changes: Subscription<BufferChange>,
    views: Vec<View>,
    next_view: u64,
    guard: EchoGuard,
    edits: EditCache,
}

impl<B: HostBuffer> HostController<B> {
    pub fn new(mut buffer: B) -> Self {
        let changes = buffer.subscribe();
        Self {
            buffer,
            changes,
            views: Vec::new(),
            next_view: 1,
            guard: EchoGuard::new(),
            edits: EditCache::default(),
        }
    }

    /// Attach a new view and return the surface end of its transport.
    pub fn open_view(&mut self) -> (ViewId, SurfaceEndpoint) {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        let (host, surface) = transport::pair();
        self.views.push(View {
            id,
            endpoint: host,
            ready: false,
            last_sent: None,
            connected: true,
        });
        info!(%id, "view opened");
        (id, surface)
    }

    /// Detach a view. Its session will see its sends fail from now on.
    pub fn close_view(&mut self, id: ViewId) -> bool {
        let before = self.views.len();
        self.views.retain(|view| view.id != id);
        let closed = self.views.len() < before;
        if closed {
            info!(%id, "view closed");
        }
        closed
    }

    /// Run one scheduling step: buffer notifications, then view messages.
    ///
    /// Views are brought up to date once, after every edit of the tick has
    /// been applied, so a view never receives text that an edit later in the
    /// same tick already replaced.
    pub fn tick(&mut self) {
        self.buffer.poll();
        let mut changed = false;
        for change in self.changes.drain() {
            changed |= self.on_buffer_change(&change);
        }

        for idx in 0..self.views.len() {
            let messages = self.views[idx].endpoint.drain();
            for message in messages {
                changed |= self.handle_message(idx, message);
            }
        }

        if changed {
            self.sync_views();
        }
        self.views.retain(|view| {
            if !view.connected {
                debug!(id = %view.id, "dropping disconnected view");
            }
            view.connected
        });
        self.guard.tick();
    }

    pub const fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Mutable buffer access, for writers outside the sync engine.
    pub const fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn is_internal_change(&self) -> bool {
        self.guard.is_internal_change()
    }

    /// Returns true when the change came from outside the controller.
    fn on_buffer_change(&mut self, change: &BufferChange) -> bool {
        if self.guard.is_echo(change) {
            debug!(version = change.version, "ignoring echo of our own write");
            return false;
        }
        if self.guard.is_internal_change() {
            debug!(
                version = change.version,
                "external write while our replace is in flight; forwarding"
            );
        }
        true
    }

    /// Returns true when the buffer was rewritten.
    fn handle_message(&mut self, idx: usize, message: OutboundMessage) -> bool {
        match message {
            OutboundMessage::Ready => {
                self.views[idx].ready = true;
                let (text, version) = (self.buffer.text(), self.buffer.version());
                Self::send_update(&mut self.views[idx], &text, version);
                false
            }
            OutboundMessage::Edit { content } => self.apply_edit(idx, content),
        }
    }

    fn apply_edit(&mut self, idx: usize, content: String) -> bool {
        let id = self.views[idx].id;
        self.views[idx].last_sent = Some(content.clone());

        let version = self.buffer.version();
        if self.edits.is_duplicate(&content, version) || content == self.buffer.text() {
            debug!(%id, version, "edit matches buffer; nothing to write");
            return false;
        }

        if let Err(err) = self.buffer.replace_all(&content) {
            warn!(%id, %err, "buffer replace failed; dropping edit");
            return false;
        }
        let version = self.buffer.version();
        self.guard.arm(version, content.clone());
        debug!(%id, version, "applied view edit");
        self.edits.record(content, version);
        true
    }

    /// Send the current buffer text to every ready view that does not hold it yet.
    fn sync_views(&mut self) {
        let (text, version) = (self.buffer.text(), self.buffer.version());
        for view in &mut self.views {
            if !view.ready || view.last_sent.as_deref() == Some(text.as_str()) {
                continue;
            }
            Self::send_update(view, &text, version);
        }
    }

    fn send_update(view: &mut View, text: &str, version: u64) {
        let message = InboundMessage::Update {
            content: text.to_string(),
            version,
        };
        match view.endpoint.send(&message) {
            Ok(()) => view.last_sent = Some(text.to_string()),
            Err(err) => {
                debug!(id = %view.id, %err, "view is gone");
                view.connected = false;
            }
        }
    }
}

impl<B: HostBuffer> fmt::Debug for HostController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostController")
            .field("views", &self.views.len())
            .field("version", &self.buffer.version())
            .field("internal_change", &self.guard.is_internal_change())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryBuffer;

    fn edit(content: &str) -> OutboundMessage {
        OutboundMessage::Edit {
            content: content.to_string(),
        }
    }

    fn updates(surface: &SurfaceEndpoint) -> Vec<String> {
        surface
            .drain()
            .into_iter()
            .map(|InboundMessage::Update { content, .. }| content)
            .collect()
    }

    #[test]
    fn test_ready_receives_current_text() {
        let mut host = HostController::new(MemoryBuffer::new("hello"));
        let (_, surface) = host.open_view();
        surface.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        assert_eq!(
            surface.try_recv(),
            Some(InboundMessage::Update {
                content: "hello".to_string(),
                version: 1
            })
        );
    }

    #[test]
    fn test_edit_replaces_buffer_without_echo() {
        let mut host = HostController::new(MemoryBuffer::new("a").with_deferred_notifications(true));
        let (_, surface) = host.open_view();
        surface.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&surface);

        surface.send(&edit("b")).unwrap();
        host.tick();
        assert_eq!(host.buffer().text(), "b");
        assert!(host.is_internal_change());
        host.tick();
        host.tick();
        assert!(!host.is_internal_change());
        assert!(updates(&surface).is_empty(), "own write must not bounce back");
    }

    #[test]
    fn test_external_write_reaches_all_views() {
        let mut host = HostController::new(MemoryBuffer::new("a"));
        let (_, first) = host.open_view();
        let (_, second) = host.open_view();
        first.send(&OutboundMessage::Ready).unwrap();
        second.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&first);
        updates(&second);

        host.buffer_mut().replace_all("agent wrote this").unwrap();
        host.tick();
        assert_eq!(updates(&first), vec!["agent wrote this".to_string()]);
        assert_eq!(updates(&second), vec!["agent wrote this".to_string()]);
    }

    #[test]
    fn test_edit_from_one_view_updates_the_others() {
        let mut host = HostController::new(MemoryBuffer::new("a"));
        let (_, first) = host.open_view();
        let (_, second) = host.open_view();
        first.send(&OutboundMessage::Ready).unwrap();
        second.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&first);
        updates(&second);

        first.send(&edit("from first")).unwrap();
        host.tick();
        host.tick();
        assert!(updates(&first).is_empty());
        assert_eq!(updates(&second), vec!["from first".to_string()]);
    }

    #[test]
    fn test_concurrent_external_write_is_not_swallowed() {
        let mut host = HostController::new(MemoryBuffer::new("a").with_deferred_notifications(true));
        let (_, surface) = host.open_view();
        surface.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&surface);

        surface.send(&edit("ours")).unwrap();
        host.tick();
        host.buffer_mut().replace_all("theirs").unwrap();
        host.tick();
        assert_eq!(updates(&surface), vec!["theirs".to_string()]);
    }

    #[test]
    fn test_two_edits_in_one_tick_leave_every_view_on_the_last() {
        let mut host = HostController::new(MemoryBuffer::new("start").with_deferred_notifications(true));
        let (_, first) = host.open_view();
        let (_, second) = host.open_view();
        first.send(&OutboundMessage::Ready).unwrap();
        second.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&first);
        updates(&second);

        first.send(&edit("A")).unwrap();
        second.send(&edit("B")).unwrap();
        host.tick();
        let mut first_seen = updates(&first);
        let mut second_seen = updates(&second);
        for _ in 0..4 {
            host.tick();
            first_seen.extend(updates(&first));
            second_seen.extend(updates(&second));
        }

        assert_eq!(host.buffer().text(), "B");
        assert_eq!(first_seen, vec!["B".to_string()]);
        assert!(second_seen.is_empty(), "second view already holds B: {second_seen:?}");
        assert!(!host.is_internal_change());
    }

    #[test]
    fn test_external_write_after_own_edit_reaches_every_view() {
        let mut host = HostController::new(MemoryBuffer::new("a").with_deferred_notifications(true));
        let (_, first) = host.open_view();
        let (_, second) = host.open_view();
        first.send(&OutboundMessage::Ready).unwrap();
        second.send(&OutboundMessage::Ready).unwrap();
        host.tick();
        updates(&first);
        updates(&second);

        first.send(&edit("b")).unwrap();
        host.tick();
        assert_eq!(updates(&second), vec!["b".to_string()]);
        host.buffer_mut().replace_all("c").unwrap();
        host.tick();
        assert_eq!(updates(&first), vec!["c".to_string()]);
        assert_eq!(updates(&second), vec!["c".to_string()]);
    }

    #[test]
    fn test_duplicate_edit_is_not_rewritten() {
        let mut host = HostController::new(MemoryBuffer::new("a"));
        let (_, surface) = host.open_view();
        surface.send(&edit("b")).unwrap();
        host.tick();
        let version = host.buffer().version();
        surface.send(&edit("b")).unwrap();
        host.tick();
        assert_eq!(host.buffer().version(), version);
    }

    #[test]
    fn test_closed_view_is_dropped() {
        let mut host = HostController::new(MemoryBuffer::new("a"));
        let (first, _surface) = host.open_view();
        let (_, second) = host.open_view();
        assert!(host.close_view(first));
        assert!(!host.close_view(first));
        assert_eq!(host.view_count(), 1);

        second.send(&OutboundMessage::Ready).unwrap();
        drop(second);
        host.tick();
        assert_eq!(host.view_count(), 0);
    }
}
