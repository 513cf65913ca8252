use ropey::Rope;

use super::{BufferChange, HostBuffer, HostError};
use crate::events::{Listeners, Subscription};

/// An in-memory host buffer.
///
/// With deferred notifications enabled, change events are held until the
/// next [`poll`](HostBuffer::poll), the way an editor host reports a
/// replace only after the edit call has returned.
#[derive(Debug)]
pub struct MemoryBuffer {
    rope: Rope,
    version: u64,
    deferred: bool,
    queued: Vec<BufferChange>,
    listeners: Listeners<BufferChange>,
}

impl MemoryBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            version: 1,
            deferred: false,
            queued: Vec::new(),
            listeners: Listeners::new(),
        }
    }

    #[must_use]
    pub const fn with_deferred_notifications(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// Number of notifications waiting for the next poll.
    pub fn queued(&self) -> usize {
        self.queued.len()
    }
}

impl HostBuffer for MemoryBuffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn replace_all(&mut self, text: &str) -> Result<(), HostError> {
        self.rope = Rope::from_str(text);
        self.version += 1;
        let change = BufferChange {
            version: self.version,
            text: text.to_string(),
        };
        if self.deferred {
            self.queued.push(change);
        } else {
            self.listeners.emit(&change);
        }
        Ok(())
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn subscribe(&mut self) -> Subscription<BufferChange> {
        self.listeners.subscribe()
    }

    fn poll(&mut self) {
        for change in std::mem::take(&mut self.queued) {
            self.listeners.emit(&change);
        }
    }
}
