//! Echo suppression for buffer writes made on behalf of an editor view.

use std::collections::VecDeque;

use super::BufferChange;

/// Marks the controller's own buffer writes as internal.
///
/// Every write is recorded with the version it produced right after the
/// controller replaces the buffer text for a view edit. A record stays for
/// the rest of that tick and one more full tick, since hosts may report the
/// replace after the call has returned, and is consumed by the notification
/// it matches.
#[derive(Debug, Default)]
pub struct EchoGuard {
    writes: VecDeque<OwnWrite>,
}

#[derive(Debug)]
struct OwnWrite {
    version: u64,
    text: String,
    ticks_left: u8,
}

impl EchoGuard {
    pub const fn new() -> Self {
        Self {
            writes: VecDeque::new(),
        }
    }

    /// Record a write of `text` that moved the buffer to `version`.
    pub fn arm(&mut self, version: u64, text: String) {
        self.writes.push_back(OwnWrite {
            version,
            text,
            ticks_left: 1,
        });
    }

    /// Whether any of our writes is still waiting for its notification.
    pub fn is_internal_change(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Whether `change` is the notification of one of our writes.
    ///
    /// A matching record is consumed. Anything else arriving while armed is a
    /// concurrent external write and must not be swallowed.
    pub fn is_echo(&mut self, change: &BufferChange) -> bool {
        let Some(idx) = self
            .writes
            .iter()
            .position(|write| write.version == change.version && write.text == change.text)
        else {
            return false;
        };
        self.writes.remove(idx);
        true
    }

    /// Advance one controller tick; drops records whose grace tick is over.
    pub fn tick(&mut self) {
        self.writes.retain_mut(|write| {
            if write.ticks_left == 0 {
                return false;
            }
            write.ticks_left -= 1;
            true
        });
    }
}

/// Last edit received from any view, with the buffer version it produced.
#[derive(Debug, Default)]
pub struct EditCache {
    last_received: Option<(String, u64)>,
}

impl EditCache {
    pub fn record(&mut self, content: String, version: u64) {
        self.last_received = Some((content, version));
    }

    /// True when `content` was already applied and the buffer has not moved since.
    pub fn is_duplicate(&self, content: &str, current_version: u64) -> bool {
        self.last_received
            .as_ref()
            .is_some_and(|(last, version)| *version == current_version && last == content)
    }

    pub fn last_received(&self) -> Option<&str> {
        self.last_received.as_ref().map(|(content, _)| content.as_str())
    }
}
