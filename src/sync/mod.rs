//! The bidirectional sync engine.
//!
//! An [`EditorSession`] binds one rich editor to one document view. It is
//! driven entirely by [`EditorSession::tick`] with an explicit `now`, which
//! drains the transport and the editor's change events and fires whichever
//! debounce deadline has passed:
//!
//! - outbound: editor edits are coalesced and sent as one `edit` message
//! - inbound: host `update` messages are coalesced, held back while the user
//!   is typing, then applied with the cursor preserved

mod debounce;
mod inbound;
mod outbound;
mod session;

pub use debounce::Debounced;
pub use session::EditorSession;

use std::time::Duration;

/// Debounce and idle timings for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// Coalescing window for editor edits before they are sent.
    pub outbound_debounce: Duration,
    /// Coalescing window for host updates before they are applied.
    pub inbound_debounce: Duration,
    /// How long the user must be idle before an external update may replace content.
    pub idle_threshold: Duration,
}

impl SyncTimings {
    pub const fn from_millis(outbound: u64, inbound: u64, idle: u64) -> Self {
        Self {
            outbound_debounce: Duration::from_millis(outbound),
            inbound_debounce: Duration::from_millis(inbound),
            idle_threshold: Duration::from_millis(idle),
        }
    }
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self::from_millis(20, 30, 150)
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the first update; no editor yet.
    Uninitialized,
    Ready,
    /// Closed. Every further message is dropped.
    Disposed,
}

/// Counters for what a session did, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub updates_received: u64,
    pub applies: u64,
    pub skipped_applies: u64,
    pub deferrals: u64,
    pub fallbacks: u64,
    pub edits_sent: u64,
    pub skipped_edits: u64,
    pub ignored_events: u64,
    pub leaked_blocks: u64,
    pub dropped_messages: u64,
}
