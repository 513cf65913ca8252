//! The host side: the authoritative text buffer and its controller.
//!
//! A [`HostBuffer`] owns the document text. The [`HostController`] connects
//! it to any number of editor views over the transport, forwarding external
//! buffer changes to every view and applying view edits back to the buffer
//! without bouncing them around again.

mod controller;
mod file;
mod memory;
mod tracker;

pub use controller::{HostController, ViewId};
pub use file::FileBuffer;
pub use memory::MemoryBuffer;
pub use tracker::{EchoGuard, EditCache};

use crate::events::Subscription;

/// A change notification from a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferChange {
    pub version: u64,
    /// Full buffer text after the change.
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("buffer I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// The authoritative text buffer owned by the host editor.
pub trait HostBuffer {
    /// Current full text.
    fn text(&self) -> String;

    /// Replace the whole text in one operation.
    ///
    /// Change notifications for this write may arrive later than the call
    /// returns.
    ///
    /// # Errors
    /// Returns [`HostError`] if the underlying storage rejects the write.
    fn replace_all(&mut self, text: &str) -> Result<(), HostError>;

    /// Monotonic version counter, bumped on every change.
    fn version(&self) -> u64;

    /// Subscribe to change notifications.
    fn subscribe(&mut self) -> Subscription<BufferChange>;

    /// Deliver notifications that were produced asynchronously.
    fn poll(&mut self) {}
}
