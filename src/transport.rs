//! Message channel between the editing surface and the host controller.
//!
//! The pipe carries JSON strings, in order, without blocking the sender.
//! Frames that fail to decode are logged and dropped.

use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Host → surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    /// Full current document text. `version` is advisory.
    Update { content: String, version: u64 },
}

/// Surface → host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Replace the whole document with `content`.
    Edit { content: String },
    /// The surface is listening; send the first update.
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport peer is gone")]
    Disconnected,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One end of the pipe: sends `S`, receives `R`.
#[derive(Debug)]
pub struct Endpoint<S, R> {
    tx: Sender<String>,
    rx: Receiver<String>,
    _marker: PhantomData<fn(S) -> R>,
}

pub type HostEndpoint = Endpoint<InboundMessage, OutboundMessage>;
pub type SurfaceEndpoint = Endpoint<OutboundMessage, InboundMessage>;

/// Create a connected host/surface pair.
pub fn pair() -> (HostEndpoint, SurfaceEndpoint) {
    let (to_surface, from_host) = mpsc::channel();
    let (to_host, from_surface) = mpsc::channel();
    (
        Endpoint {
            tx: to_surface,
            rx: from_surface,
            _marker: PhantomData,
        },
        Endpoint {
            tx: to_host,
            rx: from_host,
            _marker: PhantomData,
        },
    )
}

impl<S: Serialize, R: DeserializeOwned> Endpoint<S, R> {
    /// Encode and queue `message` for the peer.
    ///
    /// # Errors
    /// Returns [`TransportError::Disconnected`] once the peer endpoint is dropped.
    pub fn send(&self, message: &S) -> Result<(), TransportError> {
        let wire = serde_json::to_string(message)?;
        self.send_raw(wire)
    }

    /// Queue an already-encoded frame.
    ///
    /// # Errors
    /// Returns [`TransportError::Disconnected`] once the peer endpoint is dropped.
    pub fn send_raw(&self, wire: String) -> Result<(), TransportError> {
        self.tx.send(wire).map_err(|_| TransportError::Disconnected)
    }

    /// Next decodable message, skipping malformed frames.
    pub fn try_recv(&self) -> Option<R> {
        loop {
            let wire = match self.rx.try_recv() {
                Ok(wire) => wire,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            };
            match serde_json::from_str(&wire) {
                Ok(message) => return Some(message),
                Err(err) => {
                    tracing::warn!(%err, len = wire.len(), "dropping undecodable frame");
                    crate::perf::log_event("transport.decode_error", format!("{err}"));
                }
            }
        }
    }

    /// Every message currently queued.
    pub fn drain(&self) -> Vec<R> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
