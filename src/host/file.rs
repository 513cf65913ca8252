use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::{BufferChange, HostBuffer, HostError};
use crate::events::{Listeners, Subscription};
use crate::watcher::FileWatcher;

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// A host buffer backed by a file on disk.
///
/// Writes go straight to the file. With a watcher attached, writes made by
/// other processes are picked up on [`poll`](HostBuffer::poll); the content
/// hash filters out the watcher's report of our own writes.
#[derive(Debug)]
pub struct FileBuffer {
    path: PathBuf,
    text: String,
    version: u64,
    known_hash: u64,
    watcher: Option<FileWatcher>,
    listeners: Listeners<BufferChange>,
}

impl FileBuffer {
    /// Open `path`, creating an empty file if it does not exist.
    ///
    /// # Errors
    /// Returns [`HostError::Io`] if the file cannot be read or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref().to_path_buf();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::write(&path, "")?;
                String::new()
            }
            Err(err) => return Err(err.into()),
        };
        let known_hash = hash_bytes(text.as_bytes());
        tracing::info!(path = %path.display(), len = text.len(), "opened document");
        Ok(Self {
            path,
            text,
            version: 1,
            known_hash,
            watcher: None,
            listeners: Listeners::new(),
        })
    }

    /// Watch the file for external writes, debounced by `debounce`.
    ///
    /// # Errors
    /// Returns [`HostError::Watch`] if the watcher cannot be installed.
    pub fn with_watch(mut self, debounce: Duration) -> Result<Self, HostError> {
        self.watcher = Some(FileWatcher::new(&self.path, debounce)?);
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Re-read the file and notify if its content changed since we last saw it.
    ///
    /// # Errors
    /// Returns [`HostError::Io`] if the file cannot be read.
    pub fn reload(&mut self) -> Result<bool, HostError> {
        let _scope = crate::perf::scope("file.reload");
        let text = std::fs::read_to_string(&self.path)?;
        let hash = hash_bytes(text.as_bytes());
        if hash == self.known_hash {
            crate::perf::log_event("file.reload", "unchanged");
            return Ok(false);
        }
        self.known_hash = hash;
        self.text = text;
        self.version += 1;
        crate::perf::log_event(
            "file.reload",
            format!("version={} len={}", self.version, self.text.len()),
        );
        self.listeners.emit(&BufferChange {
            version: self.version,
            text: self.text.clone(),
        });
        Ok(true)
    }

    /// Check the watcher at `now` and reload when a change has settled.
    pub fn poll_at(&mut self, now: Instant) {
        let ready = self
            .watcher
            .as_mut()
            .is_some_and(|watcher| watcher.take_change_ready(now));
        if !ready {
            return;
        }
        if let Err(err) = self.reload() {
            tracing::warn!(%err, path = %self.path.display(), "failed to reload document");
        }
    }

    /// When the watcher's pending change, if any, becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.as_ref().and_then(FileWatcher::next_deadline)
    }
}

impl HostBuffer for FileBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn replace_all(&mut self, text: &str) -> Result<(), HostError> {
        std::fs::write(&self.path, text)?;
        self.known_hash = hash_bytes(text.as_bytes());
        self.text = text.to_string();
        self.version += 1;
        self.listeners.emit(&BufferChange {
            version: self.version,
            text: self.text.clone(),
        });
        Ok(())
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn subscribe(&mut self) -> Subscription<BufferChange> {
        self.listeners.subscribe()
    }

    fn poll(&mut self) {
        self.poll_at(Instant::now());
    }
}
