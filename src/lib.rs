// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. host::HostBuffer)
    clippy::module_name_repetitions
)]

//! # marksync
//!
//! Bidirectional sync between a host's plain-text markdown buffer and a
//! rich editing surface.
//!
//! The host owns the document. Each editing surface shows the document body
//! in a rich editor, with the YAML front matter ("preamble") kept outside the
//! editor and shown as a read-only structured view. Edits flow both ways:
//! - typing in the editor is coalesced and sent to the host as a full document
//! - changes to the host buffer (including from other processes) are
//!   coalesced, held back while the user is typing, and applied with the
//!   cursor preserved
//!
//! ## Modules
//!
//! - [`preamble`]: Front matter extraction, recombination and display
//! - [`sync`]: The editor session and its debounce scheduling
//! - [`editor`]: The rich-editor interface and an in-memory implementation
//! - [`host`]: Host buffers and the controller that serves editor views
//! - [`transport`]: The JSON message channel between the two sides
//! - [`watcher`]: File watching
//! - [`config`]: Flags and saved defaults

pub mod config;
pub mod editor;
pub mod events;
pub mod host;
pub mod perf;
pub mod preamble;
pub mod sync;
pub mod transport;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::editor::{EditorBuffer, RichEditor};
    pub use crate::host::{FileBuffer, HostBuffer, HostController, MemoryBuffer};
    pub use crate::preamble::{DisplayTree, Preamble};
    pub use crate::sync::{EditorSession, SessionState, SyncTimings};
}
