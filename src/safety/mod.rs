//! Filesystem confinement for the note tools.
//!
//! The model decides which paths to pass to the tools, and its input is
//! shaped by untrusted end-user text, so every path is re-rooted under the
//! scratch directory before any I/O happens.

pub mod scratch;

pub use scratch::ScratchRoot;
