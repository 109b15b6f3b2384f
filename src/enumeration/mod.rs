//! Lazy discovery of documentable source objects.
//!
//! Each concrete enumerator covers one provenance (a native module, a content
//! path), runs a one-time prepass query at construction, and then yields
//! cached weak handles. Sequences are finite and non-restartable; liveness of
//! yielded objects is the caller's problem, since an object can be collected
//! between prepass and processing.

pub mod composite;
pub mod content;
pub mod native;

pub use composite::CompositeEnumerator;
pub use content::ContentPathEnumerator;
pub use native::NativeModuleEnumerator;

use miette::Diagnostic;
use thiserror::Error;

use crate::reflection::SourceObject;

#[derive(Debug, Error, Diagnostic)]
pub enum EnumerationError {
    #[error("no native module named {module:?} is registered")]
    #[diagnostic(
        code(graphdoc::enumeration::unknown_module),
        help("Module names must match the declaring module of at least one registered class.")
    )]
    UnknownModule { module: String },

    #[error("no content registered under {path:?}")]
    #[diagnostic(
        code(graphdoc::enumeration::unknown_content_root),
        help("Content paths must prefix at least one registered graph asset.")
    )]
    UnknownContentRoot { path: String },
}

/// A lazy, finite, non-restartable producer of source objects from one
/// provenance.
pub trait SourceEnumerator: Send {
    /// The next candidate, or `None` once the sequence is exhausted.
    fn next(&mut self) -> Option<SourceObject>;

    /// Fraction of the sequence consumed so far, in `[0, 1]`. Monotonically
    /// non-decreasing across `next` calls and exactly 1.0 at exhaustion
    /// (an empty sequence is exhausted from the start).
    fn estimate_progress(&self) -> f32;

    /// Number of candidates found by the prepass.
    fn estimated_size(&self) -> usize;
}

/// Shared cursor logic for prepass-cached enumerators.
pub(crate) fn cursor_progress(cursor: usize, len: usize) -> f32 {
    if len == 0 {
        1.0
    } else {
        cursor as f32 / len as f32
    }
}
