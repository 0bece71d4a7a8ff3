//! # The Scribe: byte-range rewriting and guarded persistence
//!
//! Everything the annotation engine changes in a file is expressed as an
//! [`Edit`]: a byte range of the original source plus replacement text. An
//! insertion is an edit with an empty range. The scribe splices edits
//! **bottom-to-top** so earlier offsets stay valid, and only touches the disk
//! when the spliced bytes differ from what was read.

pub mod safe_write;

pub use safe_write::{apply_edits, Edit, RewriteOutcome, SafeWriter};

/// Errors from scribe operations.
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Edit `{label}` [{start}..{end}) is outside a {len}-byte buffer")]
    OutOfBounds {
        label: String,
        start: u32,
        end: u32,
        len: usize,
    },
    #[error("Edits `{first}` and `{second}` overlap")]
    Overlap { first: String, second: String },
    #[error("Failed to persist {path}: {source}")]
    PersistFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
