//! # The Anatomist: TypeScript Parsing & Annotation Decisions
//!
//! **Role**: Parses TypeScript sources with tree-sitter, finds every
//! function-like node and decides whether (and with what text) it gets an
//! explicit return type.
//!
//! **Core Types**:
//! - `SourceUnit`: one parsed file, owner of its text and syntax tree.
//! - `Candidate`: a function-like node (`FunctionDecl`, `FunctionExpr`, `ArrowFn`,
//!   `MethodDecl`) viewed through its capabilities.
//! - `FilterChain`: the ordered exclusion rules; first exclusion wins.
//! - `TypeOracle`: the injected type-inference capability.
//! - `Annotator`: the per-file engine tying the above together.
//!
//! **Design**:
//! - The engine never infers types; it asks the oracle and only decides.
//! - Rewrites are byte-range edits handed to `scribe`, so formatting outside
//!   the inserted annotations is preserved byte-for-byte.
//! - One file, one `SourceUnit`, one worker: nothing here is shared mutably.

pub mod candidate;
pub mod filters;
pub mod parser;
pub mod path_util;
pub mod pipeline;
pub mod resolve;
pub mod scan;
pub mod shape;
pub mod syntax;
pub mod types;

pub use candidate::{Body, Candidate, FunctionKind, Parameter};
pub use filters::{Filter, FilterChain};
pub use parser::{ParserHost, SourceLanguage, SourceUnit};
pub use pipeline::{AnnotationPlan, Annotator, FileReport, NodeDiagnostic};
pub use scan::{list_source_files, ScanOptions};
pub use types::{FnParam, InferredType, Member, OracleError, Primitive, RenderFlags, TypeOracle};

// The option set and decision types live in `common` so the CLI can build
// them without depending on tree-sitter types; re-exported for convenience.
pub use common::{AnnotateOptions, Decision, Exclusion};

/// Errors from anatomist operations.
#[derive(Debug, thiserror::Error)]
pub enum AnatomistError {
    #[error("Parse failure: {0}")]
    ParseFailure(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not a TypeScript source file: {}", .0.display())]
    UnsupportedFile(std::path::PathBuf),
    #[error("Invalid ignore pattern `{pattern}`: {reason}")]
    InvalidGlob { pattern: String, reason: String },
    #[error("File exceeds 4GB limit (tree-sitter u32 byte range)")]
    ByteRangeOverflow,
    #[error("Rewrite failed: {0}")]
    Rewrite(#[from] scribe::ScribeError),
}
