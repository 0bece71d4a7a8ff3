//! Splicing edits into a source buffer and writing the result back atomically.
//!
//! ## Workflow
//! 1. The engine collects one [`Edit`] per annotated node.
//! 2. [`apply_edits`] sorts them **bottom-to-top** (descending `start_byte`) and
//!    splices each replacement into a copy of the original bytes.
//! 3. [`SafeWriter::rewrite`] compares the result with the original and, only if
//!    they differ, writes a sibling temp file and renames it over the original.
//!    A crash mid-write therefore never leaves a half-written source file.

use crate::ScribeError;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// One splice: replace `[start_byte, end_byte)` of the original with `replacement`.
///
/// `start_byte == end_byte` is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Human-readable target name (for logging and error messages only).
    pub label: String,
    /// Byte offset of the first byte to replace (inclusive).
    pub start_byte: u32,
    /// Byte offset just past the replaced range (exclusive).
    pub end_byte: u32,
    /// UTF-8 text spliced in place of the range.
    pub replacement: String,
}

impl Edit {
    /// Inserts `text` at `offset` without removing anything.
    pub fn insert(label: impl Into<String>, offset: u32, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start_byte: offset,
            end_byte: offset,
            replacement: text.into(),
        }
    }

    /// Replaces `[start, end)` with `text`.
    pub fn replace(label: impl Into<String>, start: u32, end: u32, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start_byte: start,
            end_byte: end,
            replacement: text.into(),
        }
    }
}

/// What [`SafeWriter::rewrite`] did with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteOutcome {
    /// Number of edits spliced into the buffer.
    pub applied: usize,
    /// `true` if the file on disk was replaced.
    pub written: bool,
}

/// Applies `edits` to `source` and returns the new buffer.
///
/// Edits are processed **bottom-to-top** so that offsets taken from the
/// original parse stay valid after each splice. Overlapping ranges are
/// rejected; two insertions at the same offset are not.
pub fn apply_edits(source: &[u8], edits: &mut [Edit]) -> Result<Vec<u8>, ScribeError> {
    // Sort descending: splice bottom-to-top.
    edits.sort_by(|a, b| {
        b.start_byte
            .cmp(&a.start_byte)
            .then(b.end_byte.cmp(&a.end_byte))
    });

    for pair in edits.windows(2) {
        let (later, earlier) = (&pair[0], &pair[1]);
        if earlier.end_byte > later.start_byte {
            return Err(ScribeError::Overlap {
                first: earlier.label.clone(),
                second: later.label.clone(),
            });
        }
    }

    let mut content = source.to_vec();
    for edit in edits.iter() {
        let start = snap_char_boundary_bwd(source, edit.start_byte as usize);
        let end = snap_char_boundary_fwd(source, edit.end_byte as usize);

        if start > source.len() || end > source.len() || start > end {
            return Err(ScribeError::OutOfBounds {
                label: edit.label.clone(),
                start: edit.start_byte,
                end: edit.end_byte,
                len: source.len(),
            });
        }

        let replacement = edit.replacement.as_bytes();
        let mut next = Vec::with_capacity(content.len() - (end - start) + replacement.len());
        next.extend_from_slice(&content[..start]);
        next.extend_from_slice(replacement);
        next.extend_from_slice(&content[end..]);
        content = next;
    }

    Ok(content)
}

/// Writes spliced sources back to disk, never rewriting identical bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeWriter {
    dry_run: bool,
}

impl SafeWriter {
    /// Creates a writer. With `dry_run` the edits are computed but nothing is written.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Splices `edits` into `original` (the bytes previously read from `path`)
    /// and persists the result if it differs.
    ///
    /// Returns the number of edits applied and whether a write happened. An
    /// empty edit list performs no I/O at all.
    pub fn rewrite(
        &self,
        path: &Path,
        original: &[u8],
        edits: &mut [Edit],
    ) -> Result<RewriteOutcome, ScribeError> {
        if edits.is_empty() {
            return Ok(RewriteOutcome::default());
        }

        let updated = apply_edits(original, edits)?;
        let applied = edits.len();

        if updated == original {
            debug!(file = %path.display(), "edits produced identical bytes; not writing");
            return Ok(RewriteOutcome {
                applied,
                written: false,
            });
        }
        if self.dry_run {
            return Ok(RewriteOutcome {
                applied,
                written: false,
            });
        }

        persist_atomically(path, &updated)?;
        Ok(RewriteOutcome {
            applied,
            written: true,
        })
    }
}

/// Writes `content` to a temp file beside `path`, copies the original
/// permissions onto it, then renames it over `path`.
fn persist_atomically(path: &Path, content: &[u8]) -> Result<(), ScribeError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| ScribeError::PersistFailure {
        path: path.display().to_string(),
        source: e.error,
    })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// UTF-8 boundary helpers
// ---------------------------------------------------------------------------

/// Snaps `offset` backward to the start of the current UTF-8 character.
///
/// Uses `str::is_char_boundary` when the buffer is valid UTF-8. Falls back to
/// the continuation-byte mask (`0x80–0xBF`) otherwise.
fn snap_char_boundary_bwd(buf: &[u8], mut offset: usize) -> usize {
    if offset >= buf.len() {
        return offset;
    }
    match std::str::from_utf8(buf) {
        Ok(s) => {
            while offset > 0 && !s.is_char_boundary(offset) {
                offset -= 1;
            }
        }
        Err(_) => {
            while offset > 0 && (buf[offset] & 0xC0) == 0x80 {
                offset -= 1;
            }
        }
    }
    offset
}

/// Snaps `offset` forward past any UTF-8 continuation bytes.
fn snap_char_boundary_fwd(buf: &[u8], mut offset: usize) -> usize {
    match std::str::from_utf8(buf) {
        Ok(s) => {
            while offset < buf.len() && !s.is_char_boundary(offset) {
                offset += 1;
            }
        }
        Err(_) => {
            while offset < buf.len() && (buf[offset] & 0xC0) == 0x80 {
                offset += 1;
            }
        }
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_bottom_to_top_insertions() {
        let src = b"function a() {}\nfunction b() {}\n";
        let mut edits = vec![
            Edit::insert("a", 12, ": void"),
            Edit::insert("b", 28, ": void"),
        ];
        let out = apply_edits(src, &mut edits).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "function a(): void {}\nfunction b(): void {}\n"
        );
    }

    #[test]
    fn test_replace_existing_annotation() {
        let src = b"function a(): number { return 'x' }";
        let mut edits = vec![Edit::replace("a", 12, 20, ": string")];
        let out = apply_edits(src, &mut edits).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "function a(): string { return 'x' }"
        );
    }

    #[test]
    fn test_overlap_rejected() {
        let src = b"0123456789";
        let mut edits = vec![Edit::replace("x", 2, 6, "a"), Edit::replace("y", 4, 8, "b")];
        let err = apply_edits(src, &mut edits).unwrap_err();
        assert!(matches!(err, ScribeError::Overlap { .. }));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let src = b"abc";
        let mut edits = vec![Edit::insert("x", 10, "!")];
        let err = apply_edits(src, &mut edits).unwrap_err();
        assert!(matches!(err, ScribeError::OutOfBounds { .. }));
    }

    #[test]
    fn test_insert_at_end_of_buffer() {
        let src = b"abc";
        let mut edits = vec![Edit::insert("x", 3, "!")];
        assert_eq!(apply_edits(src, &mut edits).unwrap(), b"abc!");
    }

    #[test]
    fn test_empty_edits_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("empty.ts");
        fs::write(&file, b"const x = 1;\n").unwrap();

        let writer = SafeWriter::new(false);
        let outcome = writer.rewrite(&file, b"const x = 1;\n", &mut []).unwrap();
        assert_eq!(outcome, RewriteOutcome::default());
    }

    #[test]
    fn test_rewrite_writes_changed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("greet.ts");
        let src = b"function greet() { return 1 }\n";
        fs::write(&file, src).unwrap();

        let writer = SafeWriter::new(false);
        let mut edits = vec![Edit::insert("greet", 16, ": number")];
        let outcome = writer.rewrite(&file, src, &mut edits).unwrap();
        assert_eq!(outcome.applied, 1);
        assert!(outcome.written);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "function greet(): number { return 1 }\n"
        );
        // Only the target file remains in the directory.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_identical_result_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("same.ts");
        let src = b"function f(): number { return 1 }\n";
        fs::write(&file, src).unwrap();
        let before = fs::metadata(&file).unwrap().modified().unwrap();

        let writer = SafeWriter::new(false);
        let mut edits = vec![Edit::replace("f", 12, 20, ": number")];
        let outcome = writer.rewrite(&file, src, &mut edits).unwrap();
        assert!(!outcome.written);
        assert_eq!(fs::metadata(&file).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn test_dry_run_never_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("dry.ts");
        let src = b"function f() { return 1 }\n";
        fs::write(&file, src).unwrap();

        let writer = SafeWriter::new(true);
        let mut edits = vec![Edit::insert("f", 12, ": number")];
        let outcome = writer.rewrite(&file, src, &mut edits).unwrap();
        assert_eq!(outcome.applied, 1);
        assert!(!outcome.written);
        assert_eq!(fs::read(&file).unwrap(), src);
    }

    #[test]
    fn test_utf8_emoji_boundary() {
        let src = "const s = '\u{1F680}';\n";
        let bytes = src.as_bytes();
        let rocket = src.find('\u{1F680}').unwrap();
        assert_eq!(snap_char_boundary_bwd(bytes, rocket + 1), rocket);
        assert_eq!(snap_char_boundary_fwd(bytes, rocket + 1), rocket + 4);
    }
}
