//! Tree-sitter parsing of TypeScript sources into [`SourceUnit`]s.
//!
//! The grammar is picked from the file extension: `.ts` uses the TypeScript
//! grammar, `.tsx` the TSX grammar. A `SourceUnit` owns both the text and the
//! tree, so every lookup made while annotating a file (filters, resolution,
//! oracle scope walks) reuses the single parse.

use std::path::{Path, PathBuf};

use tree_sitter::{Language, Node, Parser, Tree};

use crate::AnatomistError;

/// TypeScript dialect of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// `.ts`
    TypeScript,
    /// `.tsx`
    Tsx,
}

impl SourceLanguage {
    /// Maps a path to its dialect. Declaration files (`.d.ts`) and every
    /// other extension return `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if is_declaration_file(name) {
            return None;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => Some(SourceLanguage::TypeScript),
            Some("tsx") => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }

    fn grammar(self) -> Language {
        match self {
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Returns `true` for ambient declaration files (`foo.d.ts`, `foo.d.tsx`).
pub fn is_declaration_file(file_name: &str) -> bool {
    file_name.ends_with(".d.ts") || file_name.ends_with(".d.tsx")
}

/// One parsed file: the exclusive owner of its text and syntax tree.
pub struct SourceUnit {
    path: PathBuf,
    language: SourceLanguage,
    source: String,
    tree: Tree,
}

impl SourceUnit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`. Empty if the range is not valid UTF-8.
    pub fn text<'a>(&'a self, node: Node<'_>) -> &'a str {
        self.source
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    /// Returns `true` if tree-sitter had to recover from a syntax error.
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

impl std::fmt::Debug for SourceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("len", &self.source.len())
            .finish()
    }
}

/// Holds one tree-sitter parser per dialect.
///
/// `tree_sitter::Parser` is not `Sync`, so every worker creates its own host.
///
/// # Example
/// ```no_run
/// use anatomist::ParserHost;
/// use std::path::Path;
///
/// let mut host = ParserHost::new().unwrap();
/// let unit = host.load(Path::new("src/index.ts")).unwrap();
/// println!("{} bytes", unit.source().len());
/// ```
pub struct ParserHost {
    typescript: Parser,
    tsx: Parser,
}

impl ParserHost {
    /// Creates a host with both TypeScript grammars loaded.
    ///
    /// # Errors
    /// Returns `AnatomistError::ParseFailure` if a grammar cannot be loaded
    /// (ABI mismatch between `tree-sitter` and `tree-sitter-typescript`).
    pub fn new() -> Result<Self, AnatomistError> {
        Ok(Self {
            typescript: Self::parser_for(SourceLanguage::TypeScript)?,
            tsx: Self::parser_for(SourceLanguage::Tsx)?,
        })
    }

    fn parser_for(language: SourceLanguage) -> Result<Parser, AnatomistError> {
        let mut parser = Parser::new();
        parser.set_language(&language.grammar()).map_err(|e| {
            AnatomistError::ParseFailure(format!("Failed to load {language:?} grammar: {e}"))
        })?;
        Ok(parser)
    }

    /// Reads and parses a `.ts` / `.tsx` file.
    ///
    /// # Errors
    /// - `UnsupportedFile`: not a `.ts` / `.tsx` source (or a declaration file)
    /// - `IoError`: file missing, unreadable, or not UTF-8
    /// - `ByteRangeOverflow`: file larger than 4GB (tree-sitter u32 limit)
    /// - `ParseFailure`: tree-sitter returned no tree
    pub fn load(&mut self, path: &Path) -> Result<SourceUnit, AnatomistError> {
        let language = SourceLanguage::from_path(path)
            .ok_or_else(|| AnatomistError::UnsupportedFile(path.to_path_buf()))?;

        let metadata = std::fs::metadata(path)?;
        if metadata.len() > u32::MAX as u64 {
            return Err(AnatomistError::ByteRangeOverflow);
        }

        let source = std::fs::read_to_string(path)?;
        self.parse(path, source, language)
    }

    /// Parses in-memory `source` as if it had been read from `path`.
    pub fn parse(
        &mut self,
        path: &Path,
        source: String,
        language: SourceLanguage,
    ) -> Result<SourceUnit, AnatomistError> {
        if source.len() > u32::MAX as usize {
            return Err(AnatomistError::ByteRangeOverflow);
        }
        let parser = match language {
            SourceLanguage::TypeScript => &mut self.typescript,
            SourceLanguage::Tsx => &mut self.tsx,
        };
        let tree = parser.parse(&source, None).ok_or_else(|| {
            AnatomistError::ParseFailure("Tree-sitter parse returned None".to_string())
        })?;

        Ok(SourceUnit {
            path: path.to_path_buf(),
            language,
            source,
            tree,
        })
    }
}
