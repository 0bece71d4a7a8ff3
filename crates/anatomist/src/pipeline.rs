//! The per-file annotation engine.
//!
//! Stages, for one file:
//! - **Parse**: read and parse into a [`SourceUnit`] (files with syntax
//!   errors stop here with a diagnostic; nothing is rewritten).
//! - **Walk**: visit every node once, pre-order, skipping namespace bodies
//!   unless `enter_namespaces` is set and never entering ambient declarations.
//! - **Decide**: filter chain, then return-type resolution, per candidate.
//! - **Plan**: one [`Edit`] per `Annotate` decision.
//! - **Persist**: splice bottom-to-top and write only if bytes changed.
//!
//! A failure on one node is logged and recorded in the report; it never
//! aborts the file. Only I/O and write failures escape as errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{AnnotateOptions, Decision, Exclusion};
use scribe::{apply_edits, Edit, SafeWriter};
use tracing::{debug, info, warn};
use tree_sitter::Node;

use crate::candidate::Candidate;
use crate::filters::FilterChain;
use crate::parser::{ParserHost, SourceLanguage, SourceUnit};
use crate::resolve::decide;
use crate::syntax::location;
use crate::types::TypeOracle;
use crate::AnatomistError;

/// Node kinds of `namespace X {}` and `module X {}` blocks.
const NAMESPACE_KINDS: &[&str] = &["internal_module", "module"];

/// A per-node problem worth reporting to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDiagnostic {
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    pub message: String,
}

/// Everything the engine decided for one parsed file.
#[derive(Debug, Default)]
pub struct AnnotationPlan {
    pub edits: Vec<Edit>,
    /// Function-like nodes with a body that were evaluated.
    pub candidates: usize,
    pub skipped: HashMap<Exclusion, usize>,
    pub diagnostics: Vec<NodeDiagnostic>,
}

impl AnnotationPlan {
    pub fn annotated(&self) -> usize {
        self.edits.len()
    }

    fn skip(&mut self, reason: Exclusion) {
        *self.skipped.entry(reason).or_default() += 1;
    }
}

/// Outcome of [`Annotator::process_file`].
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub candidates: usize,
    pub annotated: usize,
    pub skipped: HashMap<Exclusion, usize>,
    pub diagnostics: Vec<NodeDiagnostic>,
    /// The file on disk was replaced.
    pub written: bool,
    /// The parser had to recover from errors; the file was left untouched.
    pub syntax_errors: bool,
}

impl FileReport {
    /// The file content differs (or would differ, in a dry run) from the input.
    pub fn changed(&self) -> bool {
        self.annotated > 0
    }
}

/// The annotation engine: oracle, filter chain, options and writer for one run.
///
/// Shared read-only by every worker; each worker brings its own
/// [`ParserHost`].
pub struct Annotator {
    oracle: Arc<dyn TypeOracle>,
    chain: FilterChain,
    options: AnnotateOptions,
    writer: SafeWriter,
}

impl Annotator {
    /// An engine using the standard filter chain.
    pub fn new(oracle: Arc<dyn TypeOracle>, options: AnnotateOptions, writer: SafeWriter) -> Self {
        Self::with_chain(oracle, FilterChain::standard(), options, writer)
    }

    pub fn with_chain(
        oracle: Arc<dyn TypeOracle>,
        chain: FilterChain,
        options: AnnotateOptions,
        writer: SafeWriter,
    ) -> Self {
        Self {
            oracle,
            chain,
            options,
            writer,
        }
    }

    pub fn options(&self) -> &AnnotateOptions {
        &self.options
    }

    pub fn writer(&self) -> &SafeWriter {
        &self.writer
    }

    /// Walks `unit` and decides every candidate.
    pub fn plan(&self, unit: &SourceUnit) -> AnnotationPlan {
        let mut plan = AnnotationPlan::default();
        let file = unit.path().display().to_string();

        for node in walk(unit.root(), self.options.enter_namespaces) {
            let Some(candidate) = Candidate::new(node, unit.bytes()) else {
                continue;
            };
            plan.candidates += 1;
            let (line, column) = candidate.location();

            match decide(&candidate, unit, self.oracle.as_ref(), &self.chain, &self.options) {
                Ok(Decision::Annotate(text)) => {
                    debug!(file = %file, line, column, function = %candidate.label(), return_type = %text, "annotating");
                    match annotation_edit(&candidate, &text) {
                        Some(edit) => plan.edits.push(edit),
                        None => {
                            warn!(file = %file, line, column, "no position for a return type");
                            plan.diagnostics.push(NodeDiagnostic {
                                line,
                                column,
                                message: "no position for a return type".to_string(),
                            });
                            plan.skip(Exclusion::Unresolved);
                        }
                    }
                }
                Ok(Decision::Skip(reason)) => {
                    debug!(file = %file, line, column, function = %candidate.label(), %reason, "skipped");
                    plan.skip(reason);
                }
                Err(err) if err.is_unresolved() => {
                    debug!(file = %file, line, column, function = %candidate.label(), error = %err, "no return type available");
                    plan.skip(Exclusion::Unresolved);
                }
                Err(err) => {
                    warn!(file = %file, line, column, error = %err, "failed to resolve return type");
                    plan.diagnostics.push(NodeDiagnostic {
                        line,
                        column,
                        message: err.to_string(),
                    });
                    plan.skip(Exclusion::Unresolved);
                }
            }
        }
        plan
    }

    /// Annotates in-memory `source` as if read from `path` and returns the
    /// rewritten text together with the plan. Nothing touches the disk.
    pub fn annotate_source(
        &self,
        host: &mut ParserHost,
        path: &Path,
        source: String,
    ) -> Result<(String, AnnotationPlan), AnatomistError> {
        let language = SourceLanguage::from_path(path)
            .ok_or_else(|| AnatomistError::UnsupportedFile(path.to_path_buf()))?;
        let unit = host.parse(path, source, language)?;
        if unit.has_syntax_errors() {
            let plan = AnnotationPlan {
                diagnostics: vec![syntax_error_diagnostic(&unit)],
                ..Default::default()
            };
            return Ok((unit.source().to_string(), plan));
        }
        let mut plan = self.plan(&unit);
        let output = apply_edits(unit.bytes(), &mut plan.edits)?;
        let output = String::from_utf8(output)
            .map_err(|e| AnatomistError::ParseFailure(format!("Edited source is not UTF-8: {e}")))?;
        Ok((output, plan))
    }

    /// Reads, annotates and (unless nothing changed or the writer is in dry
    /// run) rewrites one file.
    ///
    /// # Errors
    /// I/O failures reading the file and failures writing it back. Per-node
    /// problems are reported in [`FileReport::diagnostics`] instead.
    pub fn process_file(
        &self,
        host: &mut ParserHost,
        path: &Path,
    ) -> Result<FileReport, AnatomistError> {
        let _span = tracing::debug_span!("file", path = %path.display()).entered();
        let unit = host.load(path)?;

        if unit.has_syntax_errors() {
            let diagnostic = syntax_error_diagnostic(&unit);
            warn!(
                file = %path.display(),
                line = diagnostic.line,
                column = diagnostic.column,
                "syntax errors, file left untouched"
            );
            return Ok(FileReport {
                path: path.to_path_buf(),
                candidates: 0,
                annotated: 0,
                skipped: HashMap::new(),
                diagnostics: vec![diagnostic],
                written: false,
                syntax_errors: true,
            });
        }

        let mut plan = self.plan(&unit);
        let outcome = self.writer.rewrite(path, unit.bytes(), &mut plan.edits)?;
        if outcome.written {
            info!(file = %path.display(), annotations = outcome.applied, "rewrote file");
        }

        Ok(FileReport {
            path: path.to_path_buf(),
            candidates: plan.candidates,
            annotated: plan.annotated(),
            skipped: plan.skipped,
            diagnostics: plan.diagnostics,
            written: outcome.written,
            syntax_errors: false,
        })
    }
}

/// Pre-order walk of `root`, with each node visited exactly once.
fn walk(root: Node<'_>, enter_namespaces: bool) -> Vec<Node<'_>> {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        order.push(node);
        if node.kind() == "ambient_declaration"
            || (!enter_namespaces && NAMESPACE_KINDS.contains(&node.kind()))
        {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    order
}

/// The splice that writes `: text` onto `candidate`.
///
/// - existing annotation (overwrite): replaced in place
/// - `(params)`: inserted after the closing parenthesis
/// - bare `x => …`: `x` becomes `(x): text`
fn annotation_edit(candidate: &Candidate<'_>, text: &str) -> Option<Edit> {
    let label = candidate.label();
    let annotation = format!(": {text}");
    if let Some(existing) = candidate.return_type() {
        return Some(Edit::replace(
            label,
            existing.start_byte() as u32,
            existing.end_byte() as u32,
            annotation,
        ));
    }
    if let Some(params) = candidate.parameter_list() {
        return Some(Edit::insert(label, params.end_byte() as u32, annotation));
    }
    let param = candidate.bare_parameter()?;
    Some(Edit::replace(
        label,
        param.start_byte() as u32,
        param.end_byte() as u32,
        format!("({}){annotation}", candidate.text(param)),
    ))
}

fn syntax_error_diagnostic(unit: &SourceUnit) -> NodeDiagnostic {
    let node = first_error(unit.root()).unwrap_or_else(|| unit.root());
    let (line, column) = location(node);
    NodeDiagnostic {
        line,
        column,
        message: "syntax error".to_string(),
    }
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InferredType, OracleError};
    use std::fs;

    /// Returns the type keyed by the function's label; errors for `boom`.
    struct FakeOracle {
        types: HashMap<&'static str, InferredType>,
    }

    impl TypeOracle for FakeOracle {
        fn infer_return_type(
            &self,
            unit: &SourceUnit,
            function: Node<'_>,
        ) -> Result<InferredType, OracleError> {
            let candidate = Candidate::new(function, unit.bytes())
                .ok_or_else(|| OracleError::Internal("not a function".into()))?;
            let label = candidate.label();
            if label == "boom" {
                return Err(OracleError::Internal("exploded".into()));
            }
            self.types
                .get(label.as_str())
                .cloned()
                .ok_or(OracleError::Unresolved(label))
        }
    }

    fn annotator(types: &[(&'static str, InferredType)], options: AnnotateOptions) -> Annotator {
        let oracle = FakeOracle {
            types: types.iter().cloned().collect(),
        };
        Annotator::new(Arc::new(oracle), options, SafeWriter::new(false))
    }

    fn run(annotator: &Annotator, src: &str) -> (String, AnnotationPlan) {
        let mut host = ParserHost::new().unwrap();
        annotator
            .annotate_source(&mut host, Path::new("mem.ts"), src.to_string())
            .unwrap()
    }

    #[test]
    fn test_inserts_after_parameters() {
        let a = annotator(&[("greet", InferredType::string())], AnnotateOptions::default());
        let (out, plan) = run(
            &a,
            "function greet(name: string) { return 'Hello, ' + name; }",
        );
        assert_eq!(
            out,
            "function greet(name: string): string { return 'Hello, ' + name; }"
        );
        assert_eq!(plan.annotated(), 1);
    }

    #[test]
    fn test_bare_arrow_parameter_is_parenthesized() {
        let a = annotator(&[("inc", InferredType::number())], AnnotateOptions::default());
        let (out, _) = run(&a, "const inc = n => n + 1;");
        assert_eq!(out, "const inc = (n): number => n + 1;");
    }

    #[test]
    fn test_nested_functions_are_all_visited() {
        let a = annotator(
            &[
                ("outer", InferredType::number()),
                ("inner", InferredType::number()),
                ("m", InferredType::boolean()),
            ],
            AnnotateOptions::default(),
        );
        let (out, plan) = run(
            &a,
            "function outer() {\n  const inner = () => 1;\n  const o = { m() { return true } };\n  return inner();\n}",
        );
        assert_eq!(
            out,
            "function outer(): number {\n  const inner = (): number => 1;\n  const o = { m(): boolean { return true } };\n  return inner();\n}"
        );
        assert_eq!(plan.candidates, 3);
    }

    #[test]
    fn test_overload_signatures_untouched() {
        let a = annotator(&[("f", InferredType::Text("string | number".into()))], AnnotateOptions::default());
        let src = "function f(x: string): string;\nfunction f(x: number): number;\nfunction f(x: any) { return x; }";
        let (out, plan) = run(&a, src);
        assert_eq!(
            out,
            "function f(x: string): string;\nfunction f(x: number): number;\nfunction f(x: any): string | number { return x; }"
        );
        assert_eq!(plan.candidates, 1);
    }

    #[test]
    fn test_namespaces_skipped_unless_entered() {
        let src = "namespace NS {\n  export function g() { return 1 }\n}\nfunction f() { return 1 }";
        let types = [("g", InferredType::number()), ("f", InferredType::number())];

        let (out, _) = run(&annotator(&types, AnnotateOptions::default()), src);
        assert!(out.contains("function g() {"));
        assert!(out.contains("function f(): number {"));

        let entering = AnnotateOptions {
            enter_namespaces: true,
            ..Default::default()
        };
        let (out, _) = run(&annotator(&types, entering), src);
        assert!(out.contains("function g(): number {"));
    }

    #[test]
    fn test_ambient_declarations_never_entered() {
        let a = annotator(&[], AnnotateOptions::default());
        let (_, plan) = run(&a, "declare namespace X { function f(): void; }\n");
        assert_eq!(plan.candidates, 0);
    }

    #[test]
    fn test_node_failure_does_not_abort_file() {
        let a = annotator(&[("ok", InferredType::number())], AnnotateOptions::default());
        let (out, plan) = run(&a, "function boom() { return 1 }\nfunction ok() { return 2 }");
        assert!(out.contains("function boom() {"));
        assert!(out.contains("function ok(): number {"));
        assert_eq!(plan.diagnostics.len(), 1);
        assert_eq!(plan.diagnostics[0].line, 1);
        assert_eq!(plan.diagnostics[0].column, 1);
        assert!(plan.diagnostics[0].message.contains("exploded"));
        assert_eq!(plan.skipped.get(&Exclusion::Unresolved), Some(&1));
    }

    #[test]
    fn test_unresolved_is_a_quiet_skip() {
        let a = annotator(&[], AnnotateOptions::default());
        let (out, plan) = run(&a, "function f() { return g() }");
        assert_eq!(out, "function f() { return g() }");
        assert!(plan.diagnostics.is_empty());
        assert_eq!(plan.skipped.get(&Exclusion::Unresolved), Some(&1));
    }

    #[test]
    fn test_overwrite_replaces_existing_annotation() {
        let options = AnnotateOptions {
            overwrite: true,
            ..Default::default()
        };
        let a = annotator(&[("f", InferredType::number())], options);
        let (out, _) = run(&a, "function f(): string { return 1 }");
        assert_eq!(out, "function f(): number { return 1 }");
    }

    #[test]
    fn test_syntax_errors_leave_source_untouched() {
        let a = annotator(&[("f", InferredType::number())], AnnotateOptions::default());
        let src = "function f() { return 1 }\nconst = ;";
        let (out, plan) = run(&a, src);
        assert_eq!(out, src);
        assert_eq!(plan.diagnostics.len(), 1);
        assert_eq!(plan.diagnostics[0].message, "syntax error");
    }

    #[test]
    fn test_process_file_writes_once_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.ts");
        fs::write(&file, "export function f() { return 1 }\n").unwrap();
        let a = annotator(&[("f", InferredType::number())], AnnotateOptions::default());
        let mut host = ParserHost::new().unwrap();

        let first = a.process_file(&mut host, &file).unwrap();
        assert!(first.written);
        assert_eq!(first.annotated, 1);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "export function f(): number { return 1 }\n"
        );

        let second = a.process_file(&mut host, &file).unwrap();
        assert!(!second.written);
        assert_eq!(second.annotated, 0);
        assert_eq!(second.skipped.get(&Exclusion::AlreadyAnnotated), Some(&1));
    }

    #[test]
    fn test_process_file_dry_run() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.ts");
        fs::write(&file, "function f() { return 1 }").unwrap();
        let oracle = FakeOracle {
            types: [("f", InferredType::number())].into_iter().collect(),
        };
        let a = Annotator::new(Arc::new(oracle), AnnotateOptions::default(), SafeWriter::new(true));
        let report = a
            .process_file(&mut ParserHost::new().unwrap(), &file)
            .unwrap();
        assert!(report.changed());
        assert!(!report.written);
        assert_eq!(fs::read_to_string(&file).unwrap(), "function f() { return 1 }");
    }

    #[test]
    fn test_process_file_missing_is_fatal() {
        let a = annotator(&[], AnnotateOptions::default());
        let result = a.process_file(&mut ParserHost::new().unwrap(), Path::new("/nope/missing.ts"));
        assert!(matches!(result, Err(AnatomistError::IoError(_))));
    }
}
