//! Human-facing output: one status line per file and the closing summary box.

use std::collections::HashMap;
use std::path::Path;

use anatomist::path_util::display_path;
use anatomist::{Exclusion, FileReport};

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub changed: usize,
    pub candidates: usize,
    pub annotated: usize,
    pub syntax_errors: usize,
    pub diagnostics: usize,
    pub skipped: HashMap<Exclusion, usize>,
}

impl RunSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = RunSummary {
            files: reports.len(),
            ..Default::default()
        };
        for report in reports {
            summary.changed += usize::from(report.changed());
            summary.candidates += report.candidates;
            summary.annotated += report.annotated;
            summary.syntax_errors += usize::from(report.syntax_errors);
            summary.diagnostics += report.diagnostics.len();
            for (reason, count) in &report.skipped {
                *summary.skipped.entry(*reason).or_default() += count;
            }
        }
        summary
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Skip counts in declaration order of [`Exclusion`].
    pub fn skipped_sorted(&self) -> Vec<(Exclusion, usize)> {
        let mut rows: Vec<_> = self.skipped.iter().map(|(r, c)| (*r, *c)).collect();
        rows.sort_by_key(|(reason, _)| *reason as u8);
        rows
    }
}

/// `src/a.ts: 3 annotated` style line; `None` for files with nothing to say.
pub fn status_line(report: &FileReport, root: &Path, dry_run: bool) -> Option<String> {
    let path = display_path(&report.path, root);
    if report.syntax_errors {
        let detail = report
            .diagnostics
            .first()
            .map(|d| format!(" ({}:{})", d.line, d.column))
            .unwrap_or_default();
        return Some(format!("  {path}: skipped, syntax error{detail}"));
    }
    if report.annotated == 0 && report.diagnostics.is_empty() {
        return None;
    }
    let verb = if dry_run { "would annotate" } else { "annotated" };
    let mut line = format!("  {path}: {verb} {}", report.annotated);
    for diagnostic in &report.diagnostics {
        line.push_str(&format!(
            "\n    {path}:{}:{} {}",
            diagnostic.line, diagnostic.column, diagnostic.message
        ));
    }
    Some(line)
}

pub fn print_summary(summary: &RunSummary, dry_run: bool) {
    let title = if dry_run { "ANNOTATE (dry run)" } else { "ANNOTATE" };
    println!("+------------------------------------------+");
    println!("| {title:<40} |");
    println!("+------------------------------------------+");
    println!("| Files          : {:>23} |", summary.files);
    println!("| Files changed  : {:>23} |", summary.changed);
    println!("| Functions      : {:>23} |", summary.candidates);
    println!("| Annotated      : {:>23} |", summary.annotated);
    println!("| Skipped        : {:>23} |", summary.skipped_total());
    println!("| Syntax errors  : {:>23} |", summary.syntax_errors);
    println!("+------------------------------------------+");
    for (reason, count) in summary.skipped_sorted() {
        println!("  {:<18} {count}", reason.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anatomist::NodeDiagnostic;
    use std::path::PathBuf;

    fn report(path: &str, annotated: usize, skipped: &[(Exclusion, usize)]) -> FileReport {
        FileReport {
            path: PathBuf::from(path),
            candidates: annotated + skipped.iter().map(|(_, c)| c).sum::<usize>(),
            annotated,
            skipped: skipped.iter().copied().collect(),
            diagnostics: Vec::new(),
            written: annotated > 0,
            syntax_errors: false,
        }
    }

    #[test]
    fn test_summary_merges_skip_counts() {
        let reports = vec![
            report("/p/a.ts", 2, &[(Exclusion::AnyType, 1), (Exclusion::Constructor, 1)]),
            report("/p/b.ts", 0, &[(Exclusion::AnyType, 2)]),
        ];
        let summary = RunSummary::from_reports(&reports);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.annotated, 2);
        assert_eq!(summary.candidates, 6);
        assert_eq!(summary.skipped_total(), 4);
        assert_eq!(
            summary.skipped_sorted(),
            vec![(Exclusion::Constructor, 1), (Exclusion::AnyType, 3)]
        );
    }

    #[test]
    fn test_status_lines() {
        let root = Path::new("/p");
        assert_eq!(
            status_line(&report("/p/src/a.ts", 2, &[]), root, false).as_deref(),
            Some("  src/a.ts: annotated 2")
        );
        assert_eq!(status_line(&report("/p/b.ts", 0, &[]), root, false), None);

        let mut broken = report("/p/c.ts", 0, &[]);
        broken.syntax_errors = true;
        broken.diagnostics.push(NodeDiagnostic {
            line: 3,
            column: 7,
            message: "syntax error".into(),
        });
        assert_eq!(
            status_line(&broken, root, false).as_deref(),
            Some("  c.ts: skipped, syntax error (3:7)")
        );
    }
}
