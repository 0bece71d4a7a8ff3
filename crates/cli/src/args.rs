//! Command-line surface. Everything here is resolved once into the
//! immutable option values the engine and the file lister consume.

use std::path::PathBuf;

use anatomist::ScanOptions;
use clap::{ArgAction, Parser};
use common::AnnotateOptions;

#[derive(Debug, Clone, Parser)]
#[command(name = "annotate")]
#[command(about = "Write inferred return types into TypeScript sources", long_about = None)]
pub struct Args {
    /// Project root (or a single `.ts`/`.tsx` file).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only annotate files directly inside the root.
    #[arg(long)]
    pub shallow: bool,

    /// Skip files matching this glob. Repeatable.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Maximum number of files processed at once.
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Folder holding installed packages; never scanned.
    #[arg(long, default_value = "node_modules", value_name = "DIR")]
    pub dependency_dir: String,

    /// Replace return types that are already written.
    #[arg(long)]
    pub overwrite: bool,

    /// Never annotate functions or methods with these names.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub ignore_functions: Vec<String>,

    /// Skip function expressions and arrow functions.
    #[arg(long)]
    pub ignore_expressions: bool,

    /// Skip expressions assigned to an annotated variable.
    #[arg(long)]
    pub ignore_typed_expressions: bool,

    /// Skip functions without generic type parameters.
    #[arg(long)]
    pub ignore_functions_without_type_parameters: bool,

    /// Skip functions that only return another function.
    #[arg(long)]
    pub ignore_higher_order_functions: bool,

    /// Skip `() => void expr` arrows.
    #[arg(long)]
    pub ignore_void_arrows: bool,

    /// Skip `() => value as const` arrows.
    #[arg(long)]
    pub ignore_const_assertions: bool,

    /// Skip immediately invoked function expressions.
    #[arg(long)]
    pub ignore_iifes: bool,

    /// Skip functions with neither a name nor a named binding.
    #[arg(long)]
    pub ignore_anonymous_functions: bool,

    /// Skip when the return type is an inline object type.
    #[arg(long)]
    pub ignore_anonymous_objects: bool,

    /// Also write `any` return types.
    #[arg(long = "no-ignore-any", action = ArgAction::SetFalse)]
    pub ignore_any: bool,

    /// Also write `unknown` return types.
    #[arg(long = "no-ignore-unknown", action = ArgAction::SetFalse)]
    pub ignore_unknown: bool,

    /// Descend into `namespace` and `module` blocks.
    #[arg(long)]
    pub enter_namespaces: bool,

    /// Run everything but leave files untouched.
    #[arg(long)]
    pub dry_run: bool,

    /// Debug logging (unless `RUST_LOG` says otherwise).
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            overwrite: self.overwrite,
            ignore_functions: self.ignore_functions.clone(),
            ignore_expressions: self.ignore_expressions,
            ignore_typed_expressions: self.ignore_typed_expressions,
            ignore_functions_without_type_parameters: self.ignore_functions_without_type_parameters,
            ignore_higher_order_functions: self.ignore_higher_order_functions,
            ignore_void_arrows: self.ignore_void_arrows,
            ignore_const_assertions: self.ignore_const_assertions,
            ignore_iifes: self.ignore_iifes,
            ignore_anonymous_functions: self.ignore_anonymous_functions,
            ignore_anonymous_objects: self.ignore_anonymous_objects,
            ignore_any: self.ignore_any,
            ignore_unknown: self.ignore_unknown,
            enter_namespaces: self.enter_namespaces,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            shallow: self.shallow,
            ignore_patterns: self.ignore.clone(),
            dependency_dir: self.dependency_dir.clone(),
        }
    }
}
