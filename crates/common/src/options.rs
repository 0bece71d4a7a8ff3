//! The per-run option set consulted by every annotation decision.
//!
//! Resolved once (from the command line or from test code) and then shared
//! read-only by every worker. Nothing in the engine mutates it.

/// Feature toggles and name filters for one annotation run.
///
/// `Default` is the inclusive configuration: every syntactic exclusion is off,
/// `any` and `unknown` return types are skipped, anonymous object types are
/// written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Replace return types that are already written in the source.
    pub overwrite: bool,
    /// Function and method names that are never annotated.
    pub ignore_functions: Vec<String>,
    /// Skip function expressions and arrow functions.
    pub ignore_expressions: bool,
    /// Skip expressions assigned to a variable that has its own type annotation.
    pub ignore_typed_expressions: bool,
    /// Skip functions that declare no generic type parameters.
    pub ignore_functions_without_type_parameters: bool,
    /// Skip functions whose body only returns another function.
    pub ignore_higher_order_functions: bool,
    /// Skip arrows of the form `() => void expr`.
    pub ignore_void_arrows: bool,
    /// Skip arrows of the form `() => value as const`.
    pub ignore_const_assertions: bool,
    /// Skip immediately invoked function expressions.
    pub ignore_iifes: bool,
    /// Skip functions that have neither a name nor a named binding.
    pub ignore_anonymous_functions: bool,
    /// Skip when the resolved type is an inline object literal type.
    pub ignore_anonymous_objects: bool,
    /// Skip when the resolved type is `any` or `Promise<any>`.
    pub ignore_any: bool,
    /// Skip when the resolved type is `unknown` or `Promise<unknown>`.
    pub ignore_unknown: bool,
    /// Descend into `namespace` / `module` blocks.
    pub enter_namespaces: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            ignore_functions: Vec::new(),
            ignore_expressions: false,
            ignore_typed_expressions: false,
            ignore_functions_without_type_parameters: false,
            ignore_higher_order_functions: false,
            ignore_void_arrows: false,
            ignore_const_assertions: false,
            ignore_iifes: false,
            ignore_anonymous_functions: false,
            ignore_anonymous_objects: false,
            ignore_any: true,
            ignore_unknown: true,
            enter_namespaces: false,
        }
    }
}

impl AnnotateOptions {
    /// Returns `true` if `name` is in the ignore-by-name list.
    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.ignore_functions.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_inclusive() {
        let opts = AnnotateOptions::default();
        assert!(!opts.overwrite);
        assert!(!opts.ignore_expressions);
        assert!(!opts.ignore_iifes);
        assert!(!opts.ignore_anonymous_objects);
        assert!(!opts.enter_namespaces);
        assert!(opts.ignore_functions.is_empty());
    }

    #[test]
    fn test_any_and_unknown_skipped_by_default() {
        let opts = AnnotateOptions::default();
        assert!(opts.ignore_any);
        assert!(opts.ignore_unknown);
    }

    #[test]
    fn test_is_ignored_name_exact_match() {
        let opts = AnnotateOptions {
            ignore_functions: vec!["render".into(), "main".into()],
            ..Default::default()
        };
        assert!(opts.is_ignored_name("render"));
        assert!(opts.is_ignored_name("main"));
        assert!(!opts.is_ignored_name("renderAll"));
        assert!(!opts.is_ignored_name(""));
    }
}
