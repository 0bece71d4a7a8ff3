//! The standard exclusion rules.
//!
//! Only `KindFilter` is unconditional; every other rule is gated by its
//! option flag and lets the candidate through when the flag is off.

use common::{AnnotateOptions, Exclusion};

use crate::candidate::{Candidate, FunctionKind};
use crate::syntax::{is_field_of, last_child, outermost_parens, unwrap_parens};

/// Constructors and `set` accessors can never carry a return type.
pub struct KindFilter;

impl super::Filter for KindFilter {
    fn name(&self) -> &'static str {
        "kind"
    }

    fn apply(&self, candidate: &Candidate<'_>, _options: &AnnotateOptions) -> Option<Exclusion> {
        if candidate.is_constructor() {
            Some(Exclusion::Constructor)
        } else if candidate.is_setter() {
            Some(Exclusion::Setter)
        } else {
            None
        }
    }
}

/// An explicit return type is left alone unless `overwrite` is set.
pub struct AlreadyAnnotatedFilter;

impl super::Filter for AlreadyAnnotatedFilter {
    fn name(&self) -> &'static str {
        "already-annotated"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        (candidate.return_type().is_some() && !options.overwrite)
            .then_some(Exclusion::AlreadyAnnotated)
    }
}

/// Declarations and methods whose name is in `ignore_functions`.
pub struct IgnoredNameFilter;

impl super::Filter for IgnoredNameFilter {
    fn name(&self) -> &'static str {
        "ignored-name"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        candidate
            .declared_name()
            .filter(|name| options.is_ignored_name(name))
            .map(|_| Exclusion::IgnoredName)
    }
}

pub struct ExpressionFilter;

impl super::Filter for ExpressionFilter {
    fn name(&self) -> &'static str {
        "expression"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        (options.ignore_expressions && candidate.kind().is_expression())
            .then_some(Exclusion::Expression)
    }
}

/// `const f: Handler = () => …`: the variable's annotation already types
/// the function.
pub struct TypedExpressionFilter;

impl super::Filter for TypedExpressionFilter {
    fn name(&self) -> &'static str {
        "typed-expression"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_typed_expressions || !candidate.kind().is_expression() {
            return None;
        }
        let outer = outermost_parens(candidate.node());
        let parent = outer.parent()?;
        let typed = parent.kind() == "variable_declarator"
            && is_field_of(outer, parent, "value")
            && parent.child_by_field_name("type").is_some();
        typed.then_some(Exclusion::TypedExpression)
    }
}

pub struct TypeParameterFilter;

impl super::Filter for TypeParameterFilter {
    fn name(&self) -> &'static str {
        "no-type-parameters"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        (options.ignore_functions_without_type_parameters && candidate.type_parameter_count() == 0)
            .then_some(Exclusion::NoTypeParameters)
    }
}

/// Bodies that do nothing but hand back another function: `{ return () => … }`
/// or a concise `() => () => …`.
pub struct HigherOrderFilter;

impl super::Filter for HigherOrderFilter {
    fn name(&self) -> &'static str {
        "higher-order"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_higher_order_functions {
            return None;
        }
        let returned = candidate
            .sole_return_expression()
            .or_else(|| candidate.concise_body())?;
        FunctionKind::of(unwrap_parens(returned))
            .is_expression()
            .then_some(Exclusion::HigherOrder)
    }
}

/// `() => void promise`
pub struct VoidArrowFilter;

impl super::Filter for VoidArrowFilter {
    fn name(&self) -> &'static str {
        "void-arrow"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_void_arrows {
            return None;
        }
        let body = unwrap_parens(candidate.concise_body()?);
        let is_void = body.kind() == "unary_expression"
            && body
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "void");
        is_void.then_some(Exclusion::VoidArrow)
    }
}

/// `() => [1, 2] as const`
pub struct ConstAssertionFilter;

impl super::Filter for ConstAssertionFilter {
    fn name(&self) -> &'static str {
        "const-assertion"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_const_assertions {
            return None;
        }
        let body = unwrap_parens(candidate.concise_body()?);
        is_const_assertion(body).then_some(Exclusion::ConstAssertion)
    }
}

/// `expr as const`: the grammar keeps `const` as the trailing anonymous token.
pub fn is_const_assertion(node: tree_sitter::Node<'_>) -> bool {
    node.kind() == "as_expression" && last_child(node).is_some_and(|last| last.kind() == "const")
}

/// Function expressions invoked where they are defined, however many
/// parentheses surround them.
pub struct IifeFilter;

impl super::Filter for IifeFilter {
    fn name(&self) -> &'static str {
        "iife"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_iifes || !candidate.kind().is_expression() {
            return None;
        }
        let outer = outermost_parens(candidate.node());
        let parent = outer.parent()?;
        (parent.kind() == "call_expression" && is_field_of(outer, parent, "function"))
            .then_some(Exclusion::Iife)
    }
}

/// Function expressions without their own name; arrows not bound to a
/// variable, class property, object key or assignment target.
pub struct AnonymousFilter;

impl super::Filter for AnonymousFilter {
    fn name(&self) -> &'static str {
        "anonymous"
    }

    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        if !options.ignore_anonymous_functions {
            return None;
        }
        let anonymous = match candidate.kind() {
            FunctionKind::FunctionExpr => candidate.name().is_none(),
            FunctionKind::ArrowFn => candidate.binding_name().is_none(),
            _ => false,
        };
        anonymous.then_some(Exclusion::Anonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Filter, FilterChain};
    use crate::parser::{ParserHost, SourceLanguage, SourceUnit};
    use std::path::Path;

    fn parse(src: &str) -> SourceUnit {
        ParserHost::new()
            .unwrap()
            .parse(Path::new("t.ts"), src.into(), SourceLanguage::TypeScript)
            .unwrap()
    }

    /// All candidates in pre-order.
    fn candidates(unit: &SourceUnit) -> Vec<Candidate<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![unit.root()];
        while let Some(node) = stack.pop() {
            if let Some(c) = Candidate::new(node, unit.bytes()) {
                out.push(c);
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    fn verdicts(src: &str, options: &AnnotateOptions) -> Vec<Option<Exclusion>> {
        let unit = parse(src);
        let chain = FilterChain::standard();
        candidates(&unit)
            .iter()
            .map(|c| chain.evaluate(c, options))
            .collect()
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = FilterChain::standard();
        assert_eq!(chain.len(), 11);
        assert_eq!(
            format!("{chain:?}"),
            "[\"kind\", \"already-annotated\", \"ignored-name\", \"expression\", \"typed-expression\", \"no-type-parameters\", \"higher-order\", \"void-arrow\", \"const-assertion\", \"iife\", \"anonymous\"]"
        );
    }

    #[test]
    fn test_defaults_let_everything_through() {
        let v = verdicts(
            "function a() { return 1 }\nconst b = () => void 0;\n(function () {})();\nconst c = () => [1] as const;",
            &AnnotateOptions::default(),
        );
        assert_eq!(v, vec![None, None, None, None]);
    }

    #[test]
    fn test_constructor_and_setter_always_excluded() {
        let v = verdicts(
            "class K { constructor() {} set v(x: number) {} get v() { return 1 } }",
            &AnnotateOptions {
                overwrite: true,
                ..Default::default()
            },
        );
        assert_eq!(
            v,
            vec![Some(Exclusion::Constructor), Some(Exclusion::Setter), None]
        );
    }

    #[test]
    fn test_already_annotated_respects_overwrite() {
        let src = "function f(): number { return 1 }";
        assert_eq!(
            verdicts(src, &AnnotateOptions::default()),
            vec![Some(Exclusion::AlreadyAnnotated)]
        );
        let overwrite = AnnotateOptions {
            overwrite: true,
            ..Default::default()
        };
        assert_eq!(verdicts(src, &overwrite), vec![None]);
    }

    #[test]
    fn test_ignored_names_apply_to_declarations_and_methods() {
        let options = AnnotateOptions {
            ignore_functions: vec!["skip".into()],
            ..Default::default()
        };
        let v = verdicts(
            "function skip() {}\nclass K { skip() {} }\nconst skip2 = function skip() {};\nfunction keep() {}",
            &options,
        );
        assert_eq!(
            v,
            vec![
                Some(Exclusion::IgnoredName),
                Some(Exclusion::IgnoredName),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_expression_filter() {
        let options = AnnotateOptions {
            ignore_expressions: true,
            ..Default::default()
        };
        let v = verdicts(
            "function a() {}\nconst b = function () {};\nconst c = () => 1;",
            &options,
        );
        assert_eq!(
            v,
            vec![None, Some(Exclusion::Expression), Some(Exclusion::Expression)]
        );
    }

    #[test]
    fn test_typed_expression_filter() {
        let options = AnnotateOptions {
            ignore_typed_expressions: true,
            ..Default::default()
        };
        let v = verdicts(
            "const a: () => number = () => 1;\nconst b = () => 2;\nconst c: F = (() => 3);",
            &options,
        );
        assert_eq!(
            v,
            vec![
                Some(Exclusion::TypedExpression),
                None,
                Some(Exclusion::TypedExpression)
            ]
        );
    }

    #[test]
    fn test_type_parameter_filter() {
        let options = AnnotateOptions {
            ignore_functions_without_type_parameters: true,
            ..Default::default()
        };
        let v = verdicts("function a<T>(x: T) { return x }\nfunction b() {}", &options);
        assert_eq!(v, vec![None, Some(Exclusion::NoTypeParameters)]);
    }

    #[test]
    fn test_higher_order_filter() {
        let options = AnnotateOptions {
            ignore_higher_order_functions: true,
            ..Default::default()
        };
        let src = "function a() { return () => 1 }\nconst b = () => (function () {});\nfunction c() { const x = 1; return () => x }";
        let v = verdicts(src, &options);
        // Inner functions are not higher-order themselves; `c` has more than
        // one statement.
        assert_eq!(
            v,
            vec![
                Some(Exclusion::HigherOrder),
                None,
                Some(Exclusion::HigherOrder),
                None,
                None,
                None
            ]
        );
    }

    #[test]
    fn test_void_arrow_filter() {
        let options = AnnotateOptions {
            ignore_void_arrows: true,
            ..Default::default()
        };
        let v = verdicts(
            "const a = () => void run();\nconst b = () => (void 0);\nconst c = () => { void run() };",
            &options,
        );
        assert_eq!(
            v,
            vec![Some(Exclusion::VoidArrow), Some(Exclusion::VoidArrow), None]
        );
    }

    #[test]
    fn test_const_assertion_filter() {
        let options = AnnotateOptions {
            ignore_const_assertions: true,
            ..Default::default()
        };
        let v = verdicts(
            "const a = () => ['x', 'y'] as const;\nconst b = () => x as string;",
            &options,
        );
        assert_eq!(v, vec![Some(Exclusion::ConstAssertion), None]);
    }

    #[test]
    fn test_iife_filter_unwraps_every_paren_layer() {
        let options = AnnotateOptions {
            ignore_iifes: true,
            ..Default::default()
        };
        let v = verdicts(
            "(function () {})();\n((() => 1))();\n(((function () {})))();\nrun(() => 2);",
            &options,
        );
        assert_eq!(
            v,
            vec![
                Some(Exclusion::Iife),
                Some(Exclusion::Iife),
                Some(Exclusion::Iife),
                None
            ]
        );
    }

    #[test]
    fn test_anonymous_filter() {
        let options = AnnotateOptions {
            ignore_anonymous_functions: true,
            ..Default::default()
        };
        let src = "const a = () => 1;\nconst b = function () {};\nconst c = function named() {};\nrun(() => 2);\nclass K { p = () => 3; }\nobj.x = () => 4;";
        let v = verdicts(src, &options);
        assert_eq!(
            v,
            vec![
                None,
                Some(Exclusion::Anonymous),
                None,
                Some(Exclusion::Anonymous),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_first_exclusion_wins() {
        let options = AnnotateOptions {
            ignore_expressions: true,
            ignore_anonymous_functions: true,
            ..Default::default()
        };
        assert_eq!(
            verdicts("run(() => 1);", &options),
            vec![Some(Exclusion::Expression)]
        );
    }

    #[test]
    fn test_custom_filter_registration() {
        struct Everything;
        impl Filter for Everything {
            fn name(&self) -> &'static str {
                "everything"
            }
            fn apply(&self, _: &Candidate<'_>, _: &AnnotateOptions) -> Option<Exclusion> {
                Some(Exclusion::IgnoredName)
            }
        }
        let unit = parse("function a() {}");
        let found = candidates(&unit);
        let mut chain = FilterChain::empty();
        assert_eq!(chain.evaluate(&found[0], &AnnotateOptions::default()), None);
        chain.register(Box::new(Everything));
        assert_eq!(
            chain.evaluate(&found[0], &AnnotateOptions::default()),
            Some(Exclusion::IgnoredName)
        );
    }
}
