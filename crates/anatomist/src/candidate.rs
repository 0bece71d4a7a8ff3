//! The candidate view: a closed classification of syntax nodes plus the
//! capability accessors the filter chain and the resolver need.

use tree_sitter::Node;

use crate::syntax::{first_named_child, is_field_of, node_text, outermost_parens, type_annotation_text};

/// Function-like node kinds recognised by the engine.
///
/// Maps to tree-sitter node types:
/// - `function_declaration`, `generator_function_declaration` → `FunctionDecl`
/// - `function_expression`, `generator_function` → `FunctionExpr`
/// - `arrow_function` → `ArrowFn`
/// - `method_definition` → `MethodDecl`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    FunctionDecl,
    FunctionExpr,
    ArrowFn,
    MethodDecl,
    Other,
}

impl FunctionKind {
    pub fn of(node: Node<'_>) -> Self {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => FunctionKind::FunctionDecl,
            // `function` is the pre-0.21 grammar name for a function expression.
            "function_expression" | "function" | "generator_function" => FunctionKind::FunctionExpr,
            "arrow_function" => FunctionKind::ArrowFn,
            "method_definition" => FunctionKind::MethodDecl,
            _ => FunctionKind::Other,
        }
    }

    /// Function expressions and arrows: values rather than declarations.
    pub fn is_expression(self) -> bool {
        matches!(self, FunctionKind::FunctionExpr | FunctionKind::ArrowFn)
    }
}

/// Body of a function: a statement block, or the expression of a concise arrow.
#[derive(Debug, Clone, Copy)]
pub enum Body<'t> {
    Block(Node<'t>),
    Expression(Node<'t>),
}

/// One formal parameter.
#[derive(Debug, Clone)]
pub struct Parameter<'t> {
    /// Bound identifier; `None` for destructuring patterns.
    pub name: Option<&'t str>,
    /// Declared type text without the leading `:`.
    pub declared_type: Option<&'t str>,
    /// Default value expression.
    pub default: Option<Node<'t>>,
    pub is_rest: bool,
    pub is_optional: bool,
    pub node: Node<'t>,
}

/// Leading keyword tokens of a function-like node (`async`, `*`, `get`, `set`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Modifiers {
    is_async: bool,
    is_generator: bool,
    is_getter: bool,
    is_setter: bool,
}

/// A function-like node with a body, viewed through its capabilities.
///
/// Bodiless declarations (overload signatures, abstract and ambient
/// signatures) are different node kinds in the grammar and never become
/// candidates.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'t> {
    node: Node<'t>,
    kind: FunctionKind,
    source: &'t [u8],
    modifiers: Modifiers,
}

impl<'t> Candidate<'t> {
    /// Classifies `node`; returns `None` for `FunctionKind::Other` and for
    /// nodes without a body.
    pub fn new(node: Node<'t>, source: &'t [u8]) -> Option<Self> {
        let kind = FunctionKind::of(node);
        if kind == FunctionKind::Other || node.child_by_field_name("body").is_none() {
            return None;
        }
        Some(Self {
            node,
            kind,
            source,
            modifiers: scan_modifiers(node),
        })
    }

    pub fn node(&self) -> Node<'t> {
        self.node
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn source(&self) -> &'t [u8] {
        self.source
    }

    pub fn text(&self, node: Node<'_>) -> &'t str {
        node_text(node, self.source)
    }

    /// Own name: declarations, methods and named function expressions.
    pub fn name(&self) -> Option<&'t str> {
        match self.kind {
            FunctionKind::ArrowFn | FunctionKind::Other => None,
            _ => self
                .node
                .child_by_field_name("name")
                .map(|n| node_text(n, self.source)),
        }
    }

    /// Name subject to the ignore-by-name list: function declarations and
    /// methods only.
    pub fn declared_name(&self) -> Option<&'t str> {
        match self.kind {
            FunctionKind::FunctionDecl | FunctionKind::MethodDecl => self.name(),
            _ => None,
        }
    }

    /// Name of the variable, class property, object key or assignment target
    /// an expression is bound to.
    pub fn binding_name(&self) -> Option<&'t str> {
        if !self.kind.is_expression() {
            return None;
        }
        let outer = outermost_parens(self.node);
        let parent = outer.parent()?;
        let target = match parent.kind() {
            "variable_declarator" if is_field_of(outer, parent, "value") => {
                parent.child_by_field_name("name")?
            }
            "public_field_definition" if is_field_of(outer, parent, "value") => {
                parent.child_by_field_name("name")?
            }
            "pair" if is_field_of(outer, parent, "value") => parent.child_by_field_name("key")?,
            "assignment_expression" if is_field_of(outer, parent, "right") => {
                parent.child_by_field_name("left")?
            }
            _ => return None,
        };
        match target.kind() {
            "identifier"
            | "property_identifier"
            | "private_property_identifier"
            | "member_expression"
            | "string"
            | "number"
            | "computed_property_name" => Some(node_text(target, self.source)),
            // Destructuring patterns bind no single name.
            _ => None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::MethodDecl
            && self
                .name()
                .is_some_and(|n| n.trim_matches(|c| c == '"' || c == '\'') == "constructor")
    }

    pub fn is_async(&self) -> bool {
        self.modifiers.is_async
    }

    pub fn is_generator(&self) -> bool {
        self.modifiers.is_generator
    }

    pub fn is_getter(&self) -> bool {
        self.modifiers.is_getter
    }

    pub fn is_setter(&self) -> bool {
        self.modifiers.is_setter
    }

    /// Existing return annotation (`type_annotation`, `type_predicate_annotation`
    /// or `asserts_annotation`), colon included.
    pub fn return_type(&self) -> Option<Node<'t>> {
        self.node.child_by_field_name("return_type")
    }

    /// The `( … )` parameter list, absent for `x => …` arrows.
    pub fn parameter_list(&self) -> Option<Node<'t>> {
        self.node.child_by_field_name("parameters")
    }

    /// The bare identifier parameter of an `x => …` arrow.
    pub fn bare_parameter(&self) -> Option<Node<'t>> {
        if self.kind == FunctionKind::ArrowFn {
            self.node.child_by_field_name("parameter")
        } else {
            None
        }
    }

    pub fn parameters(&self) -> Vec<Parameter<'t>> {
        if let Some(ident) = self.bare_parameter() {
            return vec![Parameter {
                name: Some(node_text(ident, self.source)),
                declared_type: None,
                default: None,
                is_rest: false,
                is_optional: false,
                node: ident,
            }];
        }
        let Some(list) = self.parameter_list() else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter_map(|p| parse_parameter(p, self.source))
            .collect()
    }

    pub fn body(&self) -> Option<Body<'t>> {
        let body = self.node.child_by_field_name("body")?;
        if body.kind() == "statement_block" {
            Some(Body::Block(body))
        } else {
            Some(Body::Expression(body))
        }
    }

    /// The concise body of an arrow, if it has one.
    pub fn concise_body(&self) -> Option<Node<'t>> {
        match self.body()? {
            Body::Expression(expr) if self.kind == FunctionKind::ArrowFn => Some(expr),
            _ => None,
        }
    }

    /// The expression of the sole statement when the body is `{ return <expr>; }`.
    pub fn sole_return_expression(&self) -> Option<Node<'t>> {
        let Body::Block(block) = self.body()? else {
            return None;
        };
        let statements = crate::syntax::named_children_vec(block);
        match statements.as_slice() {
            [stmt] if stmt.kind() == "return_statement" => first_named_child(*stmt),
            _ => None,
        }
    }

    pub fn type_parameter_count(&self) -> usize {
        let Some(params) = self.node.child_by_field_name("type_parameters") else {
            return 0;
        };
        let mut cursor = params.walk();
        let count = params
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "type_parameter")
            .count();
        count
    }

    /// 1-based (line, column) of the node.
    pub fn location(&self) -> (u32, u32) {
        crate::syntax::location(self.node)
    }

    /// Name used in log lines: own name, binding name, or `<anonymous>`.
    pub fn label(&self) -> String {
        self.name()
            .or_else(|| self.binding_name())
            .map(str::to_string)
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

fn parse_parameter<'t>(node: Node<'t>, source: &'t [u8]) -> Option<Parameter<'t>> {
    let is_optional = match node.kind() {
        "required_parameter" => false,
        "optional_parameter" => true,
        _ => return None,
    };
    let pattern = node.child_by_field_name("pattern")?;
    let (name, is_rest) = match pattern.kind() {
        "identifier" | "this" => (Some(node_text(pattern, source)), false),
        "rest_pattern" => {
            let inner = first_named_child(pattern);
            (
                inner
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| node_text(n, source)),
                true,
            )
        }
        _ => (None, false),
    };
    Some(Parameter {
        name,
        declared_type: node
            .child_by_field_name("type")
            .map(|t| type_annotation_text(t, source)),
        default: node.child_by_field_name("value"),
        is_rest,
        is_optional,
        node,
    })
}

/// Collects the anonymous keyword tokens that precede the name or the
/// parameter list.
fn scan_modifiers(node: Node<'_>) -> Modifiers {
    let mut modifiers = Modifiers::default();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_named() {
            match child.kind() {
                "decorator" | "accessibility_modifier" | "override_modifier" => continue,
                _ => break,
            }
        }
        match child.kind() {
            "async" => modifiers.is_async = true,
            "*" => modifiers.is_generator = true,
            "get" => modifiers.is_getter = true,
            "set" => modifiers.is_setter = true,
            _ => {}
        }
    }
    modifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParserHost, SourceLanguage, SourceUnit};
    use std::path::Path;

    fn parse(src: &str) -> SourceUnit {
        ParserHost::new()
            .unwrap()
            .parse(Path::new("t.ts"), src.into(), SourceLanguage::TypeScript)
            .unwrap()
    }

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

    #[test]
    fn test_kinds() {
        let unit = parse(
            "function a() {}\nconst b = function () {};\nconst c = () => 1;\nclass K { m() {} }",
        );
        let kinds: Vec<_> = candidates(&unit).iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FunctionKind::FunctionDecl,
                FunctionKind::FunctionExpr,
                FunctionKind::ArrowFn,
                FunctionKind::MethodDecl,
            ]
        );
    }

    #[test]
    fn test_overload_signatures_are_not_candidates() {
        let unit = parse(
            "function f(x: string): string;\nfunction f(x: number): number;\nfunction f(x: any) { return x; }",
        );
        let found = candidates(&unit);
        assert_eq!(found.len(), 1);
        assert!(found[0].parameters()[0].declared_type == Some("any"));
    }

    #[test]
    fn test_constructor_and_accessors() {
        let unit = parse(
            "class K {\n constructor() {}\n get v() { return 1 }\n set v(x: number) {}\n set() {}\n}",
        );
        let found = candidates(&unit);
        assert!(found[0].is_constructor());
        assert!(found[1].is_getter() && !found[1].is_setter());
        assert!(found[2].is_setter());
        // A method *named* `set` is not a setter.
        assert!(!found[3].is_setter());
        assert_eq!(found[3].name(), Some("set"));
    }

    #[test]
    fn test_async_and_generator_modifiers() {
        let unit = parse("async function a() {}\nfunction* g() {}\nconst h = async (x) => x;");
        let found = candidates(&unit);
        assert!(found[0].is_async() && !found[0].is_generator());
        assert!(found[1].is_generator());
        assert!(found[2].is_async());
    }

    #[test]
    fn test_parameters() {
        let unit = parse("function f(a: string, b?: number, c = 3, ...rest: boolean[]) {}");
        let params = candidates(&unit)[0].parameters();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].name, Some("a"));
        assert_eq!(params[0].declared_type, Some("string"));
        assert!(params[1].is_optional);
        assert!(params[2].default.is_some());
        assert_eq!(params[2].declared_type, None);
        assert!(params[3].is_rest);
        assert_eq!(params[3].name, Some("rest"));
        assert_eq!(params[3].declared_type, Some("boolean[]"));
    }

    #[test]
    fn test_bare_arrow_parameter() {
        let unit = parse("const f = x => x;");
        let c = candidates(&unit)[0];
        assert!(c.parameter_list().is_none());
        assert_eq!(c.parameters()[0].name, Some("x"));
        assert_eq!(c.concise_body().map(|b| b.kind()), Some("identifier"));
    }

    #[test]
    fn test_binding_names() {
        let unit = parse(
            "const a = () => 1;\nclass K { b = () => 2; }\nconst o = { c: () => 3 };\nx.d = () => 4;\nrun(() => 5);",
        );
        let names: Vec<_> = candidates(&unit).iter().map(|c| c.binding_name()).collect();
        assert_eq!(names, vec![Some("a"), Some("b"), Some("c"), Some("x.d"), None]);
    }

    #[test]
    fn test_type_parameter_count_and_return_type() {
        let unit = parse("function f<T, U>(x: T): U { return null as any }");
        let c = candidates(&unit)[0];
        assert_eq!(c.type_parameter_count(), 2);
        assert!(c.return_type().is_some());
    }

    #[test]
    fn test_sole_return_expression() {
        let unit = parse("function f(x: number) {\n  // echo\n  return x;\n}");
        let c = candidates(&unit)[0];
        let expr = c.sole_return_expression().unwrap();
        assert_eq!(c.text(expr), "x");
    }
}
