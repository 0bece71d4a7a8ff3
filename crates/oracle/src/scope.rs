//! Lexical name lookup within one file.
//!
//! Walks outward from an identifier through enclosing functions and blocks
//! until a parameter or declaration with the same name is found. Hoisting
//! and the temporal dead zone are ignored: any declaration in an enclosing
//! block counts, wherever it appears.

use anatomist::syntax::{named_children_vec, node_text};
use anatomist::{Candidate, Parameter};
use tree_sitter::Node;

/// `const`, `let` or `var`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

/// What a name refers to.
#[derive(Debug, Clone)]
pub enum Binding<'t> {
    Parameter(Parameter<'t>),
    Variable { declarator: Node<'t>, kind: DeclKind },
    Function(Node<'t>),
    Class(Node<'t>),
    /// Imported from the module `specifier`.
    Import { specifier: &'t str },
}

/// Node kinds whose direct children are statements that can declare names.
const STATEMENT_CONTAINERS: &[&str] = &["program", "statement_block", "switch_case", "switch_default"];

/// Resolves `name` as seen from `at`.
pub fn lookup<'t>(at: Node<'t>, name: &str, source: &'t [u8]) -> Option<Binding<'t>> {
    let mut current = at;
    while let Some(scope) = current.parent() {
        if let Some(function) = Candidate::new(scope, source) {
            if let Some(param) = function.parameters().into_iter().find(|p| p.name == Some(name)) {
                return Some(Binding::Parameter(param));
            }
            // A named function expression can refer to itself.
            if function.kind().is_expression() && function.name() == Some(name) {
                return Some(Binding::Function(scope));
            }
        }
        if STATEMENT_CONTAINERS.contains(&scope.kind()) {
            if let Some(binding) = find_declaration(scope, name, source) {
                return Some(binding);
            }
        }
        current = scope;
    }
    None
}

fn find_declaration<'t>(container: Node<'t>, name: &str, source: &'t [u8]) -> Option<Binding<'t>> {
    named_children_vec(container)
        .into_iter()
        .find_map(|statement| declaration_binding(statement, name, source))
}

fn declaration_binding<'t>(statement: Node<'t>, name: &str, source: &'t [u8]) -> Option<Binding<'t>> {
    let declared_name = |node: Node<'t>| {
        node.child_by_field_name("name")
            .map(|n| node_text(n, source))
    };
    match statement.kind() {
        "export_statement" => statement
            .child_by_field_name("declaration")
            .and_then(|decl| declaration_binding(decl, name, source)),
        "lexical_declaration" | "variable_declaration" => {
            let kind = match statement.child(0).map(|t| t.kind()) {
                Some("const") => DeclKind::Const,
                Some("let") => DeclKind::Let,
                _ => DeclKind::Var,
            };
            named_children_vec(statement)
                .into_iter()
                .filter(|d| d.kind() == "variable_declarator")
                .find(|d| {
                    d.child_by_field_name("name")
                        .is_some_and(|n| n.kind() == "identifier" && node_text(n, source) == name)
                })
                .map(|declarator| Binding::Variable { declarator, kind })
        }
        "function_declaration" | "generator_function_declaration"
            if declared_name(statement) == Some(name) =>
        {
            Some(Binding::Function(statement))
        }
        "class_declaration" | "abstract_class_declaration" if declared_name(statement) == Some(name) => {
            Some(Binding::Class(statement))
        }
        "import_statement" => import_binding(statement, name, source),
        _ => None,
    }
}

/// Matches default, named (`{ a as b }`) and namespace (`* as ns`) imports.
fn import_binding<'t>(statement: Node<'t>, name: &str, source: &'t [u8]) -> Option<Binding<'t>> {
    let specifier = statement.child_by_field_name("source")?;
    let specifier = node_text(specifier, source).trim_matches(|c| c == '"' || c == '\'');
    let clause = named_children_vec(statement)
        .into_iter()
        .find(|c| c.kind() == "import_clause")?;

    let mut stack = vec![clause];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_specifier" => {
                let local = node
                    .child_by_field_name("alias")
                    .or_else(|| node.child_by_field_name("name"));
                if local.is_some_and(|l| node_text(l, source) == name) {
                    return Some(Binding::Import { specifier });
                }
            }
            "identifier" if node_text(node, source) == name => {
                return Some(Binding::Import { specifier });
            }
            _ => stack.extend(named_children_vec(node)),
        }
    }
    None
}
