//! Syntactic return-type inference.
//!
//! Types are computed bottom-up from expression syntax, name lookups in the
//! same file, calls to local functions and a table of well-known globals.
//! Whatever falls outside those rules is reported as unresolved; the engine
//! then leaves the function alone rather than guess.

use anatomist::syntax::{
    first_named_child, is_function_like, last_child, named_children_vec, node_text,
    type_annotation_text, unwrap_parens,
};
use anatomist::{Body, Candidate, FnParam, InferredType, Member, OracleError, Parameter, Primitive};
use tree_sitter::Node;

use crate::ambient::AmbientTypes;
use crate::builtins::{self, Receiver};
use crate::scope::{lookup, Binding, DeclKind};

/// Nested function and binding resolutions allowed before giving up.
pub const MAX_DEPTH: usize = 16;

/// Array methods whose callback is called as `(element, index, array)`.
const ELEMENT_CALLBACKS: &[&str] = &[
    "map",
    "flatMap",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "some",
    "every",
    "forEach",
];

/// Where a function's untyped parameters take their types from.
#[derive(Debug, Clone, Copy)]
enum ParameterSource<'t> {
    /// Nowhere: they are implicitly `any`.
    Implicit,
    /// Argument `index` of `call`.
    Argument { call: Node<'t>, index: usize },
    /// A contextual type this inference cannot see.
    Context,
}

/// One inference request; tracks the functions and bindings being resolved.
pub struct Inference<'t> {
    source: &'t [u8],
    ambient: &'t AmbientTypes,
    visiting: Vec<usize>,
}

fn unresolved(node: Node<'_>, source: &[u8]) -> OracleError {
    let text = node_text(node, source);
    let short: String = text.chars().take(60).collect();
    OracleError::Unresolved(short)
}

impl<'t> Inference<'t> {
    pub fn new(source: &'t [u8], ambient: &'t AmbientTypes) -> Self {
        Self {
            source,
            ambient,
            visiting: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'t str {
        node_text(node, self.source)
    }

    fn enter(&mut self, node: Node<'_>) -> Result<(), OracleError> {
        if self.visiting.contains(&node.id()) {
            return Err(OracleError::Circular(
                self.text(node).chars().take(40).collect(),
            ));
        }
        if self.visiting.len() >= MAX_DEPTH {
            return Err(OracleError::DepthExceeded);
        }
        self.visiting.push(node.id());
        Ok(())
    }

    fn leave(&mut self) {
        self.visiting.pop();
    }

    /// Return type of a function-like node, as if it had no annotation.
    pub fn function_return(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let candidate = Candidate::new(node, self.source).ok_or(OracleError::MissingBody)?;
        if candidate.is_generator() {
            return Err(OracleError::Unsupported("generator functions"));
        }
        self.enter(node)?;
        let body = self.body_type(&candidate);
        self.leave();
        let ty = body?;

        if candidate.is_async() {
            if ty.promised().is_some() {
                return Ok(ty);
            }
            return Ok(InferredType::promise(ty));
        }
        Ok(ty)
    }

    fn body_type(&mut self, candidate: &Candidate<'t>) -> Result<InferredType, OracleError> {
        let block = match candidate.body().ok_or(OracleError::MissingBody)? {
            Body::Expression(expr) => return Ok(finish(vec![self.await_aware(expr, candidate)?])),
            Body::Block(block) => block,
        };

        let returns = collect_returns(block);
        if returns.is_empty() {
            let throws_only = named_children_vec(block)
                .last()
                .is_some_and(|s| s.kind() == "throw_statement");
            return Ok(if throws_only && candidate.kind().is_expression() {
                InferredType::Never
            } else {
                InferredType::Void
            });
        }

        let mut types = Vec::new();
        let mut bare_returns = 0;
        let mut circular = None;
        for ret in &returns {
            let Some(expr) = first_named_child(*ret) else {
                bare_returns += 1;
                continue;
            };
            match self.await_aware(expr, candidate) {
                Ok(ty) => types.push(ty),
                // Self-recursive branches do not contribute when another
                // branch settles the type.
                Err(OracleError::Circular(name)) => circular = Some(name),
                Err(err) => return Err(err),
            }
        }
        if types.is_empty() {
            if let Some(name) = circular {
                return Err(OracleError::Circular(name));
            }
            return Ok(InferredType::Void);
        }
        if bare_returns > 0 || completes_normally(block) {
            types.push(InferredType::Undefined);
        }
        Ok(finish(types))
    }

    /// In async functions `return await p` and `return p` both settle to
    /// the promised type; the caller re-wraps.
    fn await_aware(&mut self, expr: Node<'t>, candidate: &Candidate<'t>) -> Result<InferredType, OracleError> {
        let ty = self.expression(expr)?;
        if candidate.is_async() {
            if let Some(inner) = ty.promised() {
                return Ok(inner.clone());
            }
        }
        Ok(ty)
    }

    /// Type of an arbitrary expression.
    pub fn expression(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let node = unwrap_parens(node);
        match node.kind() {
            "string" => Ok(InferredType::Literal(string_literal(self.text(node)))),
            "template_string" => Ok(InferredType::string()),
            "number" => Ok(InferredType::Literal(self.text(node).to_string())),
            "true" | "false" => Ok(InferredType::Literal(node.kind().to_string())),
            "null" => Ok(InferredType::Null),
            "undefined" => Ok(InferredType::Undefined),
            "regex" => Ok(InferredType::named("RegExp")),
            "jsx_element" | "jsx_self_closing_element" => Ok(InferredType::named("JSX.Element")),
            "object" => self.object(node),
            "array" => self.array(node),
            "arrow_function" | "function_expression" | "function" => self.function_type(node),
            "identifier" => self.identifier(node),
            "as_expression" => self.assertion(node),
            "satisfies_expression" => {
                let inner = first_named_child(node).ok_or_else(|| unresolved(node, self.source))?;
                self.expression(inner)
            }
            "type_assertion" => {
                let ty = named_children_vec(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_arguments")
                    .and_then(first_named_child)
                    .ok_or_else(|| unresolved(node, self.source))?;
                Ok(declared(self.text(ty)))
            }
            "non_null_expression" => {
                let inner = first_named_child(node).ok_or_else(|| unresolved(node, self.source))?;
                Ok(self.expression(inner)?.non_nullable())
            }
            "unary_expression" => self.unary(node),
            "update_expression" => Ok(InferredType::number()),
            "binary_expression" => self.binary(node),
            "ternary_expression" => {
                let field = |name: &str| node.child_by_field_name(name);
                let (Some(yes), Some(no)) = (field("consequence"), field("alternative")) else {
                    return Err(unresolved(node, self.source));
                };
                Ok(InferredType::union([self.expression(yes)?, self.expression(no)?]))
            }
            "await_expression" => {
                let inner = first_named_child(node).ok_or_else(|| unresolved(node, self.source))?;
                let ty = self.expression(inner)?;
                Ok(ty.promised().cloned().unwrap_or(ty))
            }
            "assignment_expression" => {
                let right = node
                    .child_by_field_name("right")
                    .ok_or_else(|| unresolved(node, self.source))?;
                self.expression(right)
            }
            "sequence_expression" => {
                let last = named_children_vec(node)
                    .pop()
                    .ok_or_else(|| unresolved(node, self.source))?;
                self.expression(last)
            }
            "new_expression" => self.construct(node),
            "call_expression" => self.call(node),
            "member_expression" => self.member(node),
            "subscript_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .ok_or_else(|| unresolved(node, self.source))?;
                match self.expression(object)? {
                    InferredType::Array(element) => Ok(*element),
                    _ => Err(unresolved(node, self.source)),
                }
            }
            _ => Err(unresolved(node, self.source)),
        }
    }

    fn object(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let mut members = Vec::new();
        for child in named_children_vec(node) {
            let (name, ty) = match child.kind() {
                "pair" => {
                    let key = child
                        .child_by_field_name("key")
                        .ok_or_else(|| unresolved(child, self.source))?;
                    let value = child
                        .child_by_field_name("value")
                        .ok_or_else(|| unresolved(child, self.source))?;
                    (self.property_key(key)?, self.expression(value)?.widen())
                }
                "shorthand_property_identifier" => {
                    (self.text(child).to_string(), self.identifier(child)?.widen())
                }
                "method_definition" => {
                    let key = child
                        .child_by_field_name("name")
                        .ok_or_else(|| unresolved(child, self.source))?;
                    (self.property_key(key)?, self.function_type(child)?)
                }
                _ => return Err(unresolved(child, self.source)),
            };
            members.push(Member {
                name,
                ty,
                optional: false,
                readonly: false,
            });
        }
        Ok(InferredType::Object(members))
    }

    fn property_key(&self, key: Node<'t>) -> Result<String, OracleError> {
        match key.kind() {
            "property_identifier" | "number" => Ok(self.text(key).to_string()),
            "string" => {
                let text = self.text(key);
                Ok(text
                    .get(1..text.len().saturating_sub(1))
                    .unwrap_or_default()
                    .to_string())
            }
            _ => Err(unresolved(key, self.source)),
        }
    }

    fn array(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let elements = named_children_vec(node);
        if elements.is_empty() {
            return Ok(InferredType::array(InferredType::Any));
        }
        let mut types = Vec::with_capacity(elements.len());
        for element in elements {
            if element.kind() == "spread_element" {
                let inner = first_named_child(element).ok_or_else(|| unresolved(element, self.source))?;
                match self.expression(inner)? {
                    InferredType::Array(ty) => types.push(*ty),
                    _ => return Err(unresolved(element, self.source)),
                }
            } else {
                types.push(self.expression(element)?.widen());
            }
        }
        Ok(InferredType::array(InferredType::union(types)))
    }

    /// `(a: number) => string` for a nested function value.
    fn function_type(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let candidate = Candidate::new(node, self.source).ok_or(OracleError::MissingBody)?;
        let mut params = Vec::new();
        for param in candidate.parameters() {
            if param.name == Some("this") {
                continue;
            }
            let ty = match (param.declared_type, param.default) {
                (Some(text), _) => declared(text),
                (None, Some(default)) => self.expression(default)?.widen(),
                (None, None) => self.untyped_parameter(&param, node)?,
            };
            let name = match param.name {
                Some(name) => name.to_string(),
                None => param
                    .node
                    .child_by_field_name("pattern")
                    .map(|p| self.text(p).to_string())
                    .unwrap_or_else(|| "arg".to_string()),
            };
            params.push(FnParam {
                name,
                ty,
                optional: param.is_optional || param.default.is_some(),
                rest: param.is_rest,
            });
        }
        let ret = self.function_return(node)?;
        Ok(InferredType::Function {
            params,
            ret: Box::new(ret),
        })
    }

    fn identifier(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let name = self.text(node);
        match lookup(node, name, self.source) {
            Some(Binding::Parameter(param)) => match (param.declared_type, param.default) {
                (Some(text), _) if param.is_optional => {
                    Ok(InferredType::union([declared(text), InferredType::Undefined]))
                }
                (Some(text), _) => Ok(declared(text)),
                (None, Some(default)) => Ok(self.expression(default)?.widen()),
                (None, None) => self.untyped_parameter(&param, node),
            },
            Some(Binding::Variable { declarator, kind }) => self.variable(declarator, kind),
            Some(Binding::Function(function)) => self.function_type(function),
            Some(Binding::Class(_)) => Ok(InferredType::Text(format!("typeof {name}"))),
            Some(Binding::Import { .. }) => Err(unresolved(node, self.source)),
            None => builtins::global_value(name).ok_or_else(|| unresolved(node, self.source)),
        }
    }

    /// Type of a parameter written with neither a type nor a default.
    fn untyped_parameter(&mut self, param: &Parameter<'t>, at: Node<'t>) -> Result<InferredType, OracleError> {
        let function = owning_function(param.node).ok_or_else(|| unresolved(at, self.source))?;
        match parameter_source(function) {
            ParameterSource::Implicit if param.is_rest => Ok(InferredType::array(InferredType::Any)),
            ParameterSource::Implicit => Ok(InferredType::Any),
            ParameterSource::Argument { call, index: 0 } if !param.is_rest => {
                self.callback_parameter(call, function, param, at)
            }
            _ => Err(unresolved(at, self.source)),
        }
    }

    /// Parameter of a callback passed first to an array iteration method:
    /// `xs.map((element, index, array) => …)`.
    fn callback_parameter(
        &mut self,
        call: Node<'t>,
        function: Node<'t>,
        param: &Parameter<'t>,
        at: Node<'t>,
    ) -> Result<InferredType, OracleError> {
        let callee = call
            .child_by_field_name("function")
            .map(unwrap_parens)
            .filter(|c| call.kind() == "call_expression" && c.kind() == "member_expression");
        let (Some(object), Some(property)) = (
            callee.and_then(|c| c.child_by_field_name("object")),
            callee.and_then(|c| c.child_by_field_name("property")),
        ) else {
            return Err(unresolved(at, self.source));
        };
        if !ELEMENT_CALLBACKS.contains(&self.text(property)) {
            return Err(unresolved(at, self.source));
        }
        let position = Candidate::new(function, self.source).and_then(|c| {
            c.parameters()
                .iter()
                .position(|p| p.node.id() == param.node.id())
        });

        self.enter(call)?;
        let receiver = self.expression(object).map(InferredType::widen);
        self.leave();
        let InferredType::Array(element) = receiver? else {
            return Err(unresolved(at, self.source));
        };
        match position {
            Some(0) => Ok(*element),
            Some(1) => Ok(InferredType::number()),
            Some(2) => Ok(InferredType::Array(element)),
            _ => Err(unresolved(at, self.source)),
        }
    }

    fn variable(&mut self, declarator: Node<'t>, kind: DeclKind) -> Result<InferredType, OracleError> {
        if let Some(annotation) = declarator.child_by_field_name("type") {
            return Ok(declared(type_annotation_text(annotation, self.source)));
        }
        let value = declarator
            .child_by_field_name("value")
            .ok_or_else(|| unresolved(declarator, self.source))?;
        self.enter(declarator)?;
        let ty = self.expression(value);
        self.leave();
        let ty = ty?;
        Ok(if kind == DeclKind::Const { ty } else { ty.widen() })
    }

    fn assertion(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let expr = first_named_child(node).ok_or_else(|| unresolved(node, self.source))?;
        let last = last_child(node).ok_or_else(|| unresolved(node, self.source))?;
        if last.kind() == "const" {
            return self.const_form(expr);
        }
        Ok(declared(self.text(last)))
    }

    /// The type of `expr as const`: literals stay literal, arrays become
    /// readonly tuples, object members become readonly.
    fn const_form(&mut self, expr: Node<'t>) -> Result<InferredType, OracleError> {
        let expr = unwrap_parens(expr);
        match expr.kind() {
            "string" => Ok(InferredType::Text(string_literal(self.text(expr)))),
            "number" | "true" | "false" => Ok(InferredType::Text(self.text(expr).to_string())),
            "unary_expression"
                if expr
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == "-")
                    && expr
                        .child_by_field_name("argument")
                        .is_some_and(|a| a.kind() == "number") =>
            {
                Ok(InferredType::Text(self.text(expr).replace(' ', "")))
            }
            "array" => {
                let mut elements = Vec::new();
                for element in named_children_vec(expr) {
                    if element.kind() == "spread_element" {
                        return Err(unresolved(element, self.source));
                    }
                    elements.push(self.const_form(element)?);
                }
                Ok(InferredType::Tuple {
                    elements,
                    readonly: true,
                })
            }
            "object" => {
                let mut members = Vec::new();
                for child in named_children_vec(expr) {
                    if child.kind() != "pair" {
                        return Err(unresolved(child, self.source));
                    }
                    let (Some(key), Some(value)) = (
                        child.child_by_field_name("key"),
                        child.child_by_field_name("value"),
                    ) else {
                        return Err(unresolved(child, self.source));
                    };
                    members.push(Member {
                        name: self.property_key(key)?,
                        ty: self.const_form(value)?,
                        optional: false,
                        readonly: true,
                    });
                }
                Ok(InferredType::Object(members))
            }
            _ => self.expression(expr),
        }
    }

    fn unary(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| op.kind())
            .unwrap_or_default();
        match operator {
            "!" | "delete" => Ok(InferredType::boolean()),
            "typeof" => Ok(InferredType::string()),
            "void" => Ok(InferredType::Undefined),
            "-" | "+" | "~" => {
                let argument = node.child_by_field_name("argument");
                let is_bigint = operator != "+"
                    && argument
                        .map(|a| self.expression(a).map(InferredType::widen))
                        .is_some_and(|t| {
                            t.is_ok_and(|t| t == InferredType::Primitive(Primitive::BigInt))
                        });
                Ok(if is_bigint {
                    InferredType::Primitive(Primitive::BigInt)
                } else {
                    InferredType::number()
                })
            }
            _ => Err(unresolved(node, self.source)),
        }
    }

    fn binary(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| op.kind())
            .unwrap_or_default();
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return Err(unresolved(node, self.source));
        };
        match operator {
            "==" | "===" | "!=" | "!==" | "<" | ">" | "<=" | ">=" | "instanceof" | "in" => {
                Ok(InferredType::boolean())
            }
            "+" => {
                let l = self.expression(left)?.widen();
                let r = self.expression(right)?.widen();
                let string = InferredType::string();
                let number = InferredType::number();
                let bigint = InferredType::Primitive(Primitive::BigInt);
                if l == string || r == string {
                    Ok(string)
                } else if l == number && r == number {
                    Ok(number)
                } else if l == bigint && r == bigint {
                    Ok(bigint)
                } else {
                    Err(unresolved(node, self.source))
                }
            }
            "-" | "*" | "/" | "%" | "**" | "&" | "|" | "^" | "<<" | ">>" | ">>>" => {
                let bigint = InferredType::Primitive(Primitive::BigInt);
                let l = self.expression(left).map(InferredType::widen);
                Ok(if l.is_ok_and(|l| l == bigint) { bigint } else { InferredType::number() })
            }
            "??" => {
                let l = self.expression(left)?.non_nullable();
                Ok(InferredType::union([l, self.expression(right)?]))
            }
            "||" => {
                let l = self.expression(left)?.non_nullable();
                let r = self.expression(right)?;
                if l.clone().widen() == InferredType::boolean() {
                    // A falsy left side is `false`, which yields the right side.
                    Ok(InferredType::union([InferredType::Literal("true".into()), r]))
                } else if l == r.clone().widen() {
                    Ok(InferredType::union([l, r]))
                } else {
                    Err(unresolved(node, self.source))
                }
            }
            "&&" => {
                let l = self.expression(left)?.widen();
                let r = self.expression(right)?.widen();
                if l == InferredType::boolean() && r == InferredType::boolean() {
                    Ok(InferredType::boolean())
                } else {
                    Err(unresolved(node, self.source))
                }
            }
            _ => Err(unresolved(node, self.source)),
        }
    }

    fn type_arguments(&self, node: Node<'t>) -> Vec<InferredType> {
        node.child_by_field_name("type_arguments")
            .map(|args| {
                named_children_vec(args)
                    .into_iter()
                    .map(|a| InferredType::Text(self.text(a).to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn construct(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let ctor = node
            .child_by_field_name("constructor")
            .ok_or_else(|| unresolved(node, self.source))?;
        let args = self.type_arguments(node);
        let name = self.text(ctor);
        match ctor.kind() {
            "identifier" => match lookup(ctor, name, self.source) {
                Some(Binding::Class(class)) => {
                    // A generic class without explicit arguments needs real inference.
                    if class.child_by_field_name("type_parameters").is_some() && args.is_empty() {
                        return Err(unresolved(node, self.source));
                    }
                    Ok(InferredType::Named {
                        name: name.to_string(),
                        args,
                    })
                }
                Some(Binding::Import { specifier }) => {
                    if self.ambient.resolves(specifier) {
                        Ok(InferredType::Named {
                            name: name.to_string(),
                            args,
                        })
                    } else {
                        Ok(InferredType::Any)
                    }
                }
                Some(_) => Err(unresolved(node, self.source)),
                None => builtins::constructed(name, args).ok_or_else(|| unresolved(node, self.source)),
            },
            "member_expression" => Ok(InferredType::Named {
                name: name.to_string(),
                args,
            }),
            _ => Err(unresolved(node, self.source)),
        }
    }

    fn call(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let callee = node
            .child_by_field_name("function")
            .map(unwrap_parens)
            .ok_or_else(|| unresolved(node, self.source))?;
        let arguments = node
            .child_by_field_name("arguments")
            .map(named_children_vec)
            .unwrap_or_default();

        match callee.kind() {
            "identifier" => {
                let name = self.text(callee);
                match lookup(callee, name, self.source) {
                    Some(Binding::Function(function)) => self.callee_return(function, node),
                    Some(Binding::Variable { declarator, .. }) => {
                        let value = declarator
                            .child_by_field_name("value")
                            .map(unwrap_parens)
                            .filter(|v| Candidate::new(*v, self.source).is_some())
                            .ok_or_else(|| unresolved(node, self.source))?;
                        self.callee_return(value, node)
                    }
                    Some(_) => Err(unresolved(node, self.source)),
                    None => builtins::global_function(name).ok_or_else(|| unresolved(node, self.source)),
                }
            }
            "member_expression" => self.method_call(node, callee, &arguments),
            "arrow_function" | "function_expression" | "function" => self.function_return(callee),
            _ => Err(unresolved(node, self.source)),
        }
    }

    /// Declared return type of a local function, or its inferred one.
    fn callee_return(&mut self, function: Node<'t>, call: Node<'t>) -> Result<InferredType, OracleError> {
        let candidate = Candidate::new(function, self.source).ok_or_else(|| unresolved(call, self.source))?;
        if let Some(annotation) = candidate.return_type() {
            return Ok(match annotation.kind() {
                "type_predicate_annotation" => InferredType::boolean(),
                "asserts_annotation" => InferredType::Void,
                _ => declared(type_annotation_text(annotation, self.source)),
            });
        }
        // Generic results depend on the arguments at this call site.
        if candidate.type_parameter_count() > 0 {
            return Err(unresolved(call, self.source));
        }
        self.function_return(function)
    }

    fn method_call(
        &mut self,
        call: Node<'t>,
        callee: Node<'t>,
        arguments: &[Node<'t>],
    ) -> Result<InferredType, OracleError> {
        let (Some(object), Some(property)) = (
            callee.child_by_field_name("object"),
            callee.child_by_field_name("property"),
        ) else {
            return Err(unresolved(call, self.source));
        };
        let method = self.text(property);

        if object.kind() == "identifier" {
            let namespace = self.text(object);
            if lookup(object, namespace, self.source).is_none() {
                if namespace == "Promise" && matches!(method, "resolve" | "reject") {
                    return self.promise_factory(method, arguments);
                }
                if let Some(ty) = builtins::global_call(namespace, method) {
                    return Ok(ty);
                }
            }
        }

        let receiver = self.expression(object)?.widen();
        if method == "map" {
            if let InferredType::Array(_) = receiver {
                if let Some(callback) = arguments.first().map(|a| unwrap_parens(*a)) {
                    if Candidate::new(callback, self.source).is_some() {
                        let element = self.function_return(callback)?.widen();
                        return Ok(InferredType::array(element));
                    }
                }
            }
        }
        if let Some(ty) = builtins::receiver_method(method, &receiver) {
            return Ok(ty);
        }
        Receiver::of(&receiver)
            .and_then(|kind| builtins::method(method, kind))
            .ok_or_else(|| unresolved(call, self.source))
    }

    fn promise_factory(&mut self, method: &str, arguments: &[Node<'t>]) -> Result<InferredType, OracleError> {
        if method == "reject" {
            return Ok(InferredType::promise(InferredType::Never));
        }
        let inner = match arguments.first() {
            Some(arg) => {
                let ty = self.expression(*arg)?.widen();
                ty.promised().cloned().unwrap_or(ty)
            }
            None => InferredType::Void,
        };
        Ok(InferredType::promise(inner))
    }

    fn member(&mut self, node: Node<'t>) -> Result<InferredType, OracleError> {
        let (Some(object), Some(property)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("property"),
        ) else {
            return Err(unresolved(node, self.source));
        };
        let name = self.text(property);
        match self.expression(object)?.widen() {
            InferredType::Object(members) => members
                .into_iter()
                .find(|m| m.name == name)
                .map(|m| m.ty)
                .ok_or_else(|| unresolved(node, self.source)),
            InferredType::Primitive(Primitive::String)
            | InferredType::Array(_)
            | InferredType::Tuple { .. }
            | InferredType::Function { .. }
                if name == "length" =>
            {
                Ok(InferredType::number())
            }
            _ => Err(unresolved(node, self.source)),
        }
    }
}

/// Settles the union of all returned types. A lone literal widens to its
/// primitive; several literals stay literal.
fn finish(types: Vec<InferredType>) -> InferredType {
    match InferredType::union(types) {
        literal @ InferredType::Literal(_) => literal.widen(),
        other => other,
    }
}

/// Reads a written type annotation back into structure where the rest of
/// inference can use it: primitives, `T[]`, `Array<T>`, `Promise<T>` and
/// flat unions. Everything else stays verbatim text.
pub fn declared(text: &str) -> InferredType {
    let text = text.trim();
    if text.contains("=>") || text.starts_with('(') && !text.ends_with(']') {
        return InferredType::Text(text.to_string());
    }
    let members = split_top_level(text, '|');
    if members.len() > 1 {
        return InferredType::union(members.into_iter().map(declared));
    }
    match text {
        "string" => return InferredType::string(),
        "number" => return InferredType::number(),
        "boolean" => return InferredType::boolean(),
        "bigint" => return InferredType::Primitive(Primitive::BigInt),
        "symbol" => return InferredType::Primitive(Primitive::Symbol),
        "any" => return InferredType::Any,
        "unknown" => return InferredType::Unknown,
        "void" => return InferredType::Void,
        "never" => return InferredType::Never,
        "null" => return InferredType::Null,
        "undefined" => return InferredType::Undefined,
        _ => {}
    }
    if let Some(element) = text.strip_suffix("[]") {
        if let Some(inner) = element.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
            return InferredType::array(declared(inner));
        }
        if split_top_level(element, '|').len() == 1 && !element.contains(' ') {
            return InferredType::array(declared(element));
        }
    }
    for (wrapper, build) in [
        ("Array", InferredType::array as fn(InferredType) -> InferredType),
        ("Promise", InferredType::promise),
    ] {
        if let Some(inner) = generic_argument(text, wrapper) {
            return build(declared(inner));
        }
    }
    InferredType::Text(text.to_string())
}

/// `inner` of `Name<inner>` when the closing `>` is the last character.
fn generic_argument<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let inner = text.strip_prefix(name)?.strip_prefix('<')?.strip_suffix('>')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return None;
        }
    }
    (depth == 0 && split_top_level(inner, ',').len() == 1).then_some(inner)
}

/// Splits on `sep` outside of any bracket pair.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// `'it\'s'` → `"it's"`.
fn string_literal(raw: &str) -> String {
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len() + 2);
    out.push('"');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `return` statements of `block`, excluding those of nested functions and
/// classes.
fn collect_returns(block: Node<'_>) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    let mut stack = named_children_vec(block);
    stack.reverse();
    while let Some(node) = stack.pop() {
        if node.kind() == "return_statement" {
            found.push(node);
            continue;
        }
        if is_function_like(node.kind())
            || matches!(node.kind(), "class_declaration" | "class" | "abstract_class_declaration")
        {
            continue;
        }
        let mut children = named_children_vec(node);
        children.reverse();
        stack.extend(children);
    }
    found
}

/// The function whose parameter list holds `param`.
fn owning_function(param: Node<'_>) -> Option<Node<'_>> {
    let mut node = param.parent()?;
    while !is_function_like(node.kind()) {
        node = node.parent()?;
    }
    Some(node)
}

fn parameter_source(function: Node<'_>) -> ParameterSource<'_> {
    if matches!(
        function.kind(),
        "function_declaration" | "generator_function_declaration"
    ) {
        return ParameterSource::Implicit;
    }
    let mut node = function;
    let mut direct = true;
    while let Some(parent) = node.parent() {
        match parent.kind() {
            "parenthesized_expression" => {}
            "object" | "pair" | "array" | "spread_element" | "ternary_expression"
            | "binary_expression" | "sequence_expression" => direct = false,
            "arguments" if direct => {
                let index = named_children_vec(parent)
                    .iter()
                    .position(|arg| arg.id() == node.id());
                return match (parent.parent(), index) {
                    (Some(call), Some(index)) => ParameterSource::Argument { call, index },
                    _ => ParameterSource::Context,
                };
            }
            "variable_declarator" | "public_field_definition" => {
                return if parent.child_by_field_name("type").is_some() {
                    ParameterSource::Context
                } else {
                    ParameterSource::Implicit
                };
            }
            "class_body" | "export_statement" | "expression_statement" | "statement_block"
            | "program" => return ParameterSource::Implicit,
            _ => return ParameterSource::Context,
        }
        node = parent;
    }
    ParameterSource::Implicit
}

/// Whether a `break` in `body` leaves the statement that owns `body`.
/// Labelled breaks always count.
fn breaks_out(body: Node<'_>) -> bool {
    let mut stack = vec![(body, false)];
    while let Some((node, nested)) = stack.pop() {
        match node.kind() {
            "break_statement" => {
                if !nested || node.child_by_field_name("label").is_some() {
                    return true;
                }
            }
            kind if is_function_like(kind)
                || matches!(kind, "class_declaration" | "class" | "abstract_class_declaration") => {}
            kind => {
                let inner = nested
                    || matches!(
                        kind,
                        "for_statement"
                            | "for_in_statement"
                            | "while_statement"
                            | "do_statement"
                            | "switch_statement"
                    );
                stack.extend(named_children_vec(node).into_iter().map(|n| (n, inner)));
            }
        }
    }
    false
}

/// `while (true)`, `do … while (true)` and `for (;;)`.
fn loops_forever(statement: Node<'_>) -> bool {
    let Some(condition) = statement.child_by_field_name("condition") else {
        return statement.kind() == "for_statement";
    };
    let condition = match condition.kind() {
        "empty_statement" | ";" => return true,
        "expression_statement" => match first_named_child(condition) {
            Some(expr) => expr,
            None => return true,
        },
        _ => condition,
    };
    unwrap_parens(condition).kind() == "true"
}

/// Whether control can run off the end of a `case`/`default` clause.
fn clause_completes(clause: Node<'_>) -> bool {
    let value = clause.child_by_field_name("value").map(|v| v.id());
    named_children_vec(clause)
        .into_iter()
        .filter(|s| Some(s.id()) != value)
        .last()
        .map_or(true, completes_normally)
}

/// Whether control can reach the end of `statement` without returning or
/// throwing.
fn completes_normally(statement: Node<'_>) -> bool {
    match statement.kind() {
        "return_statement" | "throw_statement" => false,
        "statement_block" => named_children_vec(statement)
            .last()
            .map_or(true, |last| completes_normally(*last)),
        "if_statement" => {
            let consequence = statement.child_by_field_name("consequence");
            let alternative = statement
                .child_by_field_name("alternative")
                .and_then(first_named_child);
            match (consequence, alternative) {
                (Some(c), Some(a)) => completes_normally(c) || completes_normally(a),
                _ => true,
            }
        }
        "try_statement" => {
            let body = statement.child_by_field_name("body");
            let handler = statement
                .child_by_field_name("handler")
                .and_then(|h| h.child_by_field_name("body"));
            match (body, handler) {
                (Some(b), Some(h)) => completes_normally(b) || completes_normally(h),
                (Some(b), None) => completes_normally(b),
                _ => true,
            }
        }
        "switch_statement" => {
            let Some(body) = statement.child_by_field_name("body") else {
                return true;
            };
            let clauses = named_children_vec(body);
            // Without `default` some value matches no clause.
            if !clauses.iter().any(|c| c.kind() == "switch_default") || breaks_out(body) {
                return true;
            }
            // Clauses fall through, so only the last one can leave the switch.
            clauses.last().map_or(true, |last| clause_completes(*last))
        }
        "while_statement" | "do_statement" | "for_statement" => {
            !loops_forever(statement)
                || statement
                    .child_by_field_name("body")
                    .map_or(true, breaks_out)
        }
        _ => true,
    }
}
