//! The type-oracle seam.
//!
//! The engine never infers types itself. It asks a [`TypeOracle`] for the
//! return type of a function node and for a textual rendering of that type.
//! The `oracle` crate provides the syntactic implementation used by the CLI;
//! tests plug in fakes.

use bitflags::bitflags;
use tree_sitter::Node;

use crate::parser::SourceUnit;

bitflags! {
    /// Rendering switches for [`TypeOracle::render_type`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Never elide object members; the engine always sets this.
        const NO_TRUNCATION = 1;
        /// Write `Array<T>` instead of `T[]`.
        const WRITE_ARRAY_AS_GENERIC = 1 << 1;
    }
}

/// Object members longer than this are elided unless `NO_TRUNCATION` is set.
pub const TRUNCATION_LENGTH: usize = 160;

/// Errors an oracle can report for a single node.
///
/// Every variant except [`OracleError::Internal`] means "no type available";
/// the engine skips the node and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("cannot infer a type for `{0}`")]
    Unresolved(String),
    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),
    #[error("circular reference through `{0}`")]
    Circular(String),
    #[error("inference depth limit reached")]
    DepthExceeded,
    #[error("function has no body")]
    MissingBody,
    #[error("oracle failure: {0}")]
    Internal(String),
}

impl OracleError {
    /// `true` when the oracle simply has no answer (as opposed to failing).
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, OracleError::Internal(_))
    }
}

/// Primitive TypeScript types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::BigInt => "bigint",
            Primitive::Symbol => "symbol",
        }
    }
}

/// Property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: InferredType,
    pub optional: bool,
    pub readonly: bool,
}

/// Parameter of a function type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnParam {
    pub name: String,
    pub ty: InferredType,
    pub optional: bool,
    pub rest: bool,
}

/// A type as produced by an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredType {
    Any,
    Unknown,
    Void,
    Never,
    Null,
    Undefined,
    Primitive(Primitive),
    /// Literal type text: `"a"`, `1`, `true`.
    Literal(String),
    /// Type text copied verbatim from a source annotation.
    Text(String),
    /// A named type, possibly generic: `Date`, `Map<string, number>`.
    Named {
        name: String,
        args: Vec<InferredType>,
    },
    Array(Box<InferredType>),
    Tuple {
        elements: Vec<InferredType>,
        readonly: bool,
    },
    Union(Vec<InferredType>),
    /// Inline object literal type.
    Object(Vec<Member>),
    Function {
        params: Vec<FnParam>,
        ret: Box<InferredType>,
    },
}

impl InferredType {
    pub fn string() -> Self {
        InferredType::Primitive(Primitive::String)
    }

    pub fn number() -> Self {
        InferredType::Primitive(Primitive::Number)
    }

    pub fn boolean() -> Self {
        InferredType::Primitive(Primitive::Boolean)
    }

    pub fn named(name: impl Into<String>) -> Self {
        InferredType::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn promise(inner: InferredType) -> Self {
        InferredType::Named {
            name: "Promise".to_string(),
            args: vec![inner],
        }
    }

    pub fn array(element: InferredType) -> Self {
        InferredType::Array(Box::new(element))
    }

    /// The `T` of `Promise<T>`.
    pub fn promised(&self) -> Option<&InferredType> {
        match self {
            InferredType::Named { name, args } if name == "Promise" && args.len() == 1 => {
                args.first()
            }
            _ => None,
        }
    }

    /// Builds a normalized union: nested unions are flattened, duplicates
    /// removed, `any`/`unknown` absorb everything, `never` disappears, and
    /// `null`/`undefined` move to the end. A single member is returned as is.
    pub fn union(types: impl IntoIterator<Item = InferredType>) -> Self {
        let mut flat: Vec<InferredType> = Vec::new();
        let mut nullish: Vec<InferredType> = Vec::new();
        let mut stack: Vec<InferredType> = types.into_iter().collect();
        stack.reverse();
        while let Some(ty) = stack.pop() {
            match ty {
                InferredType::Union(members) => stack.extend(members.into_iter().rev()),
                InferredType::Any => return InferredType::Any,
                InferredType::Never => {}
                InferredType::Null | InferredType::Undefined => {
                    if !nullish.contains(&ty) {
                        nullish.push(ty);
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        if flat.contains(&InferredType::Unknown) {
            return InferredType::Unknown;
        }
        reduce_literals(&mut flat);
        flat.extend(nullish);
        match flat.len() {
            0 => InferredType::Never,
            1 => flat.pop().unwrap_or(InferredType::Never),
            _ => InferredType::Union(flat),
        }
    }

    /// Literal types widened to their primitive (`"a"` → `string`), the way
    /// TypeScript widens an inferred return type.
    pub fn widen(self) -> Self {
        match self {
            InferredType::Literal(text) => {
                if text.starts_with('"') || text.starts_with('\'') || text.starts_with('`') {
                    InferredType::string()
                } else if text == "true" || text == "false" {
                    InferredType::boolean()
                } else if text.ends_with('n') {
                    InferredType::Primitive(Primitive::BigInt)
                } else {
                    InferredType::number()
                }
            }
            InferredType::Union(members) => {
                InferredType::union(members.into_iter().map(InferredType::widen))
            }
            other => other,
        }
    }

    /// Removes `null` and `undefined` from a union.
    pub fn non_nullable(self) -> Self {
        match self {
            InferredType::Union(members) => InferredType::union(
                members
                    .into_iter()
                    .filter(|m| !matches!(m, InferredType::Null | InferredType::Undefined)),
            ),
            InferredType::Null | InferredType::Undefined => InferredType::Never,
            other => other,
        }
    }

    /// Renders the type as TypeScript source text.
    pub fn render(&self, flags: RenderFlags) -> String {
        match self {
            InferredType::Any => "any".to_string(),
            InferredType::Unknown => "unknown".to_string(),
            InferredType::Void => "void".to_string(),
            InferredType::Never => "never".to_string(),
            InferredType::Null => "null".to_string(),
            InferredType::Undefined => "undefined".to_string(),
            InferredType::Primitive(p) => p.as_str().to_string(),
            InferredType::Literal(text) | InferredType::Text(text) => text.clone(),
            InferredType::Named { name, args } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<String> = args.iter().map(|a| a.render(flags)).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            InferredType::Array(element) => {
                let inner = element.render(flags);
                if flags.contains(RenderFlags::WRITE_ARRAY_AS_GENERIC) {
                    format!("Array<{inner}>")
                } else if element.needs_parens_in_postfix() {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            InferredType::Tuple { elements, readonly } => {
                let items: Vec<String> = elements.iter().map(|e| e.render(flags)).collect();
                let prefix = if *readonly { "readonly " } else { "" };
                format!("{prefix}[{}]", items.join(", "))
            }
            InferredType::Union(members) => members
                .iter()
                .map(|m| {
                    let text = m.render(flags);
                    if matches!(m, InferredType::Function { .. }) {
                        format!("({text})")
                    } else {
                        text
                    }
                })
                .collect::<Vec<_>>()
                .join(" | "),
            InferredType::Object(members) => render_object(members, flags),
            InferredType::Function { params, ret } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|p| {
                        format!(
                            "{}{}{}: {}",
                            if p.rest { "..." } else { "" },
                            p.name,
                            if p.optional { "?" } else { "" },
                            p.ty.render(flags)
                        )
                    })
                    .collect();
                format!("({}) => {}", params.join(", "), ret.render(flags))
            }
        }
    }

    fn needs_parens_in_postfix(&self) -> bool {
        match self {
            InferredType::Union(_) | InferredType::Function { .. } => true,
            InferredType::Text(text) => text.contains('|') || text.contains("=>") || text.contains('&'),
            InferredType::Tuple { readonly, .. } => *readonly,
            _ => false,
        }
    }
}

/// `"a" | string` → `string`; `true | false` → `boolean`.
fn reduce_literals(types: &mut Vec<InferredType>) {
    let has_true = types.contains(&InferredType::Literal("true".into()));
    let has_false = types.contains(&InferredType::Literal("false".into()));
    if has_true && has_false {
        if let Some(pos) = types
            .iter()
            .position(|t| matches!(t, InferredType::Literal(l) if l == "true" || l == "false"))
        {
            types[pos] = InferredType::boolean();
        }
    }
    let primitives: Vec<InferredType> = types
        .iter()
        .filter(|t| matches!(t, InferredType::Primitive(_)))
        .cloned()
        .collect();
    let mut seen = Vec::new();
    types.retain(|t| match t {
        InferredType::Literal(_) => !primitives.contains(&t.clone().widen()),
        InferredType::Primitive(_) => {
            // The boolean produced above may duplicate an existing one.
            if seen.contains(t) {
                false
            } else {
                seen.push(t.clone());
                true
            }
        }
        _ => true,
    });
}

fn render_object(members: &[Member], flags: RenderFlags) -> String {
    if members.is_empty() {
        return "{}".to_string();
    }
    let rendered: Vec<String> = members
        .iter()
        .map(|m| {
            format!(
                "{}{}{}: {};",
                if m.readonly { "readonly " } else { "" },
                render_property_key(&m.name),
                if m.optional { "?" } else { "" },
                m.ty.render(flags)
            )
        })
        .collect();

    let full = format!("{{ {} }}", rendered.join(" "));
    if flags.contains(RenderFlags::NO_TRUNCATION) || full.len() <= TRUNCATION_LENGTH || rendered.len() < 2 {
        return full;
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut len = 4;
    for member in &rendered {
        if len + member.len() + 1 > TRUNCATION_LENGTH && !kept.is_empty() {
            break;
        }
        len += member.len() + 1;
        kept.push(member);
    }
    let elided = rendered.len() - kept.len();
    format!("{{ {} ... {} more ...; }}", kept.join(" "), elided)
}

fn render_property_key(name: &str) -> String {
    let is_identifier = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    let is_numeric = !name.is_empty() && name.chars().all(|c| c.is_ascii_digit());
    if is_identifier || is_numeric {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Supplies inferred return types for function nodes.
///
/// Implementations must be shareable across worker threads: one oracle
/// instance serves every file of a run.
pub trait TypeOracle: Send + Sync {
    /// Infers the return type of `function` as if it carried no return
    /// annotation. `function` always belongs to `unit`'s tree.
    fn infer_return_type(
        &self,
        unit: &SourceUnit,
        function: Node<'_>,
    ) -> Result<InferredType, OracleError>;

    /// Renders a type previously returned by this oracle.
    fn render_type(&self, ty: &InferredType, flags: RenderFlags) -> String {
        ty.render(flags)
    }
}
