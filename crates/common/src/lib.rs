pub mod options;

pub use options::AnnotateOptions;

/// Reason why a candidate function was left without a new return-type annotation.
///
/// The first filter in the chain to produce an `Exclusion` wins; the shape
/// exclusions (`AnonymousObject`, `AnyType`, `UnknownType`) can only be produced
/// after the return type has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Exclusion {
    /// Class constructors never carry a return type.
    Constructor = 0,
    /// `set` accessors cannot carry a return type.
    Setter = 1,
    /// An explicit return type is already present and `overwrite` is off.
    AlreadyAnnotated = 2,
    /// The declared name is listed in `ignore_functions`.
    IgnoredName = 3,
    /// Function expression or arrow function with `ignore_expressions`.
    Expression = 4,
    /// Expression assigned to a variable that already has a type annotation.
    TypedExpression = 5,
    /// No generic type parameters with `ignore_functions_without_type_parameters`.
    NoTypeParameters = 6,
    /// The body only returns another function.
    HigherOrder = 7,
    /// Arrow whose concise body is a `void` expression.
    VoidArrow = 8,
    /// Arrow whose concise body is an `as const` assertion.
    ConstAssertion = 9,
    /// Immediately invoked function expression.
    Iife = 10,
    /// Function without a name or a named binding.
    Anonymous = 11,
    /// Resolved type is an inline object literal type.
    AnonymousObject = 12,
    /// Resolved type is `any`.
    AnyType = 13,
    /// Resolved type is `unknown`.
    UnknownType = 14,
    /// The oracle could not produce a type.
    Unresolved = 15,
    /// `overwrite` resolved the same annotation that is already present.
    Unchanged = 16,
}

impl Exclusion {
    /// Short kebab-case label used in log lines and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::Constructor => "constructor",
            Exclusion::Setter => "setter",
            Exclusion::AlreadyAnnotated => "already-annotated",
            Exclusion::IgnoredName => "ignored-name",
            Exclusion::Expression => "expression",
            Exclusion::TypedExpression => "typed-expression",
            Exclusion::NoTypeParameters => "no-type-parameters",
            Exclusion::HigherOrder => "higher-order",
            Exclusion::VoidArrow => "void-arrow",
            Exclusion::ConstAssertion => "const-assertion",
            Exclusion::Iife => "iife",
            Exclusion::Anonymous => "anonymous",
            Exclusion::AnonymousObject => "anonymous-object",
            Exclusion::AnyType => "any",
            Exclusion::UnknownType => "unknown",
            Exclusion::Unresolved => "unresolved",
            Exclusion::Unchanged => "unchanged",
        }
    }

    /// Returns `true` for exclusions decided from the resolved type text.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            Exclusion::AnonymousObject | Exclusion::AnyType | Exclusion::UnknownType
        )
    }
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running the filter chain and return-type resolution on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Leave the node untouched.
    Skip(Exclusion),
    /// Write `: <type text>` as the node's return type.
    Annotate(String),
}

impl Decision {
    pub fn is_annotate(&self) -> bool {
        matches!(self, Decision::Annotate(_))
    }
}
