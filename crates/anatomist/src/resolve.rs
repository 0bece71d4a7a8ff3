//! Return-type resolution: from a candidate that passed the filter chain to
//! the exact text that will follow the `:`.
//!
//! Two strategies, tried in order:
//! 1. **Passthrough**: a function that only returns one of its own typed
//!    parameters gets that parameter's declared type, verbatim.
//! 2. **Oracle**: anything else is inferred by the [`TypeOracle`] and
//!    rendered without truncation.
//!
//! The shape exclusions and the overwrite no-op check run on the resolved text.

use common::{AnnotateOptions, Decision, Exclusion};

use crate::candidate::Candidate;
use crate::filters::FilterChain;
use crate::parser::SourceUnit;
use crate::shape::shape_exclusion;
use crate::syntax::{type_annotation_text, unwrap_parens};
use crate::types::{OracleError, RenderFlags, TypeOracle};

/// Declared type of the parameter a trivially-returning function hands back.
///
/// Applies when the body is `return <ident>;` or a concise arrow returning
/// `<ident>`, and `<ident>` names a parameter with a written type. Optional
/// parameters are excluded (their type widens with `undefined`) and so are
/// generators. Async functions get the type wrapped in `Promise<…>`.
pub fn passthrough_type(candidate: &Candidate<'_>) -> Option<String> {
    if candidate.is_generator() {
        return None;
    }
    let returned = candidate
        .sole_return_expression()
        .or_else(|| candidate.concise_body())
        .map(unwrap_parens)?;
    if returned.kind() != "identifier" {
        return None;
    }
    let ident = candidate.text(returned);
    let param = candidate
        .parameters()
        .into_iter()
        .find(|p| p.name == Some(ident))?;
    if param.is_optional {
        return None;
    }
    let declared = param.declared_type?;
    if candidate.is_async() && !declared.starts_with("Promise<") {
        Some(format!("Promise<{declared}>"))
    } else {
        Some(declared.to_string())
    }
}

/// Runs the filter chain, resolves the return type and applies the shape
/// exclusions.
///
/// `Err` only carries oracle failures; the caller decides whether to log
/// them as a skip or as a diagnostic.
pub fn decide(
    candidate: &Candidate<'_>,
    unit: &SourceUnit,
    oracle: &dyn TypeOracle,
    chain: &FilterChain,
    options: &AnnotateOptions,
) -> Result<Decision, OracleError> {
    if let Some(reason) = chain.evaluate(candidate, options) {
        return Ok(Decision::Skip(reason));
    }

    let text = match passthrough_type(candidate) {
        Some(text) => text,
        None => {
            let ty = oracle.infer_return_type(unit, candidate.node())?;
            oracle.render_type(&ty, RenderFlags::NO_TRUNCATION)
        }
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(OracleError::Unresolved(candidate.label()));
    }

    if let Some(reason) = shape_exclusion(&text, options) {
        return Ok(Decision::Skip(reason));
    }

    // Only reachable with `overwrite`: the chain stops annotated nodes otherwise.
    if let Some(existing) = candidate.return_type() {
        if type_annotation_text(existing, candidate.source()) == text {
            return Ok(Decision::Skip(Exclusion::Unchanged));
        }
    }

    Ok(Decision::Annotate(text))
}
