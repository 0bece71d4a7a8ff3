//! The inclusion filter chain.
//!
//! Each [`Filter`] inspects one [`Candidate`] against the run's
//! [`AnnotateOptions`] and either excludes it or lets it through. Filters
//! are pure: they read the syntax tree and the options, nothing else. The
//! chain evaluates them in registration order and the first exclusion wins.

pub mod rules;

use common::{AnnotateOptions, Exclusion};

use crate::candidate::Candidate;

/// One exclusion rule.
///
/// # Example
/// ```no_run
/// use anatomist::{AnnotateOptions, Candidate, Exclusion, Filter};
///
/// struct NoMain;
///
/// impl Filter for NoMain {
///     fn name(&self) -> &'static str {
///         "no-main"
///     }
///
///     fn apply(&self, candidate: &Candidate<'_>, _options: &AnnotateOptions) -> Option<Exclusion> {
///         (candidate.name() == Some("main")).then_some(Exclusion::IgnoredName)
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Short identifier used in debug logs.
    fn name(&self) -> &'static str;

    /// Returns `Some(reason)` to exclude the candidate.
    fn apply(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion>;
}

/// An ordered list of filters.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// A chain with no filters: every candidate passes.
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The standard chain, in evaluation order.
    ///
    /// `AlreadyAnnotated` sits ahead of every resolution step: with
    /// `overwrite` off, an annotated node never reaches the oracle.
    pub fn standard() -> Self {
        let mut chain = Self::empty();
        chain.register(Box::new(rules::KindFilter));
        chain.register(Box::new(rules::AlreadyAnnotatedFilter));
        chain.register(Box::new(rules::IgnoredNameFilter));
        chain.register(Box::new(rules::ExpressionFilter));
        chain.register(Box::new(rules::TypedExpressionFilter));
        chain.register(Box::new(rules::TypeParameterFilter));
        chain.register(Box::new(rules::HigherOrderFilter));
        chain.register(Box::new(rules::VoidArrowFilter));
        chain.register(Box::new(rules::ConstAssertionFilter));
        chain.register(Box::new(rules::IifeFilter));
        chain.register(Box::new(rules::AnonymousFilter));
        chain
    }

    /// Appends a filter. Filters run in registration order.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the chain; the first filter that excludes wins.
    pub fn evaluate(&self, candidate: &Candidate<'_>, options: &AnnotateOptions) -> Option<Exclusion> {
        self.filters.iter().find_map(|f| {
            let verdict = f.apply(candidate, options);
            if let Some(reason) = verdict {
                tracing::trace!(filter = f.name(), %reason, "candidate excluded");
            }
            verdict
        })
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}
