//! # The Oracle: Syntactic Return-Type Inference
//!
//! **Role**: Supplies the [`anatomist::TypeOracle`] the CLI runs with. Types
//! are read off the syntax of a single file: literals, operators, local
//! bindings and calls, plus a table of well-known globals.
//!
//! **Core Types**:
//! - `SyntacticOracle`: the oracle itself; cheap to share across workers.
//! - `AmbientTypes`: packages whose declarations are assumed installed,
//!   collected from `package.json` manifests up to the VCS root.
//!
//! **Design**:
//! - Never guesses. Anything the rules do not cover is reported as
//!   unresolved and the function is left untouched.
//! - Each request is independent; recursion and depth are tracked per call.

pub mod ambient;
pub mod builtins;
pub mod infer;
pub mod scope;

use std::path::Path;

use anatomist::{InferredType, OracleError, SourceUnit, TypeOracle};
use tracing::{debug, trace};
use tree_sitter::Node;

pub use ambient::{scan_dependencies, AmbientTypes};
pub use infer::Inference;

/// A [`TypeOracle`] that infers from syntax alone.
#[derive(Debug, Clone, Default)]
pub struct SyntacticOracle {
    ambient: AmbientTypes,
}

impl SyntacticOracle {
    pub fn new(ambient: AmbientTypes) -> Self {
        Self { ambient }
    }

    /// Builds an oracle whose ambient packages are read from the manifests
    /// between `root` and its VCS root.
    pub fn for_root(root: &Path) -> Self {
        let packages = scan_dependencies(root);
        debug!(root = %root.display(), packages = packages.len(), "ambient packages loaded");
        Self::new(AmbientTypes::new(packages))
    }

    pub fn ambient(&self) -> &AmbientTypes {
        &self.ambient
    }
}

impl TypeOracle for SyntacticOracle {
    fn infer_return_type(
        &self,
        unit: &SourceUnit,
        function: Node<'_>,
    ) -> Result<InferredType, OracleError> {
        let result = Inference::new(unit.bytes(), &self.ambient).function_return(function);
        if let Err(err) = &result {
            trace!(file = %unit.path().display(), line = function.start_position().row + 1, %err, "no type");
        }
        result
    }
}
