//! Protocol transform specs and scoped selection.
//!
//! A transform spec is an opaque list of rewrite rules consumed by downstream
//! obfuscation layers; the engine only selects one by scope and attaches a
//! seed. Scopes partition specs by context: the empty scope [`SCOPE_ANY`]
//! matches everywhere, other scopes are keyed by fronting provider ID or dial
//! port as the call site requires.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The catch-all scope.
pub const SCOPE_ANY: &str = "";

/// One rewrite rule list. Opaque to the dial engine.
pub type TransformSpec = Vec<[String; 2]>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformSpecs(pub HashMap<String, TransformSpec>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopedSpecNames(pub HashMap<String, Vec<String>>);

impl TransformSpecs {
    /// Select a named spec for the given scope.
    ///
    /// The scoped-name table maps a scope to candidate spec names; when the
    /// scope has no entry, the [`SCOPE_ANY`] entry applies. A uniform choice
    /// is made among candidates that name a known spec. Returns `None` when
    /// nothing is eligible.
    pub fn select(&self, scope: &str, scoped: &ScopedSpecNames) -> Option<(String, TransformSpec)> {
        let names = scoped
            .0
            .get(scope)
            .or_else(|| scoped.0.get(SCOPE_ANY))?;

        let candidates: Vec<&String> = names.iter().filter(|n| self.0.contains_key(*n)).collect();
        if candidates.is_empty() {
            return None;
        }

        let name = candidates[pl_prng::intn(candidates.len())];
        Some((name.clone(), self.0[name].clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A selected transform: spec plus the fresh seed that parameterizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerParameters {
    pub transform_name: String,
    pub transform_spec: TransformSpec,
    pub transform_seed: pl_prng::Seed,
}
