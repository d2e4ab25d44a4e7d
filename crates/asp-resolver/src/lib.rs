// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-resolver
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Depth-first closure walking over declared space dependencies.

use asp_core::{CommitSha, RefError, ResolvedSelector, SpaceId, SpaceKey, SpaceRef};
use asp_manifest::{ManifestError, SpaceManifest};
use asp_registry::{GitRegistry, RegistryError, SelectorResolver};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while walking a closure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolverError {
    /// The dependency graph contains a cycle.
    #[error("cyclic dependency: {}", cycle.iter().map(SpaceKey::as_str).collect::<Vec<_>>().join(" -> "))]
    CyclicDependency {
        /// Keys from the cycle's entry back to itself.
        cycle: Vec<SpaceKey>,
    },

    /// A declared dependency could not be resolved.
    #[error("missing dependency '{reference}' of '{parent}': {source_message}")]
    MissingDependency {
        /// Id of the space that declared the dependency.
        parent: String,
        /// The dependency reference as written.
        reference: String,
        /// The underlying resolution failure.
        source_message: String,
    },

    /// Registry access or selector resolution failed for a root reference.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A manifest failed to parse or validate.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A reference failed to parse.
    #[error(transparent)]
    Ref(#[from] RefError),
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

/// One resolved node of a closure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosureNode {
    /// The pinned key.
    pub key: SpaceKey,
    /// The space id.
    pub id: SpaceId,
    /// The pinned commit (or `dev`).
    pub commit: CommitSha,
    /// Path of the space inside the registry, e.g. `spaces/base`.
    pub path: String,
    /// The manifest read at the pinned commit.
    pub manifest: SpaceManifest,
    /// How the selector resolved.
    pub resolved_from: ResolvedSelector,
    /// The selector text that was resolved.
    pub selector_text: String,
    /// Pinned keys of the declared dependencies, in declared order.
    pub deps: Vec<SpaceKey>,
}

/// The transitive dependency set of a compose list, in postorder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Closure {
    /// Keys of the compose roots, in compose order.
    pub roots: Vec<SpaceKey>,
    /// Topological postorder: every node's deps appear before the node.
    pub load_order: Vec<SpaceKey>,
    /// Node records, keyed by pinned key.
    pub nodes: BTreeMap<SpaceKey, ClosureNode>,
}

impl Closure {
    /// Nodes in load order.
    #[must_use]
    pub fn ordered_nodes(&self) -> Vec<&ClosureNode> {
        self.load_order
            .iter()
            .filter_map(|k| self.nodes.get(k))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Walk the transitive closure of `compose` against the registry.
///
/// Traversal is depth-first in declared order; shared sub-spaces are
/// deduplicated by pinned key, so the result is a DAG and `load_order` is
/// uniquely determined by the registry state and the manifests.
///
/// # Errors
///
/// [`ResolverError::CyclicDependency`] on cycles,
/// [`ResolverError::MissingDependency`] when a declared dependency fails to
/// resolve, and the underlying registry/manifest errors for root failures.
pub fn walk_closure(
    resolver: &SelectorResolver<'_>,
    compose: &[SpaceRef],
) -> Result<Closure, ResolverError> {
    let mut walker = Walker {
        resolver,
        closure: Closure::default(),
        visiting: BTreeSet::new(),
        stack: Vec::new(),
    };

    for reference in compose {
        let key = walker.visit(reference)?;
        if !walker.closure.roots.contains(&key) {
            walker.closure.roots.push(key);
        }
    }

    debug!(
        roots = walker.closure.roots.len(),
        spaces = walker.closure.load_order.len(),
        "walked closure"
    );
    Ok(walker.closure)
}

struct Walker<'a, 'r> {
    resolver: &'a SelectorResolver<'r>,
    closure: Closure,
    visiting: BTreeSet<SpaceKey>,
    stack: Vec<SpaceKey>,
}

impl Walker<'_, '_> {
    fn visit(&mut self, reference: &SpaceRef) -> Result<SpaceKey, ResolverError> {
        let resolved = self.resolver.resolve(&reference.id, &reference.selector)?;
        let key = SpaceKey::new(&reference.id, &resolved.commit);

        if self.closure.nodes.contains_key(&key) {
            return Ok(key);
        }
        if self.visiting.contains(&key) {
            let entry = self
                .stack
                .iter()
                .position(|k| *k == key)
                .unwrap_or_default();
            let mut cycle: Vec<SpaceKey> = self.stack[entry..].to_vec();
            cycle.push(key);
            return Err(ResolverError::CyclicDependency { cycle });
        }

        self.visiting.insert(key.clone());
        self.stack.push(key.clone());

        let result = self.visit_pinned(reference, &resolved, &key);

        self.stack.pop();
        self.visiting.remove(&key);

        result?;
        Ok(key)
    }

    fn visit_pinned(
        &mut self,
        reference: &SpaceRef,
        resolved: &ResolvedSelector,
        key: &SpaceKey,
    ) -> Result<(), ResolverError> {
        let manifest = self.read_manifest(&reference.id, &resolved.commit)?;
        let mut deps = Vec::new();

        for dep_ref in manifest.space_refs() {
            let dep_key = self.visit(&dep_ref).map_err(|e| match e {
                cycle @ ResolverError::CyclicDependency { .. } => cycle,
                missing @ ResolverError::MissingDependency { .. } => missing,
                other => ResolverError::MissingDependency {
                    parent: reference.id.to_string(),
                    reference: dep_ref.serialize(),
                    source_message: other.to_string(),
                },
            })?;
            if !deps.contains(&dep_key) {
                deps.push(dep_key);
            }
        }

        self.closure.load_order.push(key.clone());
        self.closure.nodes.insert(
            key.clone(),
            ClosureNode {
                key: key.clone(),
                id: reference.id.clone(),
                commit: resolved.commit.clone(),
                path: GitRegistry::space_path(reference.id.as_str()),
                manifest,
                resolved_from: resolved.clone(),
                selector_text: reference.selector.serialize(),
                deps,
            },
        );
        Ok(())
    }

    fn read_manifest(
        &self,
        id: &SpaceId,
        commit: &CommitSha,
    ) -> Result<SpaceManifest, ResolverError> {
        let registry = self.resolver.registry();
        let manifest_path = format!("{}/space.toml", GitRegistry::space_path(id.as_str()));

        let manifest = if commit.is_dev() {
            SpaceManifest::load(&registry.space_dir(id.as_str()).join("space.toml"))?
        } else {
            let bytes = registry.read_blob(commit.as_str(), &manifest_path)?;
            let content =
                String::from_utf8(bytes).map_err(|e| ManifestError::Parse {
                    path: manifest_path.clone(),
                    reason: format!("manifest is not UTF-8: {e}"),
                })?;
            SpaceManifest::parse(&content, &manifest_path)?
        };

        if manifest.id != id.as_str() {
            return Err(ManifestError::Validation {
                path: manifest_path,
                issues: vec![format!(
                    "id: manifest declares '{}' but the space directory is '{id}'",
                    manifest.id
                )],
            }
            .into());
        }
        Ok(manifest)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
