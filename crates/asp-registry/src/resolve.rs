// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selector-to-commit resolution.
//!
//! Maps `(id, selector)` pairs onto concrete commits using the registry's
//! tag conventions. Resolutions are cached for the lifetime of one resolver,
//! which orchestrators scope to a single call.

use asp_core::{CommitSha, ResolvedSelector, Selector, SelectorKind, SpaceId};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::debug;

use crate::git::GitRegistry;
use crate::RegistryError;

/// Resolves selectors against a [`GitRegistry`], memoizing per `(id,
/// selector)` pair.
#[derive(Debug)]
pub struct SelectorResolver<'r> {
    registry: &'r GitRegistry,
    cache: RefCell<BTreeMap<(String, String), ResolvedSelector>>,
}

impl<'r> SelectorResolver<'r> {
    /// Create a resolver over `registry`.
    #[must_use]
    pub fn new(registry: &'r GitRegistry) -> Self {
        Self {
            registry,
            cache: RefCell::new(BTreeMap::new()),
        }
    }

    /// The registry this resolver reads.
    #[must_use]
    pub fn registry(&self) -> &GitRegistry {
        self.registry
    }

    /// Pin `(id, selector_text)` to a prior resolution.
    ///
    /// Used by locked installs: every selector the old lock resolved keeps
    /// its pinned commit, while references the lock has never seen resolve
    /// fresh.
    pub fn preseed(&self, id: &str, selector_text: &str, resolved: ResolvedSelector) {
        self.cache
            .borrow_mut()
            .insert((id.to_owned(), selector_text.to_owned()), resolved);
    }

    /// Resolve `selector` for `id` to a pinned commit with provenance.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RefNotFound`] when nothing matches, and the
    /// underlying git errors for infrastructure failures.
    pub fn resolve(
        &self,
        id: &SpaceId,
        selector: &Selector,
    ) -> Result<ResolvedSelector, RegistryError> {
        let cache_key = (id.to_string(), selector.serialize());
        if let Some(hit) = self.cache.borrow().get(&cache_key) {
            return Ok(hit.clone());
        }

        let resolved = self.resolve_uncached(id, selector)?;
        debug!(
            id = %id,
            selector = %selector,
            commit = %resolved.commit,
            "resolved selector"
        );
        self.cache
            .borrow_mut()
            .insert(cache_key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(
        &self,
        id: &SpaceId,
        selector: &Selector,
    ) -> Result<ResolvedSelector, RegistryError> {
        match selector {
            Selector::Tag(tag) => self.resolve_tag(id, tag),
            Selector::SemverReq(_) => self.resolve_semver(id, selector),
            Selector::Branch(branch) => {
                let commit = self.registry.resolve_branch(branch).map_err(|_| {
                    RegistryError::RefNotFound {
                        id: id.to_string(),
                        selector: selector.serialize(),
                    }
                })?;
                Ok(ResolvedSelector {
                    kind: SelectorKind::Branch,
                    commit,
                    display: format!("branch/{branch}"),
                })
            }
            Selector::Commit(sha) => {
                let commit = self.registry.verify_commit(sha).map_err(|_| {
                    RegistryError::RefNotFound {
                        id: id.to_string(),
                        selector: selector.serialize(),
                    }
                })?;
                Ok(ResolvedSelector {
                    display: commit.to_string(),
                    kind: SelectorKind::Commit,
                    commit,
                })
            }
            Selector::Dev => {
                let dir = self.registry.space_dir(id.as_str());
                if !dir.is_dir() {
                    return Err(RegistryError::RefNotFound {
                        id: id.to_string(),
                        selector: "dev".into(),
                    });
                }
                Ok(ResolvedSelector {
                    kind: SelectorKind::Dev,
                    commit: CommitSha::dev(),
                    display: "dev".into(),
                })
            }
        }
    }

    /// Scoped `space/<id>/<tag>` lookup with bare-`<tag>` fallback.
    fn resolve_tag(&self, id: &SpaceId, tag: &str) -> Result<ResolvedSelector, RegistryError> {
        let scoped = format!("space/{id}/{tag}");
        if let Ok(commit) = self.registry.resolve_tag(&scoped) {
            return Ok(ResolvedSelector {
                kind: SelectorKind::Tag,
                commit,
                display: scoped,
            });
        }
        if let Ok(commit) = self.registry.resolve_tag(tag) {
            return Ok(ResolvedSelector {
                kind: SelectorKind::Tag,
                commit,
                display: tag.to_owned(),
            });
        }
        Err(RegistryError::RefNotFound {
            id: id.to_string(),
            selector: tag.to_owned(),
        })
    }

    /// Highest version among `space/<id>/v*` tags matching the requirement.
    fn resolve_semver(
        &self,
        id: &SpaceId,
        selector: &Selector,
    ) -> Result<ResolvedSelector, RegistryError> {
        let req = selector
            .version_req()
            .map_err(|_| RegistryError::RefNotFound {
                id: id.to_string(),
                selector: selector.serialize(),
            })?;

        let prefix = format!("space/{id}/v");
        let mut best: Option<(semver::Version, String)> = None;
        for tag in self.registry.list_tags()? {
            let Some(version_text) = tag.strip_prefix(&prefix) else {
                continue;
            };
            let Ok(version) = semver::Version::parse(version_text) else {
                continue;
            };
            if !req.matches(&version) {
                continue;
            }
            if best.as_ref().is_none_or(|(v, _)| version > *v) {
                best = Some((version, tag));
            }
        }

        let Some((version, tag)) = best else {
            return Err(RegistryError::RefNotFound {
                id: id.to_string(),
                selector: selector.serialize(),
            });
        };
        let commit = self.registry.resolve_tag(&tag)?;
        Ok(ResolvedSelector {
            kind: SelectorKind::Semver,
            commit,
            display: format!("{} -> v{version}", selector.serialize()),
        })
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// Scripted registry fixtures shared by the workspace's tests.
pub mod testing {
    use std::path::{Path, PathBuf};
    use std::process::Command;

    /// Builds a throwaway git registry by scripting `git` directly.
    #[derive(Debug)]
    pub struct RegistryFixture {
        root: PathBuf,
    }

    impl RegistryFixture {
        /// Initialize an empty registry repo at `root` (branch `main`).
        ///
        /// # Panics
        ///
        /// Panics when git is unavailable; fixtures are test-only.
        #[must_use]
        pub fn init(root: &Path) -> Self {
            let fx = Self {
                root: root.to_path_buf(),
            };
            fx.git(&["init", "-q", "-b", "main"]);
            fx.git(&["config", "user.name", "asp"]);
            fx.git(&["config", "user.email", "asp@local"]);
            fx
        }

        /// The registry root.
        #[must_use]
        pub fn root(&self) -> &Path {
            &self.root
        }

        /// Write `content` at `rel`, creating parent directories.
        pub fn write(&self, rel: &str, content: &str) {
            let path = self.root.join(rel);
            std::fs::create_dir_all(path.parent().expect("fixture path has a parent"))
                .expect("create fixture dirs");
            std::fs::write(path, content).expect("write fixture file");
        }

        /// Mark `rel` executable.
        #[cfg(unix)]
        pub fn make_executable(&self, rel: &str) {
            use std::os::unix::fs::PermissionsExt;
            let path = self.root.join(rel);
            let mut perms = std::fs::metadata(&path).expect("stat fixture file").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).expect("chmod fixture file");
        }

        /// Stage everything and commit, returning the new HEAD sha.
        pub fn commit(&self, message: &str) -> String {
            self.git(&["add", "-A"]);
            self.git(&["commit", "-qm", message]);
            self.head()
        }

        /// The current HEAD sha.
        #[must_use]
        pub fn head(&self) -> String {
            let out = Command::new("git")
                .args(["rev-parse", "HEAD"])
                .current_dir(&self.root)
                .output()
                .expect("run git rev-parse");
            String::from_utf8_lossy(&out.stdout).trim().to_owned()
        }

        /// Create a tag at HEAD.
        pub fn tag(&self, name: &str) {
            self.git(&["tag", name]);
        }

        /// Move an existing tag to HEAD.
        pub fn retag(&self, name: &str) {
            self.git(&["tag", "-f", name]);
        }

        /// Create a tag at a specific commit.
        pub fn tag_at(&self, name: &str, commit: &str) {
            self.git(&["tag", name, commit]);
        }

        fn git(&self, args: &[&str]) {
            let status = Command::new("git")
                .args(args)
                .current_dir(&self.root)
                .status()
                .expect("spawn git");
            assert!(status.success(), "git {args:?} failed");
        }
    }

    /// Script the standard two-space registry used across the test suite:
    /// `base` (v1.0.0, tagged stable) and `frontend` (v1.0.0 and v1.1.0,
    /// stable at v1.1.0, depending on `space:base@stable`).
    pub fn standard_registry(root: &Path) -> RegistryFixture {
        let fx = RegistryFixture::init(root);

        fx.write(
            "spaces/base/space.toml",
            "schema = 1\nid = \"base\"\nversion = \"1.0.0\"\n",
        );
        fx.write("spaces/base/AGENT.md", "# base\n\nShared conventions.\n");
        fx.write("spaces/base/commands/build.md", "Run the project build.\n");
        fx.commit("base v1.0.0");
        fx.tag("space/base/v1.0.0");
        fx.tag("space/base/stable");

        fx.write(
            "spaces/frontend/space.toml",
            concat!(
                "schema = 1\n",
                "id = \"frontend\"\n",
                "version = \"1.0.0\"\n\n",
                "[deps]\n",
                "spaces = [\"space:base@stable\"]\n",
            ),
        );
        fx.commit("frontend v1.0.0");
        fx.tag("space/frontend/v1.0.0");

        fx.write(
            "spaces/frontend/space.toml",
            concat!(
                "schema = 1\n",
                "id = \"frontend\"\n",
                "version = \"1.1.0\"\n\n",
                "[deps]\n",
                "spaces = [\"space:base@stable\"]\n",
            ),
        );
        fx.commit("frontend v1.1.0");
        fx.tag("space/frontend/v1.1.0");
        fx.tag("space/frontend/stable");

        fx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
