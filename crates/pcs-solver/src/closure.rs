//! Transitive dependency closures of single package versions.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use semver::Version;

use pcs_core::package::Package;
use pcs_core::version::VersionPolicy;
use pcs_registry::{PackageRepository, RegistryClient};

/// Everything one package version pulls in, itself included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependencyClosure {
    pub package: Package,
    pub dependencies: BTreeSet<Package>,
}

impl PackageDependencyClosure {
    pub fn contains(&self, package: &Package) -> bool {
        self.dependencies.contains(package)
    }

    /// Versions of `name` inside the closure. More than one is possible when
    /// different ranges select different versions.
    pub fn versions_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Version> + 'a {
        self.dependencies
            .iter()
            .filter(move |p| p.name == name)
            .map(|p| &p.version)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureOutcome {
    Resolved(Arc<PackageDependencyClosure>),
    /// Some part of the subtree could not be resolved: a fetch failed or no
    /// published version satisfies a range.
    Unresolved { package: Package, reason: String },
}

/// Computes and memoizes closures for one solver run.
///
/// Expansion is breadth-first. The metadata of every name needed by a level
/// is requested in one concurrent batch before the level is expanded.
pub struct ClosureResolver<'a, C> {
    repo: &'a PackageRepository<C>,
    policy: VersionPolicy,
    memo: HashMap<Package, ClosureOutcome>,
}

impl<'a, C: RegistryClient> ClosureResolver<'a, C> {
    pub fn new(repo: &'a PackageRepository<C>, policy: VersionPolicy) -> Self {
        Self {
            repo,
            policy,
            memo: HashMap::new(),
        }
    }

    pub async fn closure(&mut self, package: &Package) -> ClosureOutcome {
        if let Some(outcome) = self.memo.get(package) {
            return outcome.clone();
        }
        let outcome = match self.expand(package).await {
            Ok(dependencies) => ClosureOutcome::Resolved(Arc::new(PackageDependencyClosure {
                package: package.clone(),
                dependencies,
            })),
            Err(reason) => {
                tracing::debug!("closure of {package} unresolved: {reason}");
                ClosureOutcome::Unresolved {
                    package: package.clone(),
                    reason,
                }
            }
        };
        self.memo.insert(package.clone(), outcome.clone());
        outcome
    }

    async fn expand(&self, package: &Package) -> Result<BTreeSet<Package>, String> {
        let mut visited: HashSet<Package> = HashSet::from([package.clone()]);
        let mut frontier = vec![package.clone()];

        while !frontier.is_empty() {
            let infos = self
                .repo
                .get_multi_dependencies(frontier.iter().map(|p| p.name.as_str()))
                .await
                .map_err(|e| e.to_string())?;

            let mut requirements = Vec::new();
            for parent in &frontier {
                let deps = infos[parent.name.as_str()]
                    .dependencies_of(&parent.version)
                    .map_err(|e| e.to_string())?;
                for (name, range) in deps {
                    requirements.push((parent, name.clone(), range.clone()));
                }
            }

            let candidates = self
                .repo
                .get_multi_dependencies(requirements.iter().map(|(_, name, _)| name.as_str()))
                .await
                .map_err(|e| e.to_string())?;

            let mut next = Vec::new();
            for (parent, name, range) in requirements {
                let version = range
                    .select(self.policy, candidates[name.as_str()].versions())
                    .ok_or_else(|| {
                        format!("no version of `{name}` satisfies `{range}` (required by {parent})")
                    })?;
                let child = Package::new(name, version.clone());
                if visited.contains(&child) {
                    continue;
                }
                // a memoized closure already covers the child's whole subtree
                if let Some(ClosureOutcome::Resolved(known)) = self.memo.get(&child) {
                    visited.extend(known.dependencies.iter().cloned());
                    continue;
                }
                visited.insert(child.clone());
                next.push(child);
            }
            frontier = next;
        }

        Ok(visited.into_iter().collect())
    }
}
