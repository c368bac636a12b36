//! Exhaustive search over root-cause upgrade combinations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use semver::Version;

use pcs_core::package::{Package, PackageUpdate};
use pcs_core::version::VersionPolicy;
use pcs_registry::{PackageRepository, RegistryClient};
use pcs_util::errors::{PcsError, PcsResult};
use pcs_util::progress::progress_bar;

use crate::closure::{ClosureOutcome, ClosureResolver, PackageDependencyClosure};
use crate::situation::NoConflictSituation;

/// Keep the first package of each name.
pub(crate) fn dedupe_by_name(packages: &[Package]) -> Vec<Package> {
    let mut out: Vec<Package> = Vec::new();
    for package in packages {
        if !out.iter().any(|p| p.name == package.name) {
            out.push(package.clone());
        }
    }
    out
}

/// Candidate upgrades of one root cause, each with its closure.
struct CauseCandidates {
    before: Package,
    closures: Vec<Arc<PackageDependencyClosure>>,
}

/// Enumerates every combination of root-cause versions at or above their
/// current versions and keeps those under which each target name resolves
/// to a single version.
pub struct BruteForceSolver<'a, C> {
    repo: &'a PackageRepository<C>,
    policy: VersionPolicy,
}

impl<'a, C: RegistryClient> BruteForceSolver<'a, C> {
    pub fn new(repo: &'a PackageRepository<C>, policy: VersionPolicy) -> Self {
        Self { repo, policy }
    }

    /// Every consistent combination, in candidate discovery order.
    ///
    /// Any root-cause version whose dependencies cannot be resolved aborts the
    /// whole attempt.
    pub async fn solve(
        &self,
        causes: &[Package],
        targets: &[String],
    ) -> PcsResult<Vec<NoConflictSituation>> {
        let causes = dedupe_by_name(causes);
        if causes.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolver = ClosureResolver::new(self.repo, self.policy);
        let mut candidates = Vec::with_capacity(causes.len());
        for cause in causes {
            let versions: Vec<Version> = self
                .repo
                .get_versions(&cause.name)
                .await?
                .into_iter()
                .filter(|v| *v >= cause.version)
                .collect();

            let pb = progress_bar(versions.len() as u64, &format!("closures of {}", cause.name));
            let mut closures = Vec::with_capacity(versions.len());
            for version in versions {
                let candidate = Package::new(cause.name.clone(), version);
                match resolver.closure(&candidate).await {
                    ClosureOutcome::Resolved(closure) => closures.push(closure),
                    ClosureOutcome::Unresolved { package, reason } => {
                        pb.finish_and_clear();
                        return Err(PcsError::Resolution {
                            message: format!("cannot resolve dependencies of {package}: {reason}"),
                        });
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            tracing::debug!("{}: {} candidate versions", cause, closures.len());
            candidates.push(CauseCandidates {
                before: cause,
                closures,
            });
        }

        // targets and root causes may only ever take one version
        let strict: HashSet<&str> = targets
            .iter()
            .map(String::as_str)
            .chain(candidates.iter().map(|c| c.before.name.as_str()))
            .collect();
        let mut search = Search {
            candidates: &candidates,
            targets,
            strict,
            chosen: Vec::with_capacity(candidates.len()),
            found: Vec::new(),
        };
        search.descend(&HashMap::new());
        tracing::debug!("brute force found {} situations", search.found.len());
        Ok(search.found)
    }
}

/// Versions each package name is pinned to by the closures chosen so far.
type Pins<'s> = HashMap<&'s str, Vec<&'s Version>>;

struct Search<'s> {
    candidates: &'s [CauseCandidates],
    targets: &'s [String],
    strict: HashSet<&'s str>,
    chosen: Vec<&'s PackageDependencyClosure>,
    found: Vec<NoConflictSituation>,
}

impl<'s> Search<'s> {
    fn descend(&mut self, pinned: &Pins<'s>) {
        let candidates = self.candidates;
        let Some(cause) = candidates.get(self.chosen.len()) else {
            self.emit();
            return;
        };
        for closure in &cause.closures {
            let closure = closure.as_ref();
            let Some(next) = pin(pinned, closure, &self.strict) else {
                continue;
            };
            self.chosen.push(closure);
            self.descend(&next);
            self.chosen.pop();
        }
    }

    fn emit(&mut self) {
        // revalidate the complete assignment from scratch
        let chosen = self.chosen.clone();
        let mut pinned = Pins::new();
        for closure in chosen {
            match pin(&pinned, closure, &self.strict) {
                Some(next) => pinned = next,
                None => return,
            }
        }

        let target_packages = self
            .targets
            .iter()
            .filter_map(|name| {
                pinned
                    .get(name.as_str())
                    .and_then(|versions| versions.first())
                    .map(|version| Package::new(name.clone(), (*version).clone()))
            })
            .collect();
        let update_targets = self
            .candidates
            .iter()
            .zip(&self.chosen)
            .map(|(cause, closure)| PackageUpdate {
                before: cause.before.clone(),
                after: closure.package.clone(),
            })
            .collect();
        self.found.push(NoConflictSituation {
            target_packages,
            update_targets,
        });
    }
}

/// Extend `pinned` with every name in `closure`, or `None` if the closure
/// disagrees with an earlier one on the versions of a shared name. A `strict`
/// name must also have a single version inside the closure.
fn pin<'s>(
    pinned: &Pins<'s>,
    closure: &'s PackageDependencyClosure,
    strict: &HashSet<&'s str>,
) -> Option<Pins<'s>> {
    let mut next = pinned.clone();
    for (name, versions) in versions_by_name(closure) {
        if versions.len() > 1 && strict.contains(name) {
            return None;
        }
        match next.get(name) {
            Some(existing) if *existing != versions => return None,
            Some(_) => {}
            None => {
                next.insert(name, versions);
            }
        }
    }
    Some(next)
}

/// The closure's packages grouped by name, versions ascending.
fn versions_by_name(closure: &PackageDependencyClosure) -> Vec<(&str, Vec<&Version>)> {
    let mut grouped: Vec<(&str, Vec<&Version>)> = Vec::new();
    for package in &closure.dependencies {
        match grouped.last_mut() {
            Some((name, versions)) if *name == package.name => versions.push(&package.version),
            _ => grouped.push((package.name.as_str(), vec![&package.version])),
        }
    }
    grouped
}
