//! SAT encoding of conflict resolution.
//!
//! Every `name@version` becomes a variable. The formula says:
//!
//! * each target name takes exactly one version,
//! * each root cause takes one version at or above its current one, and no
//!   other version of it may be pulled in elsewhere,
//! * a selected version implies its dependencies (`¬p ∨ child`), where the
//!   child is the policy's pick for the range (latest mode) or any satisfying
//!   version (range mode),
//! * a version whose dependencies cannot be resolved is never selected.
//!
//! A model maps back to one [`NoConflictSituation`].

use std::collections::{HashSet, VecDeque};

use semver::Version;

use pcs_core::package::{Package, PackageUpdate};
use pcs_core::version::VersionPolicy;
use pcs_registry::{PackageRepository, RegistryClient};
use pcs_util::errors::PcsResult;
use pcs_util::progress::progress_bar;

use crate::bruteforce::dedupe_by_name;
use crate::cnf::{at_least_one, at_most_one, or, Clause, Cnf, Literal, Variable};
use crate::engine::{Model, SatEngine, SatOutcome};
use crate::situation::NoConflictSituation;

/// How a dependency range is turned into a clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SatMode {
    /// Only the version the policy selects may satisfy a range.
    #[default]
    Latest,
    /// Any version satisfying the range may be chosen.
    Range,
}

/// A formula plus what is needed to read a model back.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub cnf: Cnf,
    targets: Vec<String>,
    causes: Vec<(Package, Vec<Package>)>,
}

impl Encoding {
    /// Variables of the root causes' candidate versions.
    fn cause_variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.causes
            .iter()
            .flat_map(|(_, candidates)| candidates.iter().map(Variable::package))
    }

    fn decode(&self, model: &Model) -> PcsResult<Option<NoConflictSituation>> {
        let mut target_packages = Vec::new();
        for variable in model.true_variables() {
            let package = variable.to_package()?;
            if self.targets.contains(&package.name) {
                target_packages.push(package);
            }
        }
        target_packages.sort();

        let mut update_targets = Vec::with_capacity(self.causes.len());
        for (before, candidates) in &self.causes {
            let Some(after) = candidates
                .iter()
                .find(|c| model.is_true(&Variable::package(c)))
            else {
                return Ok(None);
            };
            update_targets.push(PackageUpdate {
                before: before.clone(),
                after: after.clone(),
            });
        }
        Ok(Some(NoConflictSituation {
            target_packages,
            update_targets,
        }))
    }
}

pub struct SatConflictSolver<'a, C> {
    repo: &'a PackageRepository<C>,
    mode: SatMode,
    policy: VersionPolicy,
    max_solutions: usize,
}

impl<'a, C: RegistryClient> SatConflictSolver<'a, C> {
    pub fn new(repo: &'a PackageRepository<C>, mode: SatMode) -> Self {
        Self {
            repo,
            mode,
            policy: VersionPolicy::Latest,
            max_solutions: 1,
        }
    }

    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enumerate up to `max` models, each differing in at least one root-cause version.
    pub fn with_max_solutions(mut self, max: usize) -> Self {
        self.max_solutions = max.max(1);
        self
    }

    /// Build the formula for resolving `targets` by upgrading `causes`.
    pub async fn encode(&self, causes: &[Package], targets: &[String]) -> PcsResult<Encoding> {
        let mut cnf = Cnf::new();

        for target in targets {
            let vars: Vec<Variable> = self
                .repo
                .get_versions(target)
                .await?
                .iter()
                .map(|v| Variable::package(&Package::new(target.clone(), v.clone())))
                .collect();
            cnf.extend(at_most_one(&vars));
            cnf.push(at_least_one(&vars));
        }

        let mut encoded: HashSet<Package> = HashSet::new();
        let mut cause_candidates = Vec::new();
        for cause in dedupe_by_name(causes) {
            let published: Vec<Package> = self
                .repo
                .get_versions(&cause.name)
                .await?
                .into_iter()
                .map(|v| Package::new(cause.name.clone(), v))
                .collect();
            let all: Vec<Variable> = published.iter().map(Variable::package).collect();
            cnf.extend(at_most_one(&all));

            let candidates: Vec<Package> = published
                .into_iter()
                .filter(|p| p.version >= cause.version)
                .collect();
            let vars: Vec<Variable> = candidates.iter().map(Variable::package).collect();
            cnf.push(at_least_one(&vars));

            let pb = progress_bar(candidates.len() as u64, &format!("encoding {}", cause.name));
            for candidate in &candidates {
                self.expand(candidate, &mut encoded, &mut cnf).await;
                pb.inc(1);
            }
            pb.finish_and_clear();
            cause_candidates.push((cause, candidates));
        }

        tracing::debug!(
            "encoded {} packages into {} clauses",
            encoded.len(),
            cnf.len()
        );
        Ok(Encoding {
            cnf,
            targets: targets.to_vec(),
            causes: cause_candidates,
        })
    }

    /// Add the implication clauses of `start` and everything reachable from it.
    async fn expand(&self, start: &Package, encoded: &mut HashSet<Package>, cnf: &mut Cnf) {
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(package) = queue.pop_front() {
            if !encoded.insert(package.clone()) {
                continue;
            }
            let var = Variable::package(&package);
            match self.dependency_clauses(&package, &var).await {
                Ok((clauses, children)) => {
                    cnf.extend(clauses);
                    queue.extend(children.into_iter().filter(|c| !encoded.contains(c)));
                }
                Err(reason) => {
                    tracing::debug!("{package} is unusable: {reason}");
                    cnf.push(Clause::unit(!var));
                }
            }
        }
    }

    /// Implication clauses for one package's direct dependencies, plus the
    /// child versions they mention.
    async fn dependency_clauses(
        &self,
        package: &Package,
        var: &Variable,
    ) -> Result<(Vec<Clause>, Vec<Package>), String> {
        let deps = self
            .repo
            .dependencies_of(package)
            .await
            .map_err(|e| e.to_string())?;
        let infos = self
            .repo
            .get_multi_dependencies(deps.names())
            .await
            .map_err(|e| e.to_string())?;

        let mut clauses = Vec::with_capacity(deps.len());
        let mut children = Vec::new();
        for (name, range) in &deps {
            let versions = infos[name.as_str()].versions();
            let chosen: Vec<&Version> = match self.mode {
                SatMode::Latest => range.select(self.policy, versions).into_iter().collect(),
                SatMode::Range => versions.filter(|v| range.matches(v)).collect(),
            };
            if chosen.is_empty() {
                return Err(format!("no version of `{name}` satisfies `{range}`"));
            }

            let mut literals: Vec<Literal> = vec![!var.clone()];
            for version in chosen {
                let child = Package::new(name.clone(), version.clone());
                literals.push(Variable::package(&child).into());
                children.push(child);
            }
            clauses.push(or(literals));
        }
        Ok((clauses, children))
    }

    /// Encode and solve. An empty result means no upgrade resolves the conflict.
    pub async fn solve(
        &self,
        causes: &[Package],
        targets: &[String],
    ) -> PcsResult<Vec<NoConflictSituation>> {
        let encoding = self.encode(causes, targets).await?;
        let mut engine = SatEngine::new(&encoding.cnf);
        let mut situations = Vec::new();

        while situations.len() < self.max_solutions {
            let model = match engine.solve()? {
                SatOutcome::Satisfiable(model) => model,
                SatOutcome::Unsatisfiable => break,
            };
            let Some(situation) = encoding.decode(&model)? else {
                break;
            };

            // the next model must move at least one root cause
            let chosen: Vec<Literal> = encoding
                .cause_variables()
                .filter(|v| model.is_true(v))
                .map(|v| !v)
                .collect();
            situations.push(situation);
            if chosen.is_empty() {
                break;
            }
            engine.add_clause(&or(chosen));
        }

        tracing::debug!("SAT solver found {} situations", situations.len());
        Ok(situations)
    }
}
