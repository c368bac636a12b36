//! Solver selection.

use std::fmt;
use std::str::FromStr;

use pcs_core::config::SolverConfig;
use pcs_core::package::Package;
use pcs_core::version::VersionPolicy;
use pcs_registry::{PackageRepository, RegistryClient};
use pcs_util::errors::{PcsError, PcsResult};

use crate::bruteforce::BruteForceSolver;
use crate::conflict::ConflictPackage;
use crate::sat::{Encoding, SatConflictSolver, SatMode};
use crate::situation::NoConflictSituation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SolverKind {
    BruteForce,
    #[default]
    SatLatest,
    SatRange,
}

impl SolverKind {
    /// Map the `bruteforce` / `search-in-range` switches onto a solver.
    /// Brute force has no range mode, so `bruteforce` wins.
    pub fn from_flags(bruteforce: bool, search_in_range: bool) -> Self {
        match (bruteforce, search_in_range) {
            (true, true) => {
                tracing::warn!("the brute-force solver does not search in range, ignoring");
                SolverKind::BruteForce
            }
            (true, false) => SolverKind::BruteForce,
            (false, true) => SolverKind::SatRange,
            (false, false) => SolverKind::SatLatest,
        }
    }

    fn sat_mode(self) -> Option<SatMode> {
        match self {
            SolverKind::BruteForce => None,
            SolverKind::SatLatest => Some(SatMode::Latest),
            SolverKind::SatRange => Some(SatMode::Range),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::BruteForce => f.write_str("bruteforce"),
            SolverKind::SatLatest => f.write_str("sat-latest"),
            SolverKind::SatRange => f.write_str("sat-range"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = PcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bruteforce" => Ok(SolverKind::BruteForce),
            "sat-latest" | "sat" => Ok(SolverKind::SatLatest),
            "sat-range" => Ok(SolverKind::SatRange),
            other => Err(PcsError::Config {
                message: format!("unknown solver `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOptions {
    pub kind: SolverKind,
    pub policy: VersionPolicy,
    /// Upper bound on situations from the SAT solvers. Brute force always
    /// reports every combination.
    pub max_solutions: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            kind: SolverKind::default(),
            policy: VersionPolicy::default(),
            max_solutions: 1,
        }
    }
}

impl From<&SolverConfig> for SolveOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            kind: SolverKind::from_flags(config.bruteforce, config.search_in_range),
            policy: config.policy,
            max_solutions: config.max_solutions,
        }
    }
}

/// Solves conflicts with the configured strategy against one repository.
pub struct ConflictSolver<'a, C> {
    repo: &'a PackageRepository<C>,
    options: SolveOptions,
}

impl<'a, C: RegistryClient> ConflictSolver<'a, C> {
    pub fn new(repo: &'a PackageRepository<C>, options: SolveOptions) -> Self {
        Self { repo, options }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// Upgrade plans for `causes` under which each name in `targets` has a
    /// single version. Empty when there is none.
    pub async fn solve(
        &self,
        causes: &[Package],
        targets: &[String],
    ) -> PcsResult<Vec<NoConflictSituation>> {
        tracing::debug!(
            "solving {} with {} over {} root causes",
            targets.join(", "),
            self.options.kind,
            causes.len()
        );
        match self.options.kind.sat_mode() {
            None => {
                BruteForceSolver::new(self.repo, self.options.policy)
                    .solve(causes, targets)
                    .await
            }
            Some(mode) => self.sat(mode).solve(causes, targets).await,
        }
    }

    /// Solve one detected conflict through its root causes.
    pub async fn solve_conflict(
        &self,
        conflict: &ConflictPackage,
    ) -> PcsResult<Vec<NoConflictSituation>> {
        let targets = [conflict.package_name.clone()];
        self.solve(&conflict.root_causes(), &targets).await
    }

    /// The SAT formula for a conflict, or `None` for the brute-force solver.
    pub async fn encode_conflict(&self, conflict: &ConflictPackage) -> PcsResult<Option<Encoding>> {
        let Some(mode) = self.options.kind.sat_mode() else {
            return Ok(None);
        };
        let targets = [conflict.package_name.clone()];
        let encoding = self.sat(mode).encode(&conflict.root_causes(), &targets).await?;
        Ok(Some(encoding))
    }

    fn sat(&self, mode: SatMode) -> SatConflictSolver<'a, C> {
        SatConflictSolver::new(self.repo, mode)
            .with_policy(self.options.policy)
            .with_max_solutions(self.options.max_solutions)
    }
}
