use semver::Version;

use pcs_core::package::Package;
use pcs_core::tree::{LogicalTree, TreeNode};
use pcs_core::version::VersionPolicy;
use pcs_registry::{MockRegistryClient, PackageRepository, RetryPolicy};
use pcs_solver::bruteforce::BruteForceSolver;
use pcs_solver::sat::{SatConflictSolver, SatMode};
use pcs_solver::{detect, ConflictSolver, SolveOptions, SolverKind};
use pcs_util::errors::PcsError;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn pkg(name: &str, version: &str) -> Package {
    Package::new(name, v(version))
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// `dep0..dep5` at `1.0.0..6.0.0`; every `dep3` needs `dep4@^1`, and
/// `dep4@1.0.0` needs `dep0@^2`.
fn six_deps_registry() -> MockRegistryClient {
    let mut registry = MockRegistryClient::new();
    for i in 0..6 {
        let name = format!("dep{i}");
        for major in 1..=6 {
            let version = format!("{major}.0.0");
            let deps: &[(&str, &str)] = match (i, major) {
                (3, _) => &[("dep4", "^1.0.0")],
                (4, 1) => &[("dep0", "^2.0.0")],
                _ => &[],
            };
            registry.insert(&name, &version, deps).unwrap();
        }
    }
    registry
}

/// root -> dep0@1.0.0, root -> dep3@1.0.0 -> dep4@1.0.0 -> dep0@2.0.0
fn six_deps_tree() -> LogicalTree {
    let mut tree = LogicalTree::new("root", v("1.0.0"));
    let dep0 = tree.add_node(TreeNode::new("dep0", v("1.0.0")));
    let dep3 = tree.add_node(TreeNode::new("dep3", v("1.0.0")));
    let dep4 = tree.add_node(TreeNode::new("dep4", v("1.0.0")));
    let dep0_2 = tree.add_node(TreeNode::new("dep0", v("2.0.0")));
    tree.add_dependency(tree.root(), dep0);
    tree.add_dependency(tree.root(), dep3);
    tree.add_dependency(dep3, dep4);
    tree.add_dependency(dep4, dep0_2);
    tree
}

fn options(kind: SolverKind) -> SolveOptions {
    SolveOptions {
        kind,
        ..SolveOptions::default()
    }
}

#[tokio::test]
async fn upgrade_of_direct_requirement_resolves_conflict() {
    let conflicts = detect(&six_deps_tree());
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.package_name, "dep0");
    assert_eq!(
        conflict.root_causes(),
        vec![pkg("dep0", "1.0.0"), pkg("dep3", "1.0.0")]
    );

    let repo = PackageRepository::new(six_deps_registry());
    for kind in [SolverKind::BruteForce, SolverKind::SatLatest, SolverKind::SatRange] {
        let situations = ConflictSolver::new(&repo, options(kind))
            .solve_conflict(conflict)
            .await
            .unwrap();
        assert!(!situations.is_empty(), "{kind} found nothing");
        for situation in &situations {
            assert_eq!(situation.target_packages, vec![pkg("dep0", "2.0.0")], "{kind}");
            assert_eq!(situation.update_targets[0].after, pkg("dep0", "2.0.0"));
        }
    }
}

#[tokio::test]
async fn bruteforce_reports_every_combination_once() {
    let repo = PackageRepository::new(six_deps_registry());
    let causes = [pkg("dep0", "1.0.0"), pkg("dep3", "1.0.0")];
    let situations = BruteForceSolver::new(&repo, VersionPolicy::Latest)
        .solve(&causes, &targets(&["dep0"]))
        .await
        .unwrap();

    let mut dep3_versions: Vec<String> = situations
        .iter()
        .map(|s| s.update_targets[1].after.version.to_string())
        .collect();
    assert_eq!(dep3_versions.len(), 6);
    dep3_versions.dedup();
    assert_eq!(dep3_versions.len(), 6);
}

#[tokio::test]
async fn sat_enumerates_distinct_models() {
    let repo = PackageRepository::new(six_deps_registry());
    let causes = [pkg("dep0", "1.0.0"), pkg("dep3", "1.0.0")];
    let situations = SatConflictSolver::new(&repo, SatMode::Latest)
        .with_max_solutions(100)
        .solve(&causes, &targets(&["dep0"]))
        .await
        .unwrap();
    assert_eq!(situations.len(), 6);

    let mut plans: Vec<String> = situations
        .iter()
        .map(|s| s.update_targets[1].after.to_string())
        .collect();
    plans.sort();
    plans.dedup();
    assert_eq!(plans.len(), 6);
}

/// a@1.0.0 needs t@^1 and b@1.0.0 needs t@^2; neither has another release.
fn split_registry() -> MockRegistryClient {
    let mut registry = MockRegistryClient::new();
    registry.insert("a", "1.0.0", &[("t", "^1.0.0")]).unwrap();
    registry.insert("b", "1.0.0", &[("t", "^2.0.0")]).unwrap();
    registry.insert("t", "1.0.0", &[]).unwrap();
    registry.insert("t", "2.0.0", &[]).unwrap();
    registry
}

#[tokio::test]
async fn unsatisfiable_conflict_gives_empty_result() {
    let repo = PackageRepository::new(split_registry());
    let causes = [pkg("a", "1.0.0"), pkg("b", "1.0.0")];
    for kind in [SolverKind::BruteForce, SolverKind::SatLatest, SolverKind::SatRange] {
        let situations = ConflictSolver::new(&repo, options(kind))
            .solve(&causes, &targets(&["t"]))
            .await
            .unwrap();
        assert!(situations.is_empty(), "{kind}");
    }
}

#[tokio::test]
async fn sat_routes_around_unresolvable_version() {
    let mut registry = split_registry();
    registry.insert("a", "2.0.0", &[("ghost", "^1.0.0")]).unwrap();
    registry.insert("a", "3.0.0", &[("t", "^2.0.0")]).unwrap();
    let repo = PackageRepository::new(registry).with_retry(RetryPolicy::none());
    let causes = [pkg("a", "1.0.0"), pkg("b", "1.0.0")];

    let situations = SatConflictSolver::new(&repo, SatMode::Latest)
        .solve(&causes, &targets(&["t"]))
        .await
        .unwrap();
    assert_eq!(situations.len(), 1);
    assert_eq!(situations[0].target_packages, vec![pkg("t", "2.0.0")]);
    assert_eq!(situations[0].update_targets[0].after, pkg("a", "3.0.0"));
    assert!(situations[0].update_targets[1].is_unchanged());

    let err = BruteForceSolver::new(&repo, VersionPolicy::Latest)
        .solve(&causes, &targets(&["t"]))
        .await
        .unwrap_err();
    assert!(matches!(err, PcsError::Resolution { .. }));
}

#[tokio::test]
async fn range_mode_finds_what_latest_mode_misses() {
    let mut registry = MockRegistryClient::new();
    registry.insert("a", "1.0.0", &[("t", ">=1.0.0")]).unwrap();
    registry.insert("b", "1.0.0", &[("t", "^1.0.0")]).unwrap();
    for version in ["1.0.0", "2.0.0", "3.0.0"] {
        registry.insert("t", version, &[]).unwrap();
    }
    let repo = PackageRepository::new(registry);
    let causes = [pkg("a", "1.0.0"), pkg("b", "1.0.0")];
    let t = targets(&["t"]);

    let latest = SatConflictSolver::new(&repo, SatMode::Latest)
        .solve(&causes, &t)
        .await
        .unwrap();
    assert!(latest.is_empty());

    let range = SatConflictSolver::new(&repo, SatMode::Range)
        .solve(&causes, &t)
        .await
        .unwrap();
    assert_eq!(range.len(), 1);
    assert_eq!(range[0].target_packages, vec![pkg("t", "1.0.0")]);
}

#[tokio::test]
async fn encoding_is_stable_on_warm_cache() {
    let repo = PackageRepository::new(six_deps_registry());
    let solver = SatConflictSolver::new(&repo, SatMode::Latest);
    let causes = [pkg("dep0", "1.0.0"), pkg("dep3", "1.0.0")];
    let t = targets(&["dep0"]);

    let first = solver.encode(&causes, &t).await.unwrap();
    let fetches = repo.client().total_fetches();
    let second = solver.encode(&causes, &t).await.unwrap();

    assert_eq!(first.cnf, second.cnf);
    assert_eq!(first.cnf.to_dimacs(), second.cnf.to_dimacs());
    assert_eq!(repo.client().total_fetches(), fetches);
}

#[tokio::test]
async fn duplicate_causes_are_solved_once() {
    let repo = PackageRepository::new(six_deps_registry());
    let causes = [
        pkg("dep3", "1.0.0"),
        pkg("dep3", "4.0.0"),
        pkg("dep0", "1.0.0"),
    ];
    let situations = SatConflictSolver::new(&repo, SatMode::Latest)
        .solve(&causes, &targets(&["dep0"]))
        .await
        .unwrap();
    assert_eq!(situations.len(), 1);
    let befores: Vec<String> = situations[0]
        .update_targets
        .iter()
        .map(|u| u.before.to_string())
        .collect();
    assert_eq!(befores, vec!["dep3@1.0.0", "dep0@1.0.0"]);
}

/// a@1.0.0 pins b@^1 while b itself is a root cause with a 2.0.0 release.
fn cause_pins_cause_registry() -> MockRegistryClient {
    let mut registry = MockRegistryClient::new();
    registry
        .insert("a", "1.0.0", &[("b", "^1.0.0"), ("t", "^1.0.0")])
        .unwrap();
    registry.insert("b", "1.0.0", &[("t", "^1.0.0")]).unwrap();
    registry.insert("b", "2.0.0", &[("t", "^1.0.0")]).unwrap();
    registry.insert("t", "1.0.0", &[]).unwrap();
    registry
}

#[tokio::test]
async fn upgrade_contradicting_another_cause_is_rejected() {
    let repo = PackageRepository::new(cause_pins_cause_registry());
    let causes = [pkg("a", "1.0.0"), pkg("b", "1.0.0")];
    let t = targets(&["t"]);

    let brute = BruteForceSolver::new(&repo, VersionPolicy::Latest)
        .solve(&causes, &t)
        .await
        .unwrap();
    assert_eq!(brute.len(), 1);
    assert_eq!(brute[0].target_packages, vec![pkg("t", "1.0.0")]);
    assert!(brute[0].update_targets.iter().all(|u| u.is_unchanged()));

    let sat = SatConflictSolver::new(&repo, SatMode::Latest)
        .with_max_solutions(10)
        .solve(&causes, &t)
        .await
        .unwrap();
    assert_eq!(sat, brute);
}

#[tokio::test]
async fn cause_pinned_below_its_current_version_is_unsolvable() {
    let repo = PackageRepository::new(cause_pins_cause_registry());
    let causes = [pkg("a", "1.0.0"), pkg("b", "2.0.0")];
    let t = targets(&["t"]);

    for kind in [SolverKind::BruteForce, SolverKind::SatLatest, SolverKind::SatRange] {
        let situations = ConflictSolver::new(&repo, options(kind))
            .solve(&causes, &t)
            .await
            .unwrap();
        assert!(situations.is_empty(), "{kind}");
    }
}
