//! Version conflict detection over a logical dependency tree.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use semver::Version;

use pcs_core::package::Package;
use pcs_core::tree::LogicalTree;

/// One place a package was found in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub package: Package,
    /// Path from the project to the direct parent. Always starts with
    /// [`Package::root`].
    pub ancestors: Vec<Package>,
}

impl Occurrence {
    /// The direct dependency of the project that pulled this occurrence in,
    /// or the occurrence itself when it is a direct dependency.
    pub fn root_cause(&self) -> &Package {
        self.ancestors.get(1).unwrap_or(&self.package)
    }
}

/// A package name found at two or more distinct versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPackage {
    pub package_name: String,
    pub versions: BTreeMap<Version, Vec<Occurrence>>,
}

impl ConflictPackage {
    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.versions.values().flatten()
    }

    /// Root causes of every occurrence, first occurrence first, without repeats.
    pub fn root_causes(&self) -> Vec<Package> {
        let mut causes: Vec<Package> = Vec::new();
        for occurrence in self.occurrences() {
            let cause = occurrence.root_cause();
            if !causes.contains(cause) {
                causes.push(cause.clone());
            }
        }
        causes
    }

    /// Whether upgrading direct dependencies one by one can separate the
    /// occurrences. Two occurrences with the same root cause cannot be.
    pub fn is_user_solvable(&self) -> bool {
        let mut seen = HashSet::new();
        self.occurrences()
            .all(|o| seen.insert(o.root_cause().name.as_str()))
    }
}

/// Find every package name present at more than one version.
///
/// The tree is walked depth-first from each top-level dependency. A
/// `name@version` is expanded only the first time it is reached, which bounds
/// the walk on cyclic graphs and records one ancestor chain per version.
pub fn detect(tree: &LogicalTree) -> Vec<ConflictPackage> {
    let mut found: IndexMap<String, Vec<Occurrence>> = IndexMap::new();
    let mut visited: HashSet<Package> = HashSet::new();

    let root_chain = vec![Package::root()];
    let mut stack: Vec<_> = tree
        .top_level()
        .into_iter()
        .rev()
        .map(|idx| (idx, root_chain.clone()))
        .collect();

    while let Some((idx, ancestors)) = stack.pop() {
        let package = tree.node(idx).package();
        if !visited.insert(package.clone()) {
            continue;
        }

        let mut chain = ancestors.clone();
        chain.push(package.clone());
        for child in tree.dependencies_of(idx).into_iter().rev() {
            stack.push((child, chain.clone()));
        }

        found
            .entry(package.name.clone())
            .or_default()
            .push(Occurrence { package, ancestors });
    }

    let conflicts: Vec<ConflictPackage> = found
        .into_iter()
        .filter_map(|(name, occurrences)| {
            let mut versions: BTreeMap<Version, Vec<Occurrence>> = BTreeMap::new();
            for occurrence in occurrences {
                versions
                    .entry(occurrence.package.version.clone())
                    .or_default()
                    .push(occurrence);
            }
            (versions.len() > 1).then_some(ConflictPackage {
                package_name: name,
                versions,
            })
        })
        .collect();

    tracing::debug!(
        "{} packages visited, {} conflicts",
        visited.len(),
        conflicts.len()
    );
    conflicts
}

/// Every conflict in a project, printable as an indented report.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictPackage>,
}

impl ConflictReport {
    pub fn new(conflicts: Vec<ConflictPackage>) -> Self {
        Self { conflicts }
    }

    pub fn from_tree(tree: &LogicalTree) -> Self {
        Self::new(detect(tree))
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn get(&self, package_name: &str) -> Option<&ConflictPackage> {
        self.conflicts.iter().find(|c| c.package_name == package_name)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for conflict in &self.conflicts {
            write!(f, "{conflict}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConflictPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- {}", self.package_name)?;
        for (version, occurrences) in &self.versions {
            writeln!(f, "    {version}")?;
            for occurrence in occurrences {
                let chain = occurrence.ancestors.iter().chain([&occurrence.package]);
                for (depth, package) in chain.enumerate() {
                    let indent = " ".repeat(6 + depth * 2);
                    let marker = if depth == 0 { "" } else { "+- " };
                    writeln!(f, "{indent}{marker}{package}")?;
                }
            }
        }
        Ok(())
    }
}
