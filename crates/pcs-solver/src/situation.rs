use std::fmt;

use pcs_core::package::{Package, PackageUpdate};

/// One admissible upgrade plan for a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoConflictSituation {
    /// The single version each conflicting package resolves to.
    pub target_packages: Vec<Package>,
    /// Before/after version of every root-cause package.
    pub update_targets: Vec<PackageUpdate>,
}

impl NoConflictSituation {
    /// Root-cause packages that actually change version.
    pub fn upgrades(&self) -> impl Iterator<Item = &PackageUpdate> {
        self.update_targets.iter().filter(|u| !u.is_unchanged())
    }
}

impl fmt::Display for NoConflictSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<String> = self.target_packages.iter().map(Package::to_string).collect();
        writeln!(f, "{}", targets.join(", "))?;
        for update in &self.update_targets {
            writeln!(f, "  {update}")?;
        }
        Ok(())
    }
}
