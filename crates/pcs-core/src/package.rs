//! Package identity: a name at one concrete semantic version.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use pcs_util::errors::{PcsError, PcsResult};

/// Name of the synthetic package standing for the project being analyzed.
pub const ROOT_PROJECT_NAME: &str = "#ROOT_PROJECT";

/// A package name at one concrete version. Equality is by `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Version,
}

impl Package {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse `version` strictly; malformed versions are fatal input errors.
    pub fn parse(name: &str, version: &str) -> PcsResult<Self> {
        let parsed = parse_version(name, version)?;
        Ok(Self::new(name, parsed))
    }

    /// The pseudo-package that heads every ancestor chain.
    pub fn root() -> Self {
        Self::new(ROOT_PROJECT_NAME, Version::new(0, 0, 0))
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_PROJECT_NAME
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Parse a semantic version, tolerating a leading `v` or `=` as npm does.
pub fn parse_version(name: &str, version: &str) -> PcsResult<Version> {
    let trimmed = version.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| PcsError::InvalidVersion {
        name: name.to_string(),
        version: version.to_string(),
        message: e.to_string(),
    })
}

/// One root-cause package's version before and after a proposed upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub before: Package,
    pub after: Package,
}

impl PackageUpdate {
    /// Whether the plan keeps this package at its current version.
    pub fn is_unchanged(&self) -> bool {
        self.before.version == self.after.version
    }
}

impl fmt::Display for PackageUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.before, self.after)
    }
}
