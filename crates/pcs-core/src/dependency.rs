//! Per-version dependency metadata as published by a registry.

use std::collections::btree_map;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use pcs_util::errors::{PcsError, PcsResult};

use crate::package::Package;
use crate::version::VersionRange;

/// The dependencies one published version declares: name to range, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dependencies(BTreeMap<String, VersionRange>);

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw `name -> range` pairs, failing on the first malformed range.
    pub fn parse<I, K, V>(raw: I) -> PcsResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut deps = Self::new();
        for (name, range) in raw {
            deps.insert(name, VersionRange::parse(range.as_ref())?);
        }
        Ok(deps)
    }

    pub fn insert(&mut self, name: impl Into<String>, range: VersionRange) {
        self.0.insert(name.into(), range);
    }

    pub fn get(&self, name: &str) -> Option<&VersionRange> {
        self.0.get(name)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, VersionRange> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dependencies {
    type Item = (&'a String, &'a VersionRange);
    type IntoIter = btree_map::Iter<'a, String, VersionRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Every published version of one package with that version's dependencies.
///
/// Versions keep the order the registry listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDependenciesInfo {
    name: String,
    versions: IndexMap<Version, Dependencies>,
}

impl PackageDependenciesInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, version: Version, dependencies: Dependencies) {
        self.versions.insert(version, dependencies);
    }

    /// Published versions in registry order.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.versions.keys()
    }

    pub fn get(&self, version: &Version) -> Option<&Dependencies> {
        self.versions.get(version)
    }

    /// Dependencies of one exact version; a missing version is an input error.
    pub fn dependencies_of(&self, version: &Version) -> PcsResult<&Dependencies> {
        self.versions
            .get(version)
            .ok_or_else(|| PcsError::VersionNotFound {
                name: self.name.clone(),
                version: version.to_string(),
            })
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.versions.contains_key(version)
    }

    /// Each published version as a [`Package`], in registry order.
    pub fn packages(&self) -> impl Iterator<Item = Package> + '_ {
        self.versions
            .keys()
            .map(|v| Package::new(self.name.clone(), v.clone()))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
