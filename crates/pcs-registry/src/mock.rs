//! An in-memory registry for tests and offline experiments.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use semver::Version;

use pcs_core::dependency::{Dependencies, PackageDependenciesInfo};
use pcs_core::package::parse_version;
use pcs_util::errors::{PcsError, PcsResult};

use crate::client::RegistryClient;

/// Name of the shared leaf package in [`MockRegistryClient::rotated`] registries.
pub const ROTATED_LEAF: &str = "dep";

/// Serves packages from memory, counts fetches, and can inject transient
/// failures.
#[derive(Debug, Default)]
pub struct MockRegistryClient {
    packages: HashMap<String, PackageDependenciesInfo>,
    failures: Mutex<HashMap<String, u32>>,
    fetches: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl MockRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `name@version` with the given `name -> range` dependencies.
    pub fn insert(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> PcsResult<()> {
        let version = parse_version(name, version)?;
        let deps = Dependencies::parse(deps.iter().copied())?;
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| PackageDependenciesInfo::new(name))
            .insert(version, deps);
        Ok(())
    }

    pub fn insert_info(&mut self, info: PackageDependenciesInfo) {
        self.packages.insert(info.name().to_string(), info);
    }

    /// Fail the next `count` fetches of `name` with a transient network error.
    pub fn with_failures(self, name: &str, count: u32) -> Self {
        lock(&self.failures).insert(name.to_string(), count);
        self
    }

    /// Sleep before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `name` was requested, failed attempts included.
    pub fn fetch_count(&self, name: &str) -> usize {
        lock(&self.fetches).get(name).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        lock(&self.fetches).values().sum()
    }

    /// A synthetic registry for solver experiments.
    ///
    /// The leaf package `dep` publishes `1.0.0..=versions.0.0` with no
    /// dependencies. Packages `"0"` to `packages - 1` publish the same
    /// versions, and version `j` of package `i` requires exactly
    /// `dep@((j + offsets[i]) mod versions) + 1`. Offsets repeat when there are
    /// fewer offsets than packages.
    pub fn rotated(packages: usize, versions: usize, offsets: &[usize]) -> PcsResult<Self> {
        Self::rotated_linked(packages, versions, offsets, &[])
    }

    /// [`rotated`](Self::rotated), plus edges between the numbered packages.
    ///
    /// For each `(from, to)` link, version `j` of `from` also requires exactly
    /// `to@((j + offsets[from] + 1) mod versions) + 1`. Links naming a package
    /// outside `0..packages`, or a package itself, are ignored.
    pub fn rotated_linked(
        packages: usize,
        versions: usize,
        offsets: &[usize],
        links: &[(usize, usize)],
    ) -> PcsResult<Self> {
        if versions == 0 {
            return Err(PcsError::Generic {
                message: "a rotated registry needs at least one version".to_string(),
            });
        }
        let releases: Vec<Version> = (1..=versions as u64).map(|m| Version::new(m, 0, 0)).collect();
        let mut registry = Self::new();

        let mut leaf = PackageDependenciesInfo::new(ROTATED_LEAF);
        for v in &releases {
            leaf.insert(v.clone(), Dependencies::new());
        }
        registry.insert_info(leaf);

        let offset_of = |i: usize| offsets.get(i % offsets.len().max(1)).copied().unwrap_or(0);
        for i in 0..packages {
            let name = i.to_string();
            let offset = offset_of(i);
            let mut info = PackageDependenciesInfo::new(name.as_str());
            for (j, v) in releases.iter().enumerate() {
                let mut requires = vec![(
                    ROTATED_LEAF.to_string(),
                    releases[(j + offset) % versions].to_string(),
                )];
                for &(_, to) in links
                    .iter()
                    .filter(|(from, to)| *from == i && *to != i && *to < packages)
                {
                    let required = &releases[(j + offset + 1) % versions];
                    requires.push((to.to_string(), required.to_string()));
                }
                info.insert(v.clone(), Dependencies::parse(requires)?);
            }
            registry.insert_info(info);
        }
        Ok(registry)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RegistryClient for MockRegistryClient {
    async fn fetch_package(&self, name: &str) -> PcsResult<PackageDependenciesInfo> {
        *lock(&self.fetches).entry(name.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = lock(&self.failures);
            if let Some(remaining) = failures.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PcsError::Network {
                        message: format!("injected failure fetching `{name}`"),
                    });
                }
            }
        }

        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| PcsError::PackageNotFound {
                name: name.to_string(),
            })
    }
}
