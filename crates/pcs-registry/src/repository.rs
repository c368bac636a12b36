//! The package repository the solvers query.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use indexmap::IndexMap;
use semver::Version;
use tokio::sync::Semaphore;

use pcs_core::config::RegistryConfig;
use pcs_core::dependency::{Dependencies, PackageDependenciesInfo};
use pcs_core::package::Package;
use pcs_util::errors::{PcsError, PcsResult};

use crate::cache::PackageCache;
use crate::client::RegistryClient;

const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// How transient fetch failures are retried: a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Fail on the first error.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.retries, config.retry_delay())
    }
}

/// Cached, retrying access to a [`RegistryClient`].
///
/// The cache lives as long as the repository, so one repository should be
/// shared by everything that solves within a run.
#[derive(Debug)]
pub struct PackageRepository<C> {
    client: C,
    cache: PackageCache,
    retry: RetryPolicy,
    fetch_limit: Semaphore,
}

impl<C: RegistryClient> PackageRepository<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            cache: PackageCache::new(),
            retry: RetryPolicy::default(),
            fetch_limit: Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES),
        }
    }

    pub fn from_config(client: C, config: &RegistryConfig) -> Self {
        Self::new(client)
            .with_retry(RetryPolicy::from_config(config))
            .with_max_concurrent_fetches(config.max_concurrent_fetches)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.fetch_limit = Semaphore::new(max.max(1));
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Every published version of `name` with its dependencies.
    pub async fn get_dependencies(&self, name: &str) -> PcsResult<Arc<PackageDependenciesInfo>> {
        self.cache
            .get_or_fetch(name, || self.fetch_with_retry(name))
            .await
    }

    /// Published versions of `name`, in registry order.
    pub async fn get_versions(&self, name: &str) -> PcsResult<Vec<Version>> {
        let info = self.get_dependencies(name).await?;
        Ok(info.versions().cloned().collect())
    }

    /// Metadata for several names, fetched concurrently.
    ///
    /// The result is keyed in the order the names were first given. Any
    /// failure fails the whole call.
    pub async fn get_multi_dependencies<I, S>(
        &self,
        names: I,
    ) -> PcsResult<IndexMap<String, Arc<PackageDependenciesInfo>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }

        let infos = try_join_all(unique.iter().map(|name| self.get_dependencies(name))).await?;
        Ok(unique.into_iter().zip(infos).collect())
    }

    /// Dependencies declared by one exact package version.
    pub async fn dependencies_of(&self, package: &Package) -> PcsResult<Dependencies> {
        let info = self.get_dependencies(&package.name).await?;
        info.dependencies_of(&package.version).cloned()
    }

    async fn fetch_with_retry(&self, name: &str) -> PcsResult<PackageDependenciesInfo> {
        let _permit = self
            .fetch_limit
            .acquire()
            .await
            .map_err(|e| PcsError::Generic {
                message: format!("fetch limiter closed: {e}"),
            })?;
        let mut attempt = 0;
        loop {
            match self.client.fetch_package(name).await {
                Ok(info) => {
                    tracing::debug!("fetched {} versions of `{name}`", info.len());
                    return Ok(info);
                }
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    tracing::debug!(
                        "fetching `{name}` failed ({e}), retry {attempt}/{}",
                        self.retry.retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(PcsError::Network {
                        message: format!(
                            "Failed after {} retries for `{name}`: {e}",
                            self.retry.retries
                        ),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
