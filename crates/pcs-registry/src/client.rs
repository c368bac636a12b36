use std::future::Future;

use pcs_core::dependency::PackageDependenciesInfo;
use pcs_util::errors::PcsResult;

/// A source of package metadata.
///
/// Implementations perform exactly one fetch per call. Caching and retries are
/// layered on top by [`PackageRepository`](crate::repository::PackageRepository).
/// An unknown name must fail with `PcsError::PackageNotFound`; failures worth
/// retrying must be `PcsError::Network`.
pub trait RegistryClient: Send + Sync {
    fn fetch_package(
        &self,
        name: &str,
    ) -> impl Future<Output = PcsResult<PackageDependenciesInfo>> + Send;
}
