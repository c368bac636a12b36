use std::time::Duration;

use futures_util::future::join_all;
use semver::Version;

use pcs_core::package::Package;
use pcs_registry::{MockRegistryClient, PackageRepository, RetryPolicy};
use pcs_util::errors::PcsError;

fn registry() -> MockRegistryClient {
    let mut registry = MockRegistryClient::new();
    registry.insert("a", "1.0.0", &[("b", "^1.0.0")]).unwrap();
    registry.insert("a", "2.0.0", &[("b", "^2.0.0")]).unwrap();
    registry.insert("b", "1.0.0", &[]).unwrap();
    registry.insert("b", "2.0.0", &[]).unwrap();
    registry.insert("c", "0.1.0", &[]).unwrap();
    registry
}

fn fast_retry(retries: u32) -> RetryPolicy {
    RetryPolicy::new(retries, Duration::from_millis(1))
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let repo = PackageRepository::new(registry().with_delay(Duration::from_millis(20)));

    let results = join_all((0..10).map(|_| repo.get_dependencies("a"))).await;
    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    assert_eq!(repo.client().fetch_count("a"), 1);
}

#[tokio::test]
async fn versions_keep_publish_order() {
    let repo = PackageRepository::new(registry());
    let versions = repo.get_versions("a").await.unwrap();
    assert_eq!(versions, vec![Version::new(1, 0, 0), Version::new(2, 0, 0)]);
}

#[tokio::test]
async fn multi_dependencies_dedupes_and_keeps_order() {
    let repo = PackageRepository::new(registry());
    let infos = repo
        .get_multi_dependencies(["c", "a", "c", "b"])
        .await
        .unwrap();
    let names: Vec<&str> = infos.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
    assert_eq!(repo.client().fetch_count("c"), 1);
}

#[tokio::test]
async fn multi_dependencies_fails_on_unknown_name() {
    let repo = PackageRepository::new(registry());
    let err = repo.get_multi_dependencies(["a", "ghost"]).await.unwrap_err();
    assert!(matches!(err, PcsError::PackageNotFound { ref name } if name == "ghost"));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let repo = PackageRepository::new(registry().with_failures("a", 2)).with_retry(fast_retry(5));
    let info = repo.get_dependencies("a").await.unwrap();
    assert_eq!(info.len(), 2);
    assert_eq!(repo.client().fetch_count("a"), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_network_error() {
    let repo = PackageRepository::new(registry().with_failures("a", 10)).with_retry(fast_retry(2));
    let err = repo.get_dependencies("a").await.unwrap_err();
    assert!(err.is_transient());
    assert!(err.to_string().contains("Failed after 2 retries"));
    assert_eq!(repo.client().fetch_count("a"), 3);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let repo = PackageRepository::new(registry()).with_retry(fast_retry(5));
    let err = repo.get_dependencies("ghost").await.unwrap_err();
    assert!(matches!(err, PcsError::PackageNotFound { .. }));
    assert_eq!(repo.client().fetch_count("ghost"), 1);
}

#[tokio::test]
async fn dependencies_of_exact_version() {
    let repo = PackageRepository::new(registry());
    let deps = repo
        .dependencies_of(&Package::new("a", Version::new(2, 0, 0)))
        .await
        .unwrap();
    assert!(deps.get("b").unwrap().matches(&Version::new(2, 3, 0)));

    let err = repo
        .dependencies_of(&Package::new("a", Version::new(3, 0, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, PcsError::VersionNotFound { .. }));
}
