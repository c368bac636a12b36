//! Client for the npm registry HTTP API.

use std::collections::BTreeMap;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use pcs_core::config::RegistryConfig;
use pcs_core::dependency::{Dependencies, PackageDependenciesInfo};
use pcs_core::package::parse_version;
use pcs_util::errors::{PcsError, PcsResult};

use crate::client::RegistryClient;

/// Abbreviated metadata only carries what install-time resolution needs.
const ABBREVIATED_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: IndexMap<String, PackumentVersion>,
}

#[derive(Debug, Deserialize)]
struct PackumentVersion {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Fetches package metadata from an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct NpmRegistryClient {
    client: Client,
    base_url: String,
}

impl NpmRegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PcsResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pcs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PcsError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RegistryConfig) -> PcsResult<Self> {
        Self::new(config.url.clone(), config.timeout())
    }

    /// Metadata URL for `name`. The scope separator of `@scope/name` is escaped.
    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.replace('/', "%2f"))
    }
}

impl RegistryClient for NpmRegistryClient {
    async fn fetch_package(&self, name: &str) -> PcsResult<PackageDependenciesInfo> {
        let url = self.package_url(name);
        tracing::debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, ABBREVIATED_METADATA)
            .send()
            .await
            .map_err(|e| PcsError::Network {
                message: format!("Request to {url} failed: {e}"),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PcsError::PackageNotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            let message = format!("HTTP {status} fetching {url}");
            // 429 and 5xx are worth another attempt, other statuses are not
            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    PcsError::Network { message }
                } else {
                    PcsError::Generic { message }
                },
            );
        }

        let body = resp.text().await.map_err(|e| PcsError::Network {
            message: format!("Failed to read response from {url}: {e}"),
        })?;
        parse_packument(name, &body)
    }
}

/// Convert a registry document into per-version dependency metadata.
///
/// Versions whose dependency map contains a range that is not semver (git
/// URLs, dist-tags, local paths) are left out with a warning.
pub fn parse_packument(name: &str, body: &str) -> PcsResult<PackageDependenciesInfo> {
    let doc: Packument = serde_json::from_str(body).map_err(|e| PcsError::Generic {
        message: format!("Invalid registry metadata for `{name}`: {e}"),
    })?;

    let mut info = PackageDependenciesInfo::new(name);
    for (raw_version, entry) in doc.versions {
        let version = parse_version(name, &raw_version)?;
        match Dependencies::parse(entry.dependencies) {
            Ok(deps) => info.insert(version, deps),
            Err(e) => tracing::warn!("skipping {name}@{version}: {e}"),
        }
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn scoped_names_are_escaped() {
        let client = NpmRegistryClient::new("https://registry.npmjs.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.package_url("@types/node"),
            "https://registry.npmjs.org/@types%2fnode"
        );
        assert_eq!(client.package_url("left-pad"), "https://registry.npmjs.org/left-pad");
    }

    #[test]
    fn packument_keeps_registry_order() {
        let body = r#"{
            "name": "pkg",
            "versions": {
                "1.0.0": {},
                "0.9.0": { "dependencies": { "a": "^1.0.0" } },
                "2.0.0": { "dependencies": { "b": "git+https://example.com/b.git" } }
            }
        }"#;
        let info = parse_packument("pkg", body).unwrap();
        let versions: Vec<String> = info.versions().map(Version::to_string).collect();
        assert_eq!(versions, vec!["1.0.0", "0.9.0"]);
        let deps = info.dependencies_of(&Version::new(0, 9, 0)).unwrap();
        assert!(deps.get("a").is_some());
    }

    #[test]
    fn malformed_version_is_fatal() {
        let body = r#"{ "versions": { "latest": {} } }"#;
        let err = parse_packument("pkg", body).unwrap_err();
        assert!(matches!(err, PcsError::InvalidVersion { .. }));
    }
}
