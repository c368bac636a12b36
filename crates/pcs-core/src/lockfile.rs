//! Build a [`LogicalTree`] from `package.json` and `package-lock.json`.
//!
//! Both lockfile layouts are supported: the nested `dependencies` object of
//! lockfileVersion 1 and the flat, path-keyed `packages` object written by
//! npm 7 and later. Either way the lockfile is first flattened into install
//! paths (`node_modules/a/node_modules/b`) and every requirement is then
//! resolved the way node resolves `require()`: the nearest enclosing
//! `node_modules` directory that contains the package wins.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

use petgraph::graph::NodeIndex;
use semver::Version;
use serde::Deserialize;

use pcs_util::errors::{PcsError, PcsResult};

use crate::package::parse_version;
use crate::tree::{LogicalTree, TreeNode};

pub const MANIFEST_FILE: &str = "package.json";
pub const LOCKFILE_FILE: &str = "package-lock.json";

const NODE_MODULES: &str = "node_modules/";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Lockfile {
    #[serde(default)]
    lockfile_version: u32,
    #[serde(default)]
    packages: BTreeMap<String, LockEntry>,
    #[serde(default)]
    dependencies: BTreeMap<String, LegacyEntry>,
}

/// An entry of the lockfileVersion 2/3 `packages` map.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockEntry {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    dev_optional: bool,
    #[serde(default)]
    in_bundle: bool,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
}

/// An entry of the lockfileVersion 1 nested `dependencies` map.
#[derive(Debug, Default, Deserialize)]
struct LegacyEntry {
    version: String,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    bundled: bool,
    #[serde(default)]
    requires: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, LegacyEntry>,
}

/// One installed package, keyed by its install path.
#[derive(Debug)]
struct Installed {
    name: String,
    version: String,
    dev: bool,
    optional: bool,
    bundled: bool,
    requires: Vec<String>,
}

/// Load the project in `dir`. Unless `include_dev` is set, the returned tree
/// only contains production nodes.
pub fn load_project(dir: &Path, include_dev: bool) -> PcsResult<LogicalTree> {
    let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;
    let lockfile: Lockfile = read_json(&dir.join(LOCKFILE_FILE))?;
    let tree = build_tree(manifest, lockfile)?;
    Ok(if include_dev { tree } else { tree.production() })
}

/// Parse a manifest and lockfile from strings.
pub fn parse_project(manifest: &str, lockfile: &str, include_dev: bool) -> PcsResult<LogicalTree> {
    let manifest: Manifest = serde_json::from_str(manifest).map_err(|e| PcsError::Lockfile {
        message: format!("invalid {MANIFEST_FILE}: {e}"),
    })?;
    let lockfile: Lockfile = serde_json::from_str(lockfile).map_err(|e| PcsError::Lockfile {
        message: format!("invalid {LOCKFILE_FILE}: {e}"),
    })?;
    let tree = build_tree(manifest, lockfile)?;
    Ok(if include_dev { tree } else { tree.production() })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PcsResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| PcsError::Lockfile {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    serde_json::from_str(&content).map_err(|e| PcsError::Lockfile {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

fn build_tree(manifest: Manifest, lockfile: Lockfile) -> PcsResult<LogicalTree> {
    let installed = if lockfile.packages.is_empty() {
        tracing::debug!(
            "reading nested lockfile (lockfileVersion {})",
            lockfile.lockfile_version
        );
        flatten_legacy(lockfile.dependencies)
    } else {
        tracing::debug!(
            "reading flat lockfile (lockfileVersion {})",
            lockfile.lockfile_version
        );
        flatten_packages(lockfile.packages)
    };

    let project_name = manifest.name.clone().unwrap_or_else(|| "root".to_string());
    let project_version = match &manifest.version {
        Some(v) => parse_version(&project_name, v)?,
        None => Version::new(0, 0, 0),
    };
    let mut tree = LogicalTree::new(project_name, project_version);

    let root_requires: Vec<String> = manifest
        .dependencies
        .keys()
        .chain(manifest.optional_dependencies.keys())
        .chain(manifest.dev_dependencies.keys())
        .cloned()
        .collect();

    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    let mut queue: VecDeque<(String, NodeIndex, Vec<String>)> = VecDeque::new();
    queue.push_back((String::new(), tree.root(), root_requires));

    while let Some((path, parent, requires)) = queue.pop_front() {
        for name in requires {
            let Some(child_path) = resolve(&installed, &path, &name) else {
                tracing::debug!("`{name}` required from `{path}` is not installed, skipping");
                continue;
            };
            let child = match nodes.get(&child_path) {
                Some(&idx) => idx,
                None => {
                    let Some(entry) = installed.get(&child_path) else {
                        continue;
                    };
                    let Some(node) = tree_node(entry)? else {
                        continue;
                    };
                    let idx = tree.add_node(node);
                    nodes.insert(child_path.clone(), idx);
                    queue.push_back((child_path, idx, entry.requires.clone()));
                    idx
                }
            };
            tree.add_dependency(parent, child);
        }
    }

    tracing::debug!("logical tree has {} nodes", tree.len());
    Ok(tree)
}

fn tree_node(entry: &Installed) -> PcsResult<Option<TreeNode>> {
    // git, file and tarball installs carry a specifier instead of a version
    if entry.version.contains(':') {
        tracing::warn!(
            "skipping `{}`: non-registry version `{}`",
            entry.name,
            entry.version
        );
        return Ok(None);
    }
    let version = parse_version(&entry.name, &entry.version)?;
    Ok(Some(TreeNode {
        name: entry.name.clone(),
        version,
        dev: entry.dev,
        optional: entry.optional,
        bundled: entry.bundled,
    }))
}

/// Find the install path `name` resolves to when required from `from`.
fn resolve(installed: &BTreeMap<String, Installed>, from: &str, name: &str) -> Option<String> {
    let mut base = from.to_string();
    loop {
        let candidate = if base.is_empty() {
            format!("{NODE_MODULES}{name}")
        } else {
            format!("{base}/{NODE_MODULES}{name}")
        };
        if installed.contains_key(&candidate) {
            return Some(candidate);
        }
        if base.is_empty() {
            return None;
        }
        base = parent_path(&base).to_string();
    }
}

/// `node_modules/a/node_modules/b` -> `node_modules/a`, `node_modules/a` -> ``.
fn parent_path(path: &str) -> &str {
    match path.rfind(NODE_MODULES) {
        Some(idx) => path[..idx].trim_end_matches('/'),
        None => "",
    }
}

fn name_from_path(path: &str) -> &str {
    match path.rfind(NODE_MODULES) {
        Some(idx) => &path[idx + NODE_MODULES.len()..],
        None => path,
    }
}

fn flatten_packages(packages: BTreeMap<String, LockEntry>) -> BTreeMap<String, Installed> {
    let mut out = BTreeMap::new();
    for (path, entry) in packages {
        if path.is_empty() {
            continue;
        }
        if entry.link {
            tracing::debug!("skipping linked package at `{path}`");
            continue;
        }
        let Some(version) = entry.version else {
            tracing::debug!("skipping `{path}`: no version");
            continue;
        };
        let name = entry
            .name
            .unwrap_or_else(|| name_from_path(&path).to_string());
        let requires = entry
            .dependencies
            .into_keys()
            .chain(entry.optional_dependencies.into_keys())
            .collect();
        out.insert(
            path,
            Installed {
                name,
                version,
                dev: entry.dev || entry.dev_optional,
                optional: entry.optional,
                bundled: entry.in_bundle,
                requires,
            },
        );
    }
    out
}

fn flatten_legacy(dependencies: BTreeMap<String, LegacyEntry>) -> BTreeMap<String, Installed> {
    let mut out = BTreeMap::new();
    let mut stack: Vec<(String, BTreeMap<String, LegacyEntry>)> = vec![(String::new(), dependencies)];
    while let Some((prefix, deps)) = stack.pop() {
        for (name, entry) in deps {
            let path = if prefix.is_empty() {
                format!("{NODE_MODULES}{name}")
            } else {
                format!("{prefix}/{NODE_MODULES}{name}")
            };
            if !entry.dependencies.is_empty() {
                stack.push((path.clone(), entry.dependencies));
            }
            out.insert(
                path,
                Installed {
                    name,
                    version: entry.version,
                    dev: entry.dev,
                    optional: entry.optional,
                    bundled: entry.bundled,
                    requires: entry.requires.into_keys().collect(),
                },
            );
        }
    }
    out
}
