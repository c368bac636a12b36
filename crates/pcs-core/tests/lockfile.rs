use std::fs;

use pcs_core::lockfile::{load_project, parse_project};
use pcs_core::tree::LogicalTree;
use pcs_util::errors::PcsError;
use tempfile::TempDir;

const MANIFEST: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "dependencies": { "a": "^1.0.0", "b": "^1.0.0" },
  "devDependencies": { "jest": "^29.0.0" }
}"#;

const LOCK_V2: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "lockfileVersion": 2,
  "packages": {
    "": {
      "name": "demo",
      "version": "1.0.0",
      "dependencies": { "a": "^1.0.0", "b": "^1.0.0" },
      "devDependencies": { "jest": "^29.0.0" }
    },
    "node_modules/a": {
      "version": "1.2.0",
      "dependencies": { "shared": "^1.0.0" }
    },
    "node_modules/b": {
      "version": "1.0.0",
      "dependencies": { "shared": "^2.0.0" }
    },
    "node_modules/b/node_modules/shared": { "version": "2.1.0" },
    "node_modules/shared": { "version": "1.4.0" },
    "node_modules/jest": {
      "version": "29.7.0",
      "dev": true,
      "dependencies": { "shared": "^1.0.0" }
    }
  }
}"#;

const LOCK_V1: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "lockfileVersion": 1,
  "dependencies": {
    "a": {
      "version": "1.2.0",
      "requires": { "shared": "^1.0.0" }
    },
    "b": {
      "version": "1.0.0",
      "requires": { "shared": "^2.0.0" },
      "dependencies": {
        "shared": { "version": "2.1.0" }
      }
    },
    "shared": { "version": "1.4.0" },
    "jest": { "version": "29.7.0", "dev": true }
  }
}"#;

fn describe(tree: &LogicalTree) -> Vec<String> {
    let mut out = Vec::new();
    for top in tree.top_level() {
        let node = tree.node(top);
        let children: Vec<String> = tree
            .dependencies_of(top)
            .into_iter()
            .map(|c| tree.node(c).to_string())
            .collect();
        out.push(format!("{node} -> [{}]", children.join(", ")));
    }
    out
}

#[test]
fn v2_lockfile_resolves_nested_installs() {
    let tree = parse_project(MANIFEST, LOCK_V2, false).unwrap();
    assert_eq!(
        describe(&tree),
        vec![
            "a@1.2.0 -> [shared@1.4.0]",
            "b@1.0.0 -> [shared@2.1.0]",
        ]
    );
}

#[test]
fn v1_lockfile_matches_v2() {
    let v1 = parse_project(MANIFEST, LOCK_V1, false).unwrap();
    let v2 = parse_project(MANIFEST, LOCK_V2, false).unwrap();
    assert_eq!(describe(&v1), describe(&v2));
    assert_eq!(v1.len(), v2.len());
}

#[test]
fn include_dev_keeps_dev_dependencies() {
    let tree = parse_project(MANIFEST, LOCK_V2, true).unwrap();
    let top: Vec<String> = tree
        .top_level()
        .into_iter()
        .map(|i| tree.node(i).to_string())
        .collect();
    assert_eq!(top, vec!["a@1.2.0", "b@1.0.0", "jest@29.7.0"]);
    let jest = tree.top_level()[2];
    assert!(tree.node(jest).dev);
}

#[test]
fn shared_install_is_one_node() {
    let tree = parse_project(MANIFEST, LOCK_V2, true).unwrap();
    // root, a, b, b's shared, hoisted shared, jest
    assert_eq!(tree.len(), 6);
}

#[test]
fn load_project_reads_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("package.json"), MANIFEST).unwrap();
    fs::write(tmp.path().join("package-lock.json"), LOCK_V2).unwrap();

    let tree = load_project(tmp.path(), false).unwrap();
    assert_eq!(tree.top_level().len(), 2);
    assert_eq!(tree.node(tree.root()).name, "demo");
}

#[test]
fn missing_lockfile_is_lockfile_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("package.json"), MANIFEST).unwrap();

    let err = load_project(tmp.path(), false).unwrap_err();
    assert!(matches!(err, PcsError::Lockfile { .. }));
}

#[test]
fn malformed_version_is_fatal() {
    let lock = r#"{
      "lockfileVersion": 3,
      "packages": {
        "": { "dependencies": { "a": "*" } },
        "node_modules/a": { "version": "one.two" }
      }
    }"#;
    let err = parse_project(r#"{"dependencies": {"a": "*"}}"#, lock, false).unwrap_err();
    assert!(matches!(err, PcsError::InvalidVersion { .. }));
}

#[test]
fn git_installs_are_skipped() {
    let lock = r#"{
      "lockfileVersion": 1,
      "dependencies": {
        "a": { "version": "github:user/a#abc123" },
        "b": { "version": "1.0.0" }
      }
    }"#;
    let tree = parse_project(r#"{"dependencies": {"a": "*", "b": "*"}}"#, lock, false).unwrap();
    assert_eq!(tree.top_level().len(), 1);
}
