use semver::Version;

use pcs_core::lockfile::parse_project;
use pcs_core::package::Package;
use pcs_core::tree::{LogicalTree, TreeNode};
use pcs_solver::{detect, ConflictReport};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

#[test]
fn same_version_everywhere_is_not_a_conflict() {
    let mut tree = LogicalTree::new("app", v("1.0.0"));
    let a = tree.add_node(TreeNode::new("a", v("1.0.0")));
    let b = tree.add_node(TreeNode::new("b", v("1.0.0")));
    // two installs of the same version at different paths
    let shared_under_a = tree.add_node(TreeNode::new("shared", v("1.2.0")));
    let shared_under_b = tree.add_node(TreeNode::new("shared", v("1.2.0")));
    tree.add_dependency(tree.root(), a);
    tree.add_dependency(tree.root(), b);
    tree.add_dependency(a, shared_under_a);
    tree.add_dependency(b, shared_under_b);

    assert!(detect(&tree).is_empty());
}

#[test]
fn records_each_distinct_version_with_its_path() {
    let mut tree = LogicalTree::new("app", v("1.0.0"));
    let a = tree.add_node(TreeNode::new("a", v("1.0.0")));
    let b = tree.add_node(TreeNode::new("b", v("1.0.0")));
    let c = tree.add_node(TreeNode::new("c", v("1.0.0")));
    let t1 = tree.add_node(TreeNode::new("t", v("1.0.0")));
    let t2 = tree.add_node(TreeNode::new("t", v("2.0.0")));
    let t3 = tree.add_node(TreeNode::new("t", v("3.0.0")));
    tree.add_dependency(tree.root(), a);
    tree.add_dependency(tree.root(), b);
    tree.add_dependency(a, t1);
    tree.add_dependency(b, c);
    tree.add_dependency(c, t2);
    tree.add_dependency(tree.root(), t3);

    let conflicts = detect(&tree);
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.versions.len(), 3);

    for occurrence in conflict.occurrences() {
        assert_eq!(occurrence.ancestors[0], Package::root());
    }
    let t2_chain: Vec<String> = conflict.versions[&v("2.0.0")][0]
        .ancestors
        .iter()
        .map(Package::to_string)
        .collect();
    assert_eq!(t2_chain, vec!["#ROOT_PROJECT@0.0.0", "b@1.0.0", "c@1.0.0"]);

    let causes: Vec<String> = conflict.root_causes().iter().map(Package::to_string).collect();
    assert_eq!(causes, vec!["a@1.0.0", "b@1.0.0", "t@3.0.0"]);
    assert!(conflict.is_user_solvable());
}

#[test]
fn sibling_paths_do_not_leak_into_chains() {
    let mut tree = LogicalTree::new("app", v("1.0.0"));
    let a = tree.add_node(TreeNode::new("a", v("1.0.0")));
    let deep = tree.add_node(TreeNode::new("deep", v("1.0.0")));
    let b = tree.add_node(TreeNode::new("b", v("1.0.0")));
    let t1 = tree.add_node(TreeNode::new("t", v("1.0.0")));
    let t2 = tree.add_node(TreeNode::new("t", v("2.0.0")));
    tree.add_dependency(tree.root(), a);
    tree.add_dependency(a, deep);
    tree.add_dependency(deep, t1);
    tree.add_dependency(tree.root(), b);
    tree.add_dependency(b, t2);

    let conflicts = detect(&tree);
    let chain = &conflicts[0].versions[&v("2.0.0")][0].ancestors;
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].name, "b");
}

#[test]
fn cyclic_graph_terminates() {
    let mut tree = LogicalTree::new("app", v("1.0.0"));
    let a = tree.add_node(TreeNode::new("a", v("1.0.0")));
    let b = tree.add_node(TreeNode::new("b", v("1.0.0")));
    let a2 = tree.add_node(TreeNode::new("a", v("2.0.0")));
    tree.add_dependency(tree.root(), a);
    tree.add_dependency(a, b);
    tree.add_dependency(b, a);
    tree.add_dependency(b, a2);

    let conflicts = detect(&tree);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].package_name, "a");
    // a@1.0.0 is its own root cause and also the root cause of a@2.0.0
    assert!(!conflicts[0].is_user_solvable());
}

#[test]
fn detects_conflicts_in_a_lockfile() {
    let manifest = r#"{ "name": "demo", "version": "1.0.0",
        "dependencies": { "a": "^1.0.0", "b": "^1.0.0" } }"#;
    let lockfile = r#"{
      "lockfileVersion": 3,
      "packages": {
        "": { "dependencies": { "a": "^1.0.0", "b": "^1.0.0" } },
        "node_modules/a": { "version": "1.0.0", "dependencies": { "t": "^1.0.0" } },
        "node_modules/b": { "version": "1.0.0", "dependencies": { "t": "^2.0.0" } },
        "node_modules/b/node_modules/t": { "version": "2.0.0" },
        "node_modules/t": { "version": "1.1.0" }
      }
    }"#;
    let tree = parse_project(manifest, lockfile, false).unwrap();
    let report = ConflictReport::from_tree(&tree);
    assert_eq!(report.len(), 1);
    assert!(report.get("t").is_some());
    assert!(report.to_string().contains("+- b@1.0.0"));
}
