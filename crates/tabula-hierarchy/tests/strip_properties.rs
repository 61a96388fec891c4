//! Property tests for hierarchy stripping.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use tabula_core::PermissionSet;
use tabula_hierarchy::{PageNode, SiteHierarchy};

const ROLES: &[&str] = &["admin", "editor", "reviewer", "translator"];

fn role_subset() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(proptest::sample::select(ROLES), 0..3).prop_map(|roles| {
        let mut roles: Vec<String> = roles.into_iter().map(String::from).collect();
        roles.sort();
        roles.dedup();
        roles
    })
}

fn page_strategy() -> impl Strategy<Value = PageNode> {
    let leaf = role_subset().prop_map(|roles| {
        let mut node = PageNode::new("x", "x", "x");
        node.view_roles = roles;
        node
    });
    leaf.prop_recursive(3, 24, 4, |inner| {
        (role_subset(), proptest::collection::vec(inner, 0..4)).prop_map(|(roles, children)| {
            let mut node = PageNode::new("x", "x", "x");
            node.view_roles = roles;
            node.children = children;
            node
        })
    })
}

fn hierarchy_strategy() -> impl Strategy<Value = SiteHierarchy> {
    proptest::collection::vec(page_strategy(), 0..4).prop_map(|mut pages| {
        let mut counter = 0usize;
        for page in &mut pages {
            assign_ids(page, &mut counter);
        }
        SiteHierarchy::new(pages)
    })
}

fn assign_ids(node: &mut PageNode, counter: &mut usize) {
    node.id = format!("p{counter}");
    node.slug = format!("p{counter}");
    *counter += 1;
    for child in &mut node.children {
        assign_ids(child, counter);
    }
}

fn permissions_strategy() -> impl Strategy<Value = PermissionSet> {
    prop_oneof![
        4 => role_subset().prop_map(PermissionSet::from_iter),
        1 => Just(PermissionSet::wildcard()),
    ]
}

fn collect_ids(pages: &[PageNode], out: &mut HashSet<String>) {
    for page in pages {
        out.insert(page.id.clone());
        collect_ids(&page.children, out);
    }
}

fn collect_ancestors(
    pages: &[PageNode],
    chain: &mut Vec<String>,
    out: &mut HashMap<String, Vec<String>>,
) {
    for page in pages {
        out.insert(page.id.clone(), chain.clone());
        chain.push(page.id.clone());
        collect_ancestors(&page.children, chain, out);
        chain.pop();
    }
}

fn assert_all_viewable(pages: &[PageNode], perms: &PermissionSet) {
    for page in pages {
        assert!(
            page.viewable_by(perms),
            "disallowed node '{}' survived stripping",
            page.id
        );
        assert_all_viewable(&page.children, perms);
    }
}

proptest! {
    /// No node disallowed by the permission set survives stripping.
    #[test]
    fn strip_retains_only_allowed_nodes(
        tree in hierarchy_strategy(),
        perms in permissions_strategy(),
    ) {
        let stripped = tree.strip(&perms);
        assert_all_viewable(stripped.pages(), &perms);
    }

    /// Every retained node's ancestors (in the original tree) are retained.
    #[test]
    fn strip_preserves_path_to_root(
        tree in hierarchy_strategy(),
        perms in permissions_strategy(),
    ) {
        let mut ancestors = HashMap::new();
        collect_ancestors(tree.pages(), &mut Vec::new(), &mut ancestors);

        let stripped = tree.strip(&perms);
        let mut retained = HashSet::new();
        collect_ids(stripped.pages(), &mut retained);

        for id in &retained {
            for ancestor in &ancestors[id] {
                prop_assert!(
                    retained.contains(ancestor),
                    "retained node '{}' lost ancestor '{}'",
                    id,
                    ancestor
                );
            }
        }
    }

    /// Stripping never mutates its input.
    #[test]
    fn strip_leaves_input_untouched(
        tree in hierarchy_strategy(),
        perms in permissions_strategy(),
    ) {
        let before = tree.clone();
        let _ = tree.strip(&perms);
        prop_assert_eq!(tree, before);
    }

    /// Stripping an already stripped tree changes nothing.
    #[test]
    fn strip_is_idempotent(
        tree in hierarchy_strategy(),
        perms in permissions_strategy(),
    ) {
        let once = tree.strip(&perms);
        let twice = once.strip(&perms);
        prop_assert_eq!(once, twice);
    }
}
