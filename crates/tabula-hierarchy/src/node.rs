//! Site hierarchy tree and RBAC stripping.
//!
//! The hierarchy is the navigable page tree of a site. Each node carries
//! the roles allowed to view and edit it; an empty role list means the
//! node is unrestricted. The stripped variant of the tree is derived per
//! caller and drives both navigation rendering and access enforcement.

use std::collections::HashSet;

use serde::Serialize;

use tabula_config::ConfigNode;
use tabula_core::PermissionSet;

use crate::error::HierarchyError;

/// A navigable page in the site hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageNode {
    /// Stable page identifier, unique within the tree.
    pub id: String,
    /// URL path segment for this page.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Roles allowed to view the page; empty means unrestricted.
    pub view_roles: Vec<String>,
    /// Roles allowed to edit the page; empty means unrestricted.
    pub edit_roles: Vec<String>,
    /// Child pages.
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Creates a page node with no restrictions and no children.
    #[must_use]
    pub fn new(id: impl Into<String>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: title.into(),
            view_roles: Vec::new(),
            edit_roles: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style view-role restriction.
    #[must_use]
    pub fn with_view_roles(mut self, roles: &[&str]) -> Self {
        self.view_roles = roles.iter().map(|r| (*r).to_string()).collect();
        self
    }

    /// Builder-style edit-role restriction.
    #[must_use]
    pub fn with_edit_roles(mut self, roles: &[&str]) -> Self {
        self.edit_roles = roles.iter().map(|r| (*r).to_string()).collect();
        self
    }

    /// Builder-style child appender.
    #[must_use]
    pub fn with_child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }

    /// True when the permission set may view this node.
    #[must_use]
    pub fn viewable_by(&self, perms: &PermissionSet) -> bool {
        perms.grants_any(self.view_roles.iter().map(String::as_str))
    }

    /// True when the permission set may edit this node.
    #[must_use]
    pub fn editable_by(&self, perms: &PermissionSet) -> bool {
        perms.grants_any(self.edit_roles.iter().map(String::as_str))
    }
}

/// The site hierarchy: a synthetic, unrestricted root over the page tree.
///
/// # Stripping
///
/// [`SiteHierarchy::strip`] derives the permission-filtered variant used
/// for navigation and access checks. The input tree is never mutated; the
/// filter works on a clone in two passes — mark every node failing the
/// predicate, then remove marked nodes with their subtrees — so tree
/// iteration is never invalidated mid-walk. Because removal takes whole
/// subtrees, every node retained in the output has all its ancestors
/// retained as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteHierarchy {
    root: PageNode,
}

impl SiteHierarchy {
    /// Creates a hierarchy from top-level pages.
    #[must_use]
    pub fn new(pages: Vec<PageNode>) -> Self {
        let mut root = PageNode::new("root", "", "");
        root.children = pages;
        Self { root }
    }

    /// Parses the hierarchy from the `hierarchy` section of the
    /// configuration tree.
    ///
    /// ```xml
    /// <hierarchy>
    ///   <page id="home" slug="" title="Home"/>
    ///   <page id="reports" slug="reports" title="Reports" view="reviewer,admin">
    ///     <page id="annual" slug="annual" title="Annual Report" view="admin"/>
    ///   </page>
    /// </hierarchy>
    /// ```
    pub fn from_config(section: &ConfigNode) -> Result<Self, HierarchyError> {
        if section.name() != "hierarchy" {
            return Err(HierarchyError::WrongSection {
                found: section.name().to_string(),
            });
        }
        let mut pages = Vec::new();
        for child in section.children() {
            pages.push(parse_page(child)?);
        }
        Ok(Self::new(pages))
    }

    /// The top-level pages.
    #[must_use]
    pub fn pages(&self) -> &[PageNode] {
        &self.root.children
    }

    /// Finds a page by id anywhere in the tree.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&PageNode> {
        find_in(&self.root, id)
    }

    /// True when a page with the given id exists in the tree.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Resolves a URL path to a page by walking slugs.
    ///
    /// `/reports/annual` walks the children slug by slug. The empty path
    /// resolves to the first top-level page (the site home), when present.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<&PageNode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();

        if segments.peek().is_none() {
            return self.root.children.first();
        }

        let mut current = &self.root;
        for segment in segments {
            current = current.children.iter().find(|c| c.slug == segment)?;
        }
        Some(current)
    }

    /// Derives the stripped hierarchy for a permission set.
    ///
    /// Equivalent to [`Self::strip_with`] using the view predicate.
    #[must_use]
    pub fn strip(&self, perms: &PermissionSet) -> SiteHierarchy {
        self.strip_with(|node| node.viewable_by(perms))
    }

    /// Derives a stripped hierarchy keeping only nodes passing the
    /// predicate (and whose ancestors all pass it).
    #[must_use]
    pub fn strip_with(&self, predicate: impl Fn(&PageNode) -> bool) -> SiteHierarchy {
        let mut clone = self.clone();

        // Pass 1: mark.
        let mut marked = HashSet::new();
        mark_failing(&clone.root, &predicate, &mut marked);

        // Pass 2: remove marked subtrees.
        remove_marked(&mut clone.root, &marked);

        clone
    }
}

fn parse_page(node: &ConfigNode) -> Result<PageNode, HierarchyError> {
    if node.name() != "page" {
        return Err(HierarchyError::UnexpectedElement {
            found: node.name().to_string(),
        });
    }
    let id = node
        .attr("id")
        .ok_or_else(|| HierarchyError::missing_attr("id"))?;
    let slug = node
        .attr("slug")
        .ok_or_else(|| HierarchyError::missing_attr("slug"))?;

    let mut page = PageNode::new(id, slug, node.attr("title").unwrap_or(id));
    page.view_roles = split_roles(node.attr("view"));
    page.edit_roles = split_roles(node.attr("edit"));
    for child in node.children() {
        page.children.push(parse_page(child)?);
    }
    Ok(page)
}

fn split_roles(attr: Option<&str>) -> Vec<String> {
    attr.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn find_in<'a>(node: &'a PageNode, id: &str) -> Option<&'a PageNode> {
    if node.id == id {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_in(c, id))
}

fn mark_failing(
    node: &PageNode,
    predicate: &impl Fn(&PageNode) -> bool,
    marked: &mut HashSet<String>,
) {
    for child in &node.children {
        if !predicate(child) {
            marked.insert(child.id.clone());
        }
        mark_failing(child, predicate, marked);
    }
}

fn remove_marked(node: &mut PageNode, marked: &HashSet<String>) {
    node.children.retain(|c| !marked.contains(&c.id));
    for child in &mut node.children {
        remove_marked(child, marked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SiteHierarchy {
        SiteHierarchy::new(vec![
            PageNode::new("home", "", "Home"),
            PageNode::new("reports", "reports", "Reports")
                .with_view_roles(&["reviewer", "admin"])
                .with_child(
                    PageNode::new("annual", "annual", "Annual Report").with_view_roles(&["admin"]),
                ),
            PageNode::new("about", "about", "About"),
        ])
    }

    fn perms(roles: &[&str]) -> PermissionSet {
        PermissionSet::from_iter(roles.iter().map(|r| (*r).to_string()))
    }

    #[test]
    fn test_find() {
        let tree = sample();
        assert_eq!(tree.find("annual").unwrap().title, "Annual Report");
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn test_resolve_path() {
        let tree = sample();
        assert_eq!(tree.resolve_path("/reports/annual").unwrap().id, "annual");
        assert_eq!(tree.resolve_path("/about").unwrap().id, "about");
        assert_eq!(tree.resolve_path("/").unwrap().id, "home");
        assert!(tree.resolve_path("/reports/quarterly").is_none());
    }

    #[test]
    fn test_strip_removes_disallowed_subtree() {
        let tree = sample();
        let stripped = tree.strip(&perms(&["editor"]));
        assert!(stripped.contains("home"));
        assert!(stripped.contains("about"));
        assert!(!stripped.contains("reports"));
        // The subtree went with its root.
        assert!(!stripped.contains("annual"));
    }

    #[test]
    fn test_strip_keeps_allowed_chain() {
        let tree = sample();
        let stripped = tree.strip(&perms(&["admin"]));
        assert!(stripped.contains("reports"));
        assert!(stripped.contains("annual"));
    }

    #[test]
    fn test_strip_reviewer_keeps_parent_only() {
        let tree = sample();
        let stripped = tree.strip(&perms(&["reviewer"]));
        assert!(stripped.contains("reports"));
        assert!(!stripped.contains("annual"));
    }

    #[test]
    fn test_strip_does_not_mutate_input() {
        let tree = sample();
        let before = tree.clone();
        let _ = tree.strip(&perms(&[]));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_wildcard_sees_everything() {
        let tree = sample();
        let stripped = tree.strip(&PermissionSet::wildcard());
        assert_eq!(stripped, tree);
    }

    #[test]
    fn test_unrestricted_node_is_public() {
        let tree = sample();
        let stripped = tree.strip(&perms(&[]));
        assert!(stripped.contains("about"));
        assert!(!stripped.contains("reports"));
    }

    #[test]
    fn test_editable_by() {
        let node = PageNode::new("p", "p", "P").with_edit_roles(&["editor"]);
        assert!(node.editable_by(&perms(&["editor"])));
        assert!(!node.editable_by(&perms(&["reviewer"])));
        assert!(node.editable_by(&PermissionSet::wildcard()));
    }

    #[test]
    fn test_from_config() {
        let section = ConfigNode::from_xml_str(
            r#"<hierarchy>
  <page id="home" slug="" title="Home"/>
  <page id="reports" slug="reports" title="Reports" view="reviewer, admin" edit="admin"/>
</hierarchy>"#,
        )
        .unwrap();

        let tree = SiteHierarchy::from_config(&section).unwrap();
        let reports = tree.find("reports").unwrap();
        assert_eq!(reports.view_roles, vec!["reviewer", "admin"]);
        assert_eq!(reports.edit_roles, vec!["admin"]);
    }

    #[test]
    fn test_stripped_tree_serializes_for_navigation() {
        let tree = sample();
        let stripped = tree.strip(&perms(&["reviewer"]));
        let json = serde_json::to_value(stripped.pages()).unwrap();
        let ids: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["home", "reports", "about"]);
    }

    #[test]
    fn test_from_config_rejects_wrong_section() {
        let section = ConfigNode::from_xml_str("<services/>").unwrap();
        assert!(SiteHierarchy::from_config(&section).is_err());
    }

    #[test]
    fn test_from_config_requires_id() {
        let section =
            ConfigNode::from_xml_str(r#"<hierarchy><page slug="x"/></hierarchy>"#).unwrap();
        assert!(SiteHierarchy::from_config(&section).is_err());
    }
}
