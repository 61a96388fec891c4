//! The in-memory configuration tree.
//!
//! Configuration for the whole platform lives in one XML-like document
//! tree: service registrations, editors, projects and locations. The tree
//! is queried with a small path-expression language:
//!
//! ```text
//! services/service[@id='structured-data']/methods/method[@id='query']
//! projects/*
//! ```
//!
//! Supported steps are child names, the `*` wildcard, and a single
//! `[@attr='value']` predicate per step. This is the subset the platform's
//! lookups actually use; it is not a general XPath engine.

use std::fmt::Write as _;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ConfigError;

/// A node in the configuration tree.
///
/// Nodes carry an element name, ordered attributes, optional text content
/// and child nodes, mirroring the XML documents they are parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNode {
    name: String,
    attrs: IndexMap<String, String>,
    text: Option<String>,
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Creates an empty node with the given element name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Builder-style text setter.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style child appender.
    #[must_use]
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// The element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an attribute value by name.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Sets an attribute value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// The text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The child nodes.
    #[must_use]
    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// Mutable access to the child nodes.
    pub fn children_mut(&mut self) -> &mut Vec<ConfigNode> {
        &mut self.children
    }

    /// Appends a child node.
    pub fn push_child(&mut self, child: ConfigNode) {
        self.children.push(child);
    }

    /// Returns the first child with the given element name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Replaces the first child with the given element name, or appends
    /// the node when no such child exists.
    pub fn replace_or_push_child(&mut self, node: ConfigNode) {
        match self.children.iter_mut().find(|c| c.name == node.name) {
            Some(slot) => *slot = node,
            None => self.children.push(node),
        }
    }

    /// Selects the first node matching the path expression.
    ///
    /// Returns `None` for no match and for malformed expressions (which
    /// are logged at debug level).
    #[must_use]
    pub fn select<'a>(&'a self, path: &str) -> Option<&'a ConfigNode> {
        self.select_all(path).into_iter().next()
    }

    /// Selects all nodes matching the path expression, in document order.
    #[must_use]
    pub fn select_all<'a>(&'a self, path: &str) -> Vec<&'a ConfigNode> {
        let Some(steps) = parse_steps(path) else {
            tracing::debug!(path, "malformed configuration path expression");
            return Vec::new();
        };

        let mut frontier: Vec<&ConfigNode> = vec![self];
        for step in &steps {
            let mut next = Vec::new();
            for node in frontier {
                for child in &node.children {
                    if step.matches(child) {
                        next.push(child);
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    /// Parses a configuration document from an XML string.
    pub fn from_xml_str(xml: &str) -> Result<Self, ConfigError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<ConfigNode> = Vec::new();
        let mut root: Option<ConfigNode> = None;

        loop {
            match reader.read_event().map_err(|e| ConfigError::xml(e.to_string()))? {
                Event::Start(start) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(ConfigError::xml("multiple root elements"));
                    }
                    stack.push(node_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None if root.is_none() => root = Some(node),
                        None => return Err(ConfigError::xml("multiple root elements")),
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| ConfigError::xml(e.to_string()))?;
                    if let Some(node) = stack.last_mut() {
                        if !text.is_empty() {
                            node.text = Some(text.into_owned());
                        }
                    }
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| ConfigError::xml("unbalanced end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Event::Eof => break,
                // Declarations, comments and processing instructions carry
                // no configuration.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ConfigError::xml("unexpected end of document"));
        }
        root.ok_or_else(|| ConfigError::xml("empty document"))
    }

    /// Parses a configuration document from an XML file.
    pub fn from_xml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let xml =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        Self::from_xml_str(&xml)
    }

    /// Serializes the subtree back to XML.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (key, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
        }
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text.as_str()));
        }
        for child in &self.children {
            child.write_xml(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

fn node_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<ConfigNode, ConfigError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = ConfigNode::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ConfigError::xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ConfigError::xml(e.to_string()))?
            .into_owned();
        node.attrs.insert(key, value);
    }
    Ok(node)
}

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// Element name to match; `None` is the `*` wildcard.
    name: Option<String>,
    /// Optional `[@attr='value']` predicate.
    predicate: Option<(String, String)>,
}

impl Step {
    fn matches(&self, node: &ConfigNode) -> bool {
        if let Some(name) = &self.name {
            if node.name != *name {
                return false;
            }
        }
        match &self.predicate {
            Some((attr, value)) => node.attr(attr) == Some(value.as_str()),
            None => true,
        }
    }
}

fn parse_steps(path: &str) -> Option<Vec<Step>> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return None;
    }
    path.split('/').map(parse_step).collect()
}

fn parse_step(segment: &str) -> Option<Step> {
    let (name_part, predicate) = match segment.find('[') {
        Some(idx) => {
            let pred = segment.get(idx..)?;
            let inner = pred.strip_prefix("[@")?.strip_suffix("']")?;
            let (attr, value) = inner.split_once("='")?;
            if attr.is_empty() {
                return None;
            }
            (&segment[..idx], Some((attr.to_string(), value.to_string())))
        }
        None => (segment, None),
    };

    let name = match name_part {
        "" => return None,
        "*" => None,
        n => Some(n.to_string()),
    };
    Some(Step { name, predicate })
}
