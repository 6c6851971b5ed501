// this_file: crates/t2p-svg/src/document.rs

//! Owned XML node arena.
//!
//! Parsed once with `roxmltree`, mutated by id, serialized back with an XML
//! declaration. Replaced nodes stay in the arena but are detached from the
//! tree, so [`NodeId`]s held by a replacement plan remain valid.

use std::fmt::Write;
use t2p_core::{Result, T2pError};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Qualified name with the prefix it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    /// Same prefix and namespace as `self`, different local name.
    pub fn sibling(&self, local: &str) -> Self {
        Self {
            prefix: self.prefix.clone(),
            local: local.to_string(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element.
    pub namespaces: Vec<(Option<String>, String)>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    /// Unqualified attribute.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn attr_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.as_deref() == Some(namespace) && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, local: &str) -> bool {
        self.attr(local).is_some()
    }

    pub fn set_attr(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: QName::local(local),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, local: &str) -> Option<String> {
        let idx = self
            .attributes
            .iter()
            .position(|a| a.name.namespace.is_none() && a.name.local == local)?;
        Some(self.attributes.remove(idx).value)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Local name match in the SVG namespace (or no namespace).
    pub fn is(&self, local: &str) -> bool {
        self.name.local == local
            && matches!(self.name.namespace.as_deref(), None | Some(SVG_NS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Detached subtree description, materialized by [`Document::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum NewNode {
    Element {
        element: Element,
        children: Vec<NewNode>,
    },
    /// Deep copy of an existing node of the same document.
    CopyOf(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| T2pError::Xml(e.to_string()))?;

        let mut doc = Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        };
        let mut stack = vec![(xml.root(), doc.root())];
        while let Some((source, parent)) = stack.pop() {
            let mut ids = Vec::new();
            for child in source.children() {
                let kind = match child.node_type() {
                    roxmltree::NodeType::Element => {
                        NodeKind::Element(convert_element(xml.input_text(), child))
                    }
                    roxmltree::NodeType::Text => NodeKind::Text(child.text().unwrap_or("").to_string()),
                    roxmltree::NodeType::Comment => {
                        NodeKind::Comment(child.text().unwrap_or("").to_string())
                    }
                    roxmltree::NodeType::PI => match child.pi() {
                        Some(pi) => NodeKind::ProcessingInstruction {
                            target: pi.target.to_string(),
                            value: pi.value.map(str::to_string),
                        },
                        None => continue,
                    },
                    roxmltree::NodeType::Root => continue,
                };
                let id = doc.push(kind, Some(parent));
                ids.push(id);
                if child.is_element() {
                    stack.push((child, id));
                }
            }
            doc.nodes[parent.0].children = ids;
        }
        Ok(doc)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// Attached descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Attached elements with local name `local`.
    pub fn elements_named(&self, local: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(|el| el.is(local)))
            .collect()
    }

    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.element(id).and_then(Element::id) == Some(value))
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Materialize `node` as a detached subtree.
    pub fn build(&mut self, node: &NewNode) -> NodeId {
        match node {
            NewNode::Element { element, children } => {
                let id = self.push(NodeKind::Element(element.clone()), None);
                for child in children {
                    let child_id = self.build(child);
                    self.append_child(id, child_id);
                }
                id
            }
            NewNode::CopyOf(source) => self.deep_copy(*source),
        }
    }

    /// Detached deep copy of `source`.
    pub fn deep_copy(&mut self, source: NodeId) -> NodeId {
        let kind = self.nodes[source.0].kind.clone();
        let id = self.push(kind, None);
        for child in self.nodes[source.0].children.clone() {
            let copy = self.deep_copy(child);
            self.append_child(id, copy);
        }
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Put `new` where `old` is, keeping sibling order. `old` is detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self
            .parent(old)
            .ok_or_else(|| T2pError::Internal("cannot replace a detached node".into()))?;
        let slot = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or_else(|| T2pError::Internal("node missing from its parent".into()))?;
        self.nodes[parent.0].children[slot] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        for (i, &child) in self.children(self.root()).iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            self.write_node(&mut out, child);
        }
        out.push('\n');
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.kind(id) {
            NodeKind::Root => {}
            NodeKind::Text(text) => escape_into(out, text, false),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::ProcessingInstruction { target, value } => match value {
                Some(value) => {
                    let _ = write!(out, "<?{target} {value}?>");
                }
                None => {
                    let _ = write!(out, "<?{target}?>");
                }
            },
            NodeKind::Element(el) => {
                let name = el.name.qualified();
                out.push('<');
                out.push_str(&name);
                for (prefix, uri) in &el.namespaces {
                    match prefix {
                        Some(p) => {
                            let _ = write!(out, " xmlns:{p}=\"");
                        }
                        None => out.push_str(" xmlns=\""),
                    }
                    escape_into(out, uri, true);
                    out.push('"');
                }
                for attr in &el.attributes {
                    out.push(' ');
                    out.push_str(&attr.name.qualified());
                    out.push_str("=\"");
                    escape_into(out, &attr.value, true);
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(out, child);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }
}

fn convert_element(input: &str, node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let written = input
        .get(node.range())
        .map(|raw| raw.trim_start_matches('<'))
        .and_then(|raw| raw.split(|c: char| c.is_whitespace() || c == '/' || c == '>').next());
    let name = QName {
        prefix: prefix_of(written, tag.name(), tag.namespace(), node),
        local: tag.name().to_string(),
        namespace: tag.namespace().map(str::to_string),
    };

    let attributes = node
        .attributes()
        .map(|attr| Attribute {
            name: QName {
                prefix: prefix_of(input.get(attr.range_qname()), attr.name(), attr.namespace(), node),
                local: attr.name().to_string(),
                namespace: attr.namespace().map(str::to_string),
            },
            value: attr.value().to_string(),
        })
        .collect();

    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    let namespaces = node
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect();

    Element {
        name,
        attributes,
        namespaces,
    }
}

/// Prefix as written in the source, else the first one bound to `namespace`.
fn prefix_of(
    written: Option<&str>,
    local: &str,
    namespace: Option<&str>,
    node: roxmltree::Node<'_, '_>,
) -> Option<String> {
    namespace?;
    match written.map(|q| q.split_once(':')) {
        Some(Some((prefix, rest))) if rest == local => Some(prefix.to_string()),
        Some(None) if written == Some(local) => None,
        _ => namespace
            .and_then(|uri| node.lookup_prefix(uri))
            .map(str::to_string),
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
}
