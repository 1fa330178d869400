//! Core document tree types.

use std::fmt;

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements the tokenizer reads as raw text: their content is never
/// entity-decoded on the way in, so it is written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
    "script",
    "style",
    "xmp",
];

/// True for tags whose content is raw text.
pub(crate) fn is_raw_text_name(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Handle to a node inside a [`Document`].
///
/// Ids are stable for the lifetime of the document: detaching a node does not
/// free or reuse its slot, so a stale id simply refers to a detached node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag name and attributes of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    name: String,
    attrs: Vec<(String, String)>,
}

impl ElementData {
    /// Lowercase tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in source order.
    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Look up an attribute value by (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// True when the `class` attribute contains `class` as a whole token.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    fn is_raw_text(&self) -> bool {
        is_raw_text_name(&self.name)
    }
}

/// Payload of a single tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document root; owns the top-level nodes.
    Document,
    /// `<!DOCTYPE name>`
    Doctype(String),
    Element(ElementData),
    /// Decoded character data.
    Text(String),
    Comment(String),
    /// Pre-serialized markup inserted by a renderer (for example an SVG).
    /// Written out verbatim and contributes no text content.
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An HTML document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// The document root node.
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first top-level element (normally `<html>`).
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    /// Element payload, or `None` for non-element nodes.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id) {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// True when `id` is an element with the given tag name.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.name == name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Allocate a detached element. The tag name is lowercased.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::Doctype(name.into()))
    }

    /// Allocate a detached node of verbatim markup.
    pub fn create_markup(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(NodeData::Markup(markup.into()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove `id` from its parent. The subtree stays allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Put `replacement` where `target` is and detach `target`.
    ///
    /// Returns `false` (and changes nothing) when `target` has no parent.
    pub fn replace_with(&mut self, target: NodeId, replacement: NodeId) -> bool {
        let Some(parent) = self.nodes[target.0].parent else {
            return false;
        };
        self.detach(replacement);
        let Some(slot) = self.nodes[parent.0].children.iter().position(|&c| c == target) else {
            return false;
        };
        self.nodes[parent.0].children[slot] = replacement;
        self.nodes[replacement.0].parent = Some(parent);
        self.nodes[target.0].parent = None;
        true
    }

    /// True when `id` is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    /// Set (or overwrite) an attribute. No-op on non-element nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => element.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Document | NodeData::Element(_) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            NodeData::Doctype(_) | NodeData::Comment(_) | NodeData::Markup(_) => {}
        }
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        let text = text.into();
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Replace all children of `id` with verbatim markup.
    pub fn set_inner_markup(&mut self, id: NodeId, markup: impl Into<String>) {
        self.clear_children(id);
        let node = self.create_markup(markup);
        self.append_child(id, node);
    }

    fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Nearest inclusive ancestor of `id` matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_some_and(&pred) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Descendants of `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Attached elements matching `pred`, in document order.
    pub fn select(&self, pred: impl Fn(&ElementData) -> bool) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(&pred))
            .collect()
    }

    /// Serialize the whole document to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(child, false, &mut out);
        }
        out
    }

    /// Serialize one node and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .parent(id)
            .and_then(|p| self.element(p))
            .is_some_and(ElementData::is_raw_text);
        self.write_node(id, raw, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.data(id) {
            NodeData::Document => {
                for &child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&htmlize::escape_attribute(value.as_str()));
                    out.push('"');
                }
                out.push('>');
                if element.is_void() {
                    return;
                }
                let raw = element.is_raw_text();
                for &child in self.children(id) {
                    self.write_node(child, raw, out);
                }
                // `plaintext` runs to the end of input and has no end tag.
                if element.name == "plaintext" {
                    return;
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => out.push_str(&htmlize::escape_text(text.as_str())),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Markup(markup) => out.push_str(markup),
        }
    }
}
