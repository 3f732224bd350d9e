//! Simple in-memory tree implementing [`XmlNode`], for tests, benchmarks and
//! quick prototypes.
//!
//! Nodes are immutable once built. Parent links are weak and only used to
//! build a [`Cursor`] for a node (`SimpleNode::cursor`), so keep the document
//! alive while matching against its nodes.
//!
//! ```
//! use xpath_matcher::model::simple::{attr, doc, elem, text};
//! use xpath_matcher::{XPathMatcher, XmlNode};
//!
//! // <root id="r"><item>Hello</item><item/></root>
//! let document = doc()
//!     .child(
//!         elem("root")
//!             .attr(attr("id", "r"))
//!             .child(elem("item").child(text("Hello")))
//!             .child(elem("item")),
//!     )
//!     .build();
//!
//! let first = document.find("item").unwrap();
//! assert_eq!(first.string_value(), "Hello");
//! assert!(XPathMatcher::new("/root/item[1]").matches(&first.cursor()));
//! ```
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::engine::cursor::Cursor;
use crate::model::{NodeKind, XmlNode};

struct Inner {
    kind: NodeKind,
    name: Option<String>,
    value: Option<String>, // text / attribute / comment / PI content
    parent: OnceLock<Weak<Inner>>,
    attributes: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    cached_text: OnceLock<String>, // memoized string value for element/document
}

/// A simple Arc-backed node. Equality is identity.
#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SimpleNode {}

impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish_non_exhaustive()
    }
}

impl SimpleNode {
    fn new(
        kind: NodeKind,
        name: Option<String>,
        value: Option<String>,
        attributes: Vec<SimpleNode>,
        children: Vec<SimpleNode>,
    ) -> Self {
        let node = SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: OnceLock::new(),
            attributes,
            children,
            cached_text: OnceLock::new(),
        }));
        for member in node.0.attributes.iter().chain(&node.0.children) {
            // A node attached twice keeps its first parent.
            let _ = member.0.parent.set(Arc::downgrade(&node.0));
        }
        node
    }

    fn leaf(kind: NodeKind, name: Option<&str>, value: &str) -> Self {
        Self::new(kind, name.map(str::to_owned), Some(value.to_owned()), Vec::new(), Vec::new())
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None)
    }

    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(name.to_owned()))
    }

    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Attribute, Some(name), value)
    }

    pub fn text(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Text, None, value)
    }

    pub fn comment(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Comment, None, value)
    }

    pub fn pi(target: &str, data: &str) -> SimpleNode {
        Self::leaf(NodeKind::ProcessingInstruction, Some(target), data)
    }

    pub fn parent(&self) -> Option<SimpleNode> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }

    /// Root element down to `self`. The document node is not part of the chain.
    pub fn ancestry(&self) -> Vec<SimpleNode> {
        let mut chain = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(node) = cur {
            if node.kind() == NodeKind::Document {
                break;
            }
            cur = node.parent();
            chain.push(node);
        }
        chain.reverse();
        chain
    }

    pub fn cursor(&self) -> Cursor<SimpleNode> {
        Cursor::new(self.ancestry())
    }

    /// Elements in document order, `self` first when it is an element.
    pub fn descendants(&self) -> Vec<SimpleNode> {
        fn walk(node: &SimpleNode, out: &mut Vec<SimpleNode>) {
            if node.kind() == NodeKind::Element {
                out.push(node.clone());
            }
            for child in &node.0.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// First element named `name` in document order, `self` included.
    pub fn find(&self, name: &str) -> Option<SimpleNode> {
        self.descendants().into_iter().find(|n| n.name() == Some(name))
    }

    pub fn find_all(&self, name: &str) -> Vec<SimpleNode> {
        self.descendants().into_iter().filter(|n| n.name() == Some(name)).collect()
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<String>,
    attributes: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<String>) -> Self {
        Self { kind, name, attributes: Vec::new(), children: Vec::new() }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.children.push(child.into().build());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SimpleNodeOrBuilder>,
    {
        self.children.extend(children.into_iter().map(|c| c.into().build()));
        self
    }

    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert_eq!(attr.kind(), NodeKind::Attribute);
        self.attributes.push(attr);
        self
    }

    pub fn attrs<I: IntoIterator<Item = SimpleNode>>(mut self, attrs: I) -> Self {
        for a in attrs {
            self = self.attr(a);
        }
        self
    }

    pub fn build(self) -> SimpleNode {
        SimpleNode::new(self.kind, self.name, None, self.attributes, self.children)
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn build(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}

impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience helpers for concise test code
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn attr(name: &str, value: &str) -> SimpleNode {
    SimpleNode::attribute(name, value)
}
pub fn text(value: &str) -> SimpleNode {
    SimpleNode::text(value)
}
pub fn comment(value: &str) -> SimpleNode {
    SimpleNode::comment(value)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}

impl XmlNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Document => self
                .0
                .cached_text
                .get_or_init(|| {
                    fn collect(n: &SimpleNode, out: &mut String) {
                        if n.0.kind == NodeKind::Text
                            && let Some(v) = &n.0.value
                        {
                            out.push_str(v);
                        }
                        for c in &n.0.children {
                            collect(c, out);
                        }
                    }
                    let mut out = String::new();
                    collect(self, &mut out);
                    out
                })
                .clone(),
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestry_stops_below_document() {
        let d = doc().child(elem("a").child(elem("b").attr(attr("k", "v")))).build();
        let b = d.find("b").unwrap();
        let names: Vec<_> = b.ancestry().iter().map(|n| n.name().unwrap().to_owned()).collect();
        assert_eq!(names, ["a", "b"]);

        let k = b.attributes()[0].clone();
        assert_eq!(k.ancestry().len(), 3);
        assert_eq!(k.cursor().current(), Some(&k));
    }

    #[test]
    fn string_value_concatenates_text() {
        let d = doc()
            .child(elem("a").child(text("x")).child(comment("skip")).child(elem("b").child(text("y"))))
            .build();
        assert_eq!(d.string_value(), "xy");
        assert_eq!(d.find("b").unwrap().string_value(), "y");
    }

    #[test]
    fn prefix_and_local_name() {
        let n = elem("svg:rect").build();
        assert_eq!(n.prefix(), Some("svg"));
        assert_eq!(n.local_name(), Some("rect"));
        let plain = elem("rect").build();
        assert_eq!(plain.prefix(), None);
        assert_eq!(plain.local_name(), Some("rect"));
    }
}
