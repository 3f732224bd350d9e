use smallvec::SmallVec;

use crate::model::XmlNode;

/// Ordered chain from the root element down to the node being tested.
///
/// The document node itself is not part of the chain; an absolute path's
/// first step lands on `chain[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<N> {
    chain: Vec<N>,
}

impl<N: XmlNode> Cursor<N> {
    pub fn new(chain: Vec<N>) -> Self {
        Self { chain }
    }

    pub fn root(root: N) -> Self {
        Self { chain: vec![root] }
    }

    /// Cursor one level deeper, at `node`.
    #[must_use]
    pub fn child(&self, node: N) -> Self {
        let mut chain = Vec::with_capacity(self.chain.len() + 1);
        chain.extend_from_slice(&self.chain);
        chain.push(node);
        Self { chain }
    }

    pub fn push(&mut self, node: N) {
        self.chain.push(node);
    }

    pub fn pop(&mut self) -> Option<N> {
        self.chain.pop()
    }

    pub fn current(&self) -> Option<&N> {
        self.chain.last()
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn as_slice(&self) -> &[N] {
        &self.chain
    }
}

impl<N: XmlNode> From<Vec<N>> for Cursor<N> {
    fn from(chain: Vec<N>) -> Self {
        Self::new(chain)
    }
}

/// A node reached during evaluation, together with its ancestry.
///
/// The first `depth` entries of the cursor chain are the ancestors-or-self of
/// the node; nodes reached by walking down from there and not on the chain
/// are kept in `below`. Depth 0 with nothing below is the document position,
/// the (implicit) parent of the root element.
#[derive(Debug, Clone)]
pub(crate) struct Position<'c, N> {
    chain: &'c [N],
    depth: usize,
    below: SmallVec<[N; 4]>,
}

impl<'c, N: XmlNode> Position<'c, N> {
    /// The cursor's current node, or `None` for an empty cursor.
    pub(crate) fn current(cursor: &'c Cursor<N>) -> Option<Self> {
        let chain = cursor.as_slice();
        (!chain.is_empty()).then(|| Self { chain, depth: chain.len(), below: SmallVec::new() })
    }

    pub(crate) fn document(chain: &'c [N]) -> Self {
        Self { chain, depth: 0, below: SmallVec::new() }
    }

    #[must_use]
    pub(crate) fn document_position(&self) -> Self {
        Self::document(self.chain)
    }

    /// `None` at the document position.
    pub(crate) fn node(&self) -> Option<&N> {
        self.below
            .last()
            .or_else(|| self.depth.checked_sub(1).and_then(|i| self.chain.get(i)))
    }

    /// Depth on the cursor chain, `None` for nodes below it.
    pub(crate) fn chain_depth(&self) -> Option<usize> {
        self.below.is_empty().then_some(self.depth)
    }

    pub(crate) fn is_document(&self) -> bool {
        self.depth == 0 && self.below.is_empty()
    }

    pub(crate) fn same_node(&self, other: &Self) -> bool {
        self.node() == other.node()
    }

    pub(crate) fn parent(&self) -> Option<Self> {
        if !self.below.is_empty() {
            let mut up = self.clone();
            up.below.pop();
            Some(up)
        } else if self.depth > 0 {
            Some(Self { chain: self.chain, depth: self.depth - 1, below: SmallVec::new() })
        } else {
            None
        }
    }

    /// Proper ancestors, nearest first, ending with the document position.
    pub(crate) fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(self.parent(), Self::parent)
    }

    #[must_use]
    pub(crate) fn descend(&self, node: N) -> Self {
        if self.below.is_empty() && self.chain.get(self.depth) == Some(&node) {
            return Self { chain: self.chain, depth: self.depth + 1, below: SmallVec::new() };
        }
        let mut down = self.clone();
        down.below.push(node);
        down
    }

    /// Child nodes. The document position's only known child is the root element.
    pub(crate) fn child_nodes(&self) -> Vec<N> {
        match self.node() {
            Some(n) => n.children(),
            None => self.chain.first().cloned().into_iter().collect(),
        }
    }

    pub(crate) fn attribute_nodes(&self) -> Vec<N> {
        self.node().map(XmlNode::attributes).unwrap_or_default()
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = Self> {
        self.child_nodes().into_iter().map(|n| self.descend(n))
    }

    pub(crate) fn attributes(&self) -> impl Iterator<Item = Self> {
        self.attribute_nodes().into_iter().map(|n| self.descend(n))
    }

    /// `self` and everything below it in document order, attributes excluded.
    pub(crate) fn descendants_or_self(&self) -> Vec<Self> {
        fn walk<'c, N: XmlNode>(pos: &Position<'c, N>, out: &mut Vec<Position<'c, N>>) {
            out.push(pos.clone());
            for child in pos.children() {
                walk(&child, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    pub(crate) fn string_value(&self) -> String {
        match self.node() {
            Some(n) => n.string_value(),
            None => self.chain.first().map(XmlNode::string_value).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{attr, doc, elem};

    #[test]
    fn descend_stays_on_chain() {
        let d = doc().child(elem("a").child(elem("b")).child(elem("c"))).build();
        let b = d.find("b").unwrap();
        let cursor = b.cursor();
        let current = Position::current(&cursor).unwrap();
        let a = current.parent().unwrap();
        let back = a.children().next().unwrap();
        assert!(back.same_node(&current));
        assert!(back.below.is_empty());

        let c = a.children().nth(1).unwrap();
        assert_eq!(c.node().and_then(XmlNode::name), Some("c"));
        assert_eq!(c.below.len(), 1);
        assert!(c.parent().unwrap().same_node(&a));
    }

    #[test]
    fn ancestors_end_at_document() {
        let d = doc().child(elem("a").child(elem("b").attr(attr("k", "v")))).build();
        let k = d.find("b").unwrap().attributes()[0].clone();
        let cursor = k.cursor();
        let pos = Position::current(&cursor).unwrap();
        let ancestors: Vec<_> = pos.ancestors().collect();
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors[2].is_document());
        assert_eq!(ancestors[2].child_nodes(), vec![d.find("a").unwrap()]);
    }

    #[test]
    fn cursor_child_extends_chain() {
        let d = doc().child(elem("a").child(elem("b"))).build();
        let a = d.find("a").unwrap();
        let b = d.find("b").unwrap();
        let cursor = Cursor::root(a.clone()).child(b.clone());
        assert_eq!(cursor.depth(), 2);
        assert_eq!(cursor.current(), Some(&b));
        assert_eq!(cursor, b.cursor());
    }
}
