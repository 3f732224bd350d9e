pub mod simple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Read-only view of a tree node as the matcher needs it.
///
/// Ancestry is not part of the trait; everything above the node under test
/// comes from the [`Cursor`](crate::Cursor) chain.
pub trait XmlNode: Clone + Eq + core::fmt::Debug + Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Literal name as written (`prefix:local`) for elements and attributes,
    /// the target for processing instructions, `None` otherwise.
    fn name(&self) -> Option<&str>;

    fn string_value(&self) -> String;

    /// Content children in document order. Attributes are not children.
    fn children(&self) -> Vec<Self>;

    fn attributes(&self) -> Vec<Self>;

    fn local_name(&self) -> Option<&str> {
        self.name().map(|n| n.split_once(':').map_or(n, |(_, local)| local))
    }

    fn prefix(&self) -> Option<&str> {
        self.name().and_then(|n| n.split_once(':')).map(|(prefix, _)| prefix)
    }

    fn attribute(&self, name: &str) -> Option<Self> {
        self.attributes().into_iter().find(|a| a.name() == Some(name))
    }
}
