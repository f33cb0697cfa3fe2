use crate::vocab::{Field, NodeType};
use oxrdf::{NamedNode, NamedOrBlankNode};
use std::fmt;

/// A value of a field: either some text or a reference to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Literal(String),
    Resource(NamedOrBlankNode),
}

impl FieldValue {
    /// The textual form of the value: the text itself or the node IRI / blank node id.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(value) => value,
            Self::Resource(NamedOrBlankNode::NamedNode(node)) => node.as_str(),
            Self::Resource(NamedOrBlankNode::BlankNode(node)) => node.as_str(),
        }
    }
}

impl fmt::Display for FieldValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "\"{value}\""),
            Self::Resource(node) => write!(f, "{node}"),
        }
    }
}

/// An RSS 2.0 enclosure attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    identifier: Option<NamedOrBlankNode>,
    url: Option<NamedNode>,
    length: Option<String>,
    mime_type: Option<String>,
}

impl Enclosure {
    /// The RDF node of the enclosure, assigned when the feed is resolved.
    #[inline]
    pub fn identifier(&self) -> Option<&NamedOrBlankNode> {
        self.identifier.as_ref()
    }

    #[inline]
    pub fn url(&self) -> Option<&NamedNode> {
        self.url.as_ref()
    }

    /// The declared size in bytes, as written in the document.
    #[inline]
    pub fn length(&self) -> Option<&str> {
        self.length.as_deref()
    }

    #[inline]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub(crate) fn set_identifier(&mut self, identifier: NamedOrBlankNode) {
        if self.identifier.is_none() {
            self.identifier = Some(identifier);
        }
    }

    pub(crate) fn set_url(&mut self, url: NamedNode) {
        self.url = Some(url);
    }

    pub(crate) fn set_length(&mut self, length: String) {
        self.length = Some(length);
    }

    pub(crate) fn set_mime_type(&mut self, mime_type: String) {
        self.mime_type = Some(mime_type);
    }
}

/// A node of a feed (the channel, an image, an item...) with its field values.
///
/// Each field may hold several values, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    node_type: NodeType,
    subject: Option<NamedOrBlankNode>,
    identifier: Option<NamedOrBlankNode>,
    fields: [Vec<FieldValue>; Field::COUNT],
    enclosures: Vec<Enclosure>,
}

impl Item {
    pub(crate) fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            subject: None,
            identifier: None,
            fields: std::array::from_fn(|_| Vec::new()),
            enclosures: Vec::new(),
        }
    }

    /// Builds an item for a node already identified in a RDF graph.
    pub(crate) fn with_subject(node_type: NodeType, subject: NamedOrBlankNode) -> Self {
        let mut item = Self::new(node_type);
        item.identifier = Some(subject.clone());
        item.subject = Some(subject);
        item
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// The node explicitly given for this item, if it has been built from RDF.
    #[inline]
    pub fn subject(&self) -> Option<&NamedOrBlankNode> {
        self.subject.as_ref()
    }

    /// The RDF node of the item, assigned when the feed is resolved.
    #[inline]
    pub fn identifier(&self) -> Option<&NamedOrBlankNode> {
        self.identifier.as_ref()
    }

    /// The values of a field, in insertion order.
    #[inline]
    pub fn values(&self, field: Field) -> &[FieldValue] {
        &self.fields[field.index()]
    }

    /// The non-empty fields, in field order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, &[FieldValue])> {
        Field::all()
            .zip(&self.fields)
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| (field, values.as_slice()))
    }

    /// The number of fields with at least one value.
    #[inline]
    pub fn fields_count(&self) -> usize {
        self.fields.iter().filter(|values| !values.is_empty()).count()
    }

    #[inline]
    pub fn enclosures(&self) -> &[Enclosure] {
        &self.enclosures
    }

    /// An empty item has been opened in the document but got nothing: it is not part of any output.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.enclosures.is_empty() && self.fields.iter().all(Vec::is_empty)
    }

    pub(crate) fn add_value(&mut self, field: Field, value: FieldValue) {
        self.fields[field.index()].push(value);
    }

    pub(crate) fn take_values(&mut self, field: Field) -> Vec<FieldValue> {
        std::mem::take(&mut self.fields[field.index()])
    }

    pub(crate) fn set_identifier(&mut self, identifier: NamedOrBlankNode) {
        if self.identifier.is_none() {
            self.identifier = Some(identifier);
        }
    }

    pub(crate) fn push_enclosure(&mut self, enclosure: Enclosure) -> &mut Enclosure {
        self.enclosures.push(enclosure);
        let last = self.enclosures.len() - 1;
        &mut self.enclosures[last]
    }

    pub(crate) fn last_enclosure_mut(&mut self) -> Option<&mut Enclosure> {
        self.enclosures.last_mut()
    }

    pub(crate) fn enclosures_mut(&mut self) -> &mut [Enclosure] {
        &mut self.enclosures
    }
}

/// The content of a feed document: the nodes of each common type and the item sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    common: [Vec<Item>; NodeType::COUNT],
    items: Vec<Item>,
}

impl Feed {
    /// The channel of the feed.
    #[inline]
    pub fn channel(&self) -> Option<&Item> {
        self.common[NodeType::Channel.index()].first()
    }

    /// The nodes of a type other than [`NodeType::Item`], in document order.
    #[inline]
    pub fn common(&self, node_type: NodeType) -> &[Item] {
        &self.common[node_type.index()]
    }

    /// The items (or Atom entries), in document order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Nodes of a type other than item in table order, then the items.
    pub fn nodes(&self) -> impl Iterator<Item = &Item> {
        self.common.iter().flatten().chain(&self.items)
    }

    pub(crate) fn common_mut(&mut self, node_type: NodeType) -> &mut Vec<Item> {
        &mut self.common[node_type.index()]
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.common.iter_mut().flatten().chain(&mut self.items)
    }

    /// Appends a new node of the given type and returns it.
    pub(crate) fn push(&mut self, node_type: NodeType) -> &mut Item {
        let list = if node_type == NodeType::Item {
            &mut self.items
        } else {
            &mut self.common[node_type.index()]
        };
        list.push(Item::new(node_type));
        let last = list.len() - 1;
        &mut list[last]
    }

    /// The node that is currently filled for the given type: the last one appended.
    pub(crate) fn last_mut(&mut self, node_type: NodeType) -> Option<&mut Item> {
        if node_type == NodeType::Item {
            self.items.last_mut()
        } else {
            self.common[node_type.index()].last_mut()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::BlankNode;

    #[test]
    fn item_fields_keep_insertion_order() {
        let mut item = Item::new(NodeType::Item);
        assert!(item.is_empty());
        item.add_value(Field::Category, FieldValue::Literal("b".into()));
        item.add_value(Field::Title, FieldValue::Literal("t".into()));
        item.add_value(Field::Category, FieldValue::Literal("a".into()));
        assert_eq!(item.fields_count(), 2);
        assert!(!item.is_empty());
        assert_eq!(
            item.values(Field::Category),
            [
                FieldValue::Literal("b".into()),
                FieldValue::Literal("a".into())
            ]
        );
        let order = item.fields().map(|(f, _)| f).collect::<Vec<_>>();
        assert_eq!(order, [Field::Title, Field::Category]);
    }

    #[test]
    fn identifier_is_assigned_once() {
        let mut item = Item::new(NodeType::Channel);
        let first = NamedOrBlankNode::from(NamedNode::new_unchecked("http://example.com/"));
        item.set_identifier(first.clone());
        item.set_identifier(BlankNode::default().into());
        assert_eq!(item.identifier(), Some(&first));
    }

    #[test]
    fn enclosure_makes_item_populated() {
        let mut item = Item::new(NodeType::Item);
        item.push_enclosure(Enclosure::default());
        assert_eq!(item.fields_count(), 0);
        assert!(!item.is_empty());
    }

    #[test]
    fn feed_lists() {
        let mut feed = Feed::default();
        feed.push(NodeType::Channel);
        feed.push(NodeType::Image);
        feed.push(NodeType::Item);
        feed.push(NodeType::Item);
        assert!(feed.channel().is_some());
        assert_eq!(feed.common(NodeType::Image).len(), 1);
        assert_eq!(feed.items().len(), 2);
        assert_eq!(feed.nodes().count(), 4);
        assert_eq!(
            feed.last_mut(NodeType::Item).map(|i| i.node_type()),
            Some(NodeType::Item)
        );
        assert!(feed.last_mut(NodeType::TextInput).is_none());
    }
}
