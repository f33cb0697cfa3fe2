use crate::model::{Enclosure, Feed, FieldValue, Item};
use crate::vocab::{Field, NodeType, ordinal_position};
use oxrdf::vocab::rdf;
use oxrdf::{NamedOrBlankNode, Subject, Term, Triple};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
enum NodeSlot {
    Common(NodeType, usize),
    Item(usize),
}

/// What a RDF subject has been typed as.
///
/// A subject can be both a node and an enclosure: a podcast item whose link is its media file.
#[derive(Debug, Clone, Copy, Default)]
struct Slots {
    node: Option<NodeSlot>,
    enclosure: Option<usize>,
}

/// Rebuilds a [`Feed`] from RDF triples, whatever their order.
///
/// The typed subjects are found first, then the other triples are placed on them.
/// Triples that do not fit anywhere are logged and dropped.
pub(crate) fn reconstruct_feed(triples: Vec<Triple>) -> Feed {
    let mut reconstruction = Reconstruction::default();
    let mut statements = Vec::with_capacity(triples.len());
    for triple in triples {
        if !reconstruction.classify(&triple) {
            statements.push(triple);
        }
    }

    let mut overflow = Vec::new();
    for triple in statements {
        reconstruction.place(triple, &mut overflow);
    }
    if !overflow.is_empty() {
        warn!(
            count = overflow.len(),
            "dropping statements that are not about a feed node"
        );
        for triple in &overflow {
            debug!(%triple, "dropped statement");
        }
    }
    reconstruction.finish()
}

#[derive(Default)]
struct Reconstruction {
    feed: Feed,
    items: Vec<Item>,
    enclosures: Vec<Enclosure>,
    subjects: HashMap<NamedOrBlankNode, Slots>,
    sequence: Option<NamedOrBlankNode>,
    members: Vec<(usize, NamedOrBlankNode)>,
}

impl Reconstruction {
    /// Registers `rdf:type` triples on known classes. Returns `false` for any other triple.
    fn classify(&mut self, triple: &Triple) -> bool {
        let Term::NamedNode(class) = &triple.object else {
            return false;
        };
        if triple.predicate != rdf::TYPE {
            return false;
        }
        let Some(subject) = subject_node(&triple.subject) else {
            return false;
        };
        if *class == rdf::SEQ {
            if self.sequence.as_ref().is_some_and(|s| *s != subject) {
                debug!(sequence = %subject, "ignoring extra item sequence");
                return false;
            }
            self.sequence = Some(subject);
            return true;
        }
        let Some(node_type) = NodeType::from_iri(class.as_ref()) else {
            return false;
        };
        self.add_node(subject, node_type);
        true
    }

    fn add_node(&mut self, subject: NamedOrBlankNode, node_type: NodeType) {
        let slots = self.subjects.entry(subject.clone()).or_default();
        if node_type == NodeType::Enclosure {
            if slots.enclosure.is_none() {
                let mut enclosure = Enclosure::default();
                enclosure.set_identifier(subject);
                slots.enclosure = Some(self.enclosures.len());
                self.enclosures.push(enclosure);
            }
            return;
        }
        if slots.node.is_some() {
            debug!(%subject, node = node_type.name(), "subject already has a node type");
            return;
        }
        if node_type == NodeType::Item {
            slots.node = Some(NodeSlot::Item(self.items.len()));
            self.items.push(Item::with_subject(node_type, subject));
        } else {
            let list = self.feed.common_mut(node_type);
            slots.node = Some(NodeSlot::Common(node_type, list.len()));
            list.push(Item::with_subject(node_type, subject));
        }
    }

    fn place(&mut self, triple: Triple, overflow: &mut Vec<Triple>) {
        let Some(subject) = subject_node(&triple.subject) else {
            return overflow.push(triple);
        };
        if self.sequence.as_ref() == Some(&subject) {
            if let (Some(position), Some(member)) = (
                ordinal_position(triple.predicate.as_ref()),
                term_node(&triple.object),
            ) {
                self.members.push((position, member));
                return;
            }
            return overflow.push(triple);
        }
        if self.is_membership(&triple) {
            return;
        }
        let Some(field) = Field::from_iri(triple.predicate.as_ref()) else {
            return overflow.push(triple);
        };
        if field == Field::Items {
            return; // The sequence is rebuilt from the items
        }
        let slots = self.subjects.get(&subject).copied().unwrap_or_default();
        if matches!(field, Field::EncUrl | Field::EncLength | Field::EncType) {
            if let Some(index) = slots.enclosure {
                if self.set_enclosure_field(index, field, &triple.object) {
                    return;
                }
            }
            return overflow.push(triple);
        }
        let (Some(node), Some(value)) = (slots.node, term_value(&triple.object)) else {
            return overflow.push(triple);
        };
        self.node_mut(node).add_value(field, value);
    }

    /// The link from the channel to one of its images, text inputs...
    fn is_membership(&self, triple: &Triple) -> bool {
        let Some(node_type) = NodeType::from_iri(triple.predicate.as_ref()) else {
            return false;
        };
        term_node(&triple.object)
            .and_then(|object| self.subjects.get(&object))
            .is_some_and(|slots| {
                matches!(slots.node, Some(NodeSlot::Common(t, _)) if t == node_type)
            })
    }

    fn set_enclosure_field(&mut self, index: usize, field: Field, object: &Term) -> bool {
        let enclosure = &mut self.enclosures[index];
        match (field, object) {
            (Field::EncUrl, Term::NamedNode(url)) => enclosure.set_url(url.clone()),
            (Field::EncLength, Term::Literal(length)) => {
                enclosure.set_length(length.value().to_owned());
            }
            (Field::EncType, Term::Literal(mime_type)) => {
                enclosure.set_mime_type(mime_type.value().to_owned());
            }
            _ => return false,
        }
        true
    }

    fn node_mut(&mut self, node: NodeSlot) -> &mut Item {
        match node {
            NodeSlot::Common(node_type, index) => &mut self.feed.common_mut(node_type)[index],
            NodeSlot::Item(index) => &mut self.items[index],
        }
    }

    fn finish(mut self) -> Feed {
        // Items are ordered by their sequence position then by arrival
        self.members.sort_by_key(|(position, _)| *position);
        let mut order = Vec::with_capacity(self.items.len());
        let mut placed = vec![false; self.items.len()];
        for (_, member) in &self.members {
            match self.subjects.get(member).and_then(|slots| slots.node) {
                Some(NodeSlot::Item(index)) if !placed[index] => {
                    placed[index] = true;
                    order.push(index);
                }
                Some(NodeSlot::Item(_)) => debug!(%member, "item listed twice in the sequence"),
                _ => warn!(%member, "ignoring sequence member that is not an item"),
            }
        }
        order.extend((0..self.items.len()).filter(|index| !placed[*index]));

        let mut items = self.items.into_iter().map(Some).collect::<Vec<_>>();
        let mut linked = vec![false; self.enclosures.len()];
        for index in order {
            if let Some(mut item) = items[index].take() {
                attach_enclosures(&mut item, &self.subjects, &self.enclosures, &mut linked);
                self.feed.items_mut().push(item);
            }
        }
        for (enclosure, _) in self.enclosures.iter().zip(&linked).filter(|(_, l)| !**l) {
            if let Some(identifier) = enclosure.identifier() {
                warn!(enclosure = %identifier, "dropping enclosure that no item links to");
            }
        }

        let channels = self.feed.common_mut(NodeType::Channel);
        if channels.len() > 1 {
            for extra in channels.drain(1..) {
                if let Some(subject) = extra.subject() {
                    warn!(channel = %subject, "dropping extra channel");
                }
            }
        }
        for node in self.feed.nodes_mut() {
            if node.node_type() != NodeType::Item && !node.values(Field::EncEnclosure).is_empty() {
                debug!(node = node.node_type().name(), "ignoring enclosures outside of items");
                node.take_values(Field::EncEnclosure);
            }
        }
        self.feed
    }
}

fn attach_enclosures(
    item: &mut Item,
    subjects: &HashMap<NamedOrBlankNode, Slots>,
    enclosures: &[Enclosure],
    linked: &mut [bool],
) {
    for reference in item.take_values(Field::EncEnclosure) {
        let index = match &reference {
            FieldValue::Resource(node) => subjects
                .get(node)
                .and_then(|slots| slots.enclosure)
                .filter(|index| *index < enclosures.len()),
            FieldValue::Literal(_) => None,
        };
        if let Some(index) = index {
            linked[index] = true;
            item.push_enclosure(enclosures[index].clone());
        } else {
            warn!(enclosure = %reference, "ignoring reference to an unknown enclosure");
        }
    }
}

#[allow(clippy::match_wildcard_for_single_variants, unreachable_patterns)]
fn subject_node(subject: &Subject) -> Option<NamedOrBlankNode> {
    match subject {
        Subject::NamedNode(node) => Some(node.clone().into()),
        Subject::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}

#[allow(clippy::match_wildcard_for_single_variants, unreachable_patterns)]
fn term_node(term: &Term) -> Option<NamedOrBlankNode> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}

fn term_value(term: &Term) -> Option<FieldValue> {
    if let Term::Literal(literal) = term {
        return Some(FieldValue::Literal(literal.value().to_owned()));
    }
    term_node(term).map(FieldValue::Resource)
}
