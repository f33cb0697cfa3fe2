use crate::error::RssSyntaxError;
use crate::model::{Enclosure, Feed, FieldValue, Item};
use crate::vocab::{Field, NodeType, rdf_ordinal};
use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, Literal, NamedOrBlankNode, Term, Triple};

/// Converts a resolved feed into RDF triples.
///
/// The channel comes first, then the other nodes and finally the items, each of them linked from
/// a `rdf:Seq` attached to the channel with `rss:items`.
pub(crate) fn emit_feed(feed: &Feed, output: &mut Vec<Triple>) -> Result<(), RssSyntaxError> {
    let channel = feed
        .channel()
        .ok_or_else(|| RssSyntaxError::msg("No RSS channel item present"))?;
    let channel_id = channel
        .identifier()
        .ok_or_else(|| RssSyntaxError::msg("RSS channel has no identifier"))?;
    emit_item(channel, output)?;

    for node_type in NodeType::ALL {
        if matches!(node_type, NodeType::Channel | NodeType::Item) {
            continue;
        }
        let Some(type_iri) = node_type.iri() else {
            continue;
        };
        for item in feed.common(node_type).iter().filter(|i| !i.is_empty()) {
            let id = emit_item(item, output)?;
            output.push(Triple::new(channel_id.clone(), type_iri, id.clone()));
        }
    }

    let mut items = feed.items().iter().filter(|i| !i.is_empty()).peekable();
    if items.peek().is_some() {
        let sequence = NamedOrBlankNode::from(BlankNode::default());
        output.push(Triple::new(sequence.clone(), rdf::TYPE, rdf::SEQ));
        if let Some(items_iri) = Field::Items.iri() {
            output.push(Triple::new(channel_id.clone(), items_iri, sequence.clone()));
        }
        for (i, item) in items.enumerate() {
            let id = emit_item(item, output)?;
            output.push(Triple::new(sequence.clone(), rdf_ordinal(i + 1), id.clone()));
        }
    }
    Ok(())
}

fn emit_item<'a>(
    item: &'a Item,
    output: &mut Vec<Triple>,
) -> Result<&'a NamedOrBlankNode, RssSyntaxError> {
    let id = item.identifier().ok_or_else(|| {
        RssSyntaxError::msg(format!("RSS {} has no identifier", item.node_type().name()))
    })?;
    if let Some(type_iri) = item.node_type().iri() {
        output.push(Triple::new(id.clone(), rdf::TYPE, type_iri));
    }
    for (field, values) in item.fields() {
        if field == Field::Items || field.is_enclosure() {
            continue;
        }
        let Some(predicate) = field.iri() else {
            continue;
        };
        for value in values {
            output.push(Triple::new(id.clone(), predicate, value_term(value)));
        }
    }
    for enclosure in item.enclosures() {
        emit_enclosure(id, enclosure, output)?;
    }
    Ok(id)
}

fn emit_enclosure(
    item_id: &NamedOrBlankNode,
    enclosure: &Enclosure,
    output: &mut Vec<Triple>,
) -> Result<(), RssSyntaxError> {
    let id = enclosure
        .identifier()
        .ok_or_else(|| RssSyntaxError::msg("RSS enclosure has no identifier"))?;
    if let Some(predicate) = Field::EncEnclosure.iri() {
        output.push(Triple::new(item_id.clone(), predicate, id.clone()));
    }
    if let Some(type_iri) = NodeType::Enclosure.iri() {
        output.push(Triple::new(id.clone(), rdf::TYPE, type_iri));
    }
    if let (Some(url), Some(predicate)) = (enclosure.url(), Field::EncUrl.iri()) {
        output.push(Triple::new(id.clone(), predicate, url.clone()));
    }
    emit_literal(id, Field::EncType, enclosure.mime_type(), output);
    emit_literal(id, Field::EncLength, enclosure.length(), output);
    Ok(())
}

fn emit_literal(id: &NamedOrBlankNode, field: Field, value: Option<&str>, output: &mut Vec<Triple>) {
    let (Some(value), Some(predicate)) = (value, field.iri()) else {
        return;
    };
    output.push(Triple::new(
        id.clone(),
        predicate,
        Literal::new_simple_literal(value),
    ));
}

fn value_term(value: &FieldValue) -> Term {
    match value {
        FieldValue::Literal(value) => Literal::new_simple_literal(value).into(),
        FieldValue::Resource(node) => node.clone().into(),
    }
}
