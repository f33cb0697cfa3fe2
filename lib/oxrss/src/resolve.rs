use crate::error::RssSyntaxError;
use crate::model::{Feed, FieldValue, Item};
use crate::vocab::{Field, NodeType};
use oxiri::Iri;
use oxrdf::{BlankNode, NamedNode, NamedOrBlankNode};
use tracing::warn;

/// Parses a IRI found in a document, resolving it against the base IRI if there is one.
///
/// Invalid IRIs are logged and dropped.
pub(crate) fn parse_iri(base_iri: Option<&Iri<String>>, value: &str) -> Option<NamedNode> {
    let value = value.trim();
    let result = if let Some(base_iri) = base_iri {
        base_iri.resolve(value)
    } else {
        Iri::parse(value.to_owned())
    };
    match result {
        Ok(iri) => Some(NamedNode::new_unchecked(iri.into_inner())),
        Err(error) => {
            warn!(iri = value, %error, "ignoring invalid IRI");
            None
        }
    }
}

/// Assigns a RDF node to the channel and to every non-empty node and enclosure of the feed.
///
/// Fails if the feed has no channel.
pub(crate) fn resolve_identifiers(
    feed: &mut Feed,
    base_iri: Option<&Iri<String>>,
) -> Result<(), RssSyntaxError> {
    if feed.channel().is_none() {
        return Err(RssSyntaxError::msg("No RSS channel item present"));
    }
    for item in feed.nodes_mut() {
        if item.node_type() == NodeType::Channel || !item.is_empty() {
            resolve_item(item, base_iri);
        }
    }
    if feed.channel().and_then(Item::identifier).is_none() {
        return Err(RssSyntaxError::msg("RSS channel has no identifier"));
    }
    Ok(())
}

fn resolve_item(item: &mut Item, base_iri: Option<&Iri<String>>) {
    if item.identifier().is_none() {
        let identifier = item
            .subject()
            .cloned()
            .or_else(|| {
                identifier_fields(item.node_type())
                    .iter()
                    .flat_map(|field| item.values(*field))
                    .find_map(|value| value_identifier(value, base_iri))
            })
            .unwrap_or_else(|| BlankNode::default().into());
        item.set_identifier(identifier);
    }
    for enclosure in item.enclosures_mut() {
        let identifier = enclosure
            .url()
            .cloned()
            .map_or_else(|| BlankNode::default().into(), NamedOrBlankNode::from);
        enclosure.set_identifier(identifier);
    }
}

/// Fields whose values may identify a node, by decreasing priority.
fn identifier_fields(node_type: NodeType) -> &'static [Field] {
    match node_type {
        NodeType::Image => &[Field::Url],
        NodeType::Channel => &[Field::Link, Field::AtomId],
        NodeType::Item => &[Field::Link, Field::AtomLink],
        _ => &[Field::Link],
    }
}

fn value_identifier(value: &FieldValue, base_iri: Option<&Iri<String>>) -> Option<NamedOrBlankNode> {
    match value {
        FieldValue::Literal(text) => parse_iri(base_iri, text).map(Into::into),
        FieldValue::Resource(node) => Some(node.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Enclosure;

    fn literal(value: &str) -> FieldValue {
        FieldValue::Literal(value.into())
    }

    fn named(iri: &str) -> NamedOrBlankNode {
        NamedNode::new_unchecked(iri).into()
    }

    #[test]
    fn missing_channel_fails() {
        let mut feed = Feed::default();
        feed.push(NodeType::Item)
            .add_value(Field::Title, literal("orphan"));
        let error = resolve_identifiers(&mut feed, None).unwrap_err();
        assert_eq!(error.to_string(), "No RSS channel item present");
    }

    #[test]
    fn candidate_fields() -> Result<(), RssSyntaxError> {
        let mut feed = Feed::default();
        feed.push(NodeType::Channel)
            .add_value(Field::AtomId, literal("http://example.com/feed"));
        let image = feed.push(NodeType::Image);
        image.add_value(Field::Link, literal("http://example.com/"));
        image.add_value(Field::Url, literal("http://example.com/logo.png"));
        feed.push(NodeType::TextInput)
            .add_value(Field::Link, literal("http://example.com/search"));
        let item = feed.push(NodeType::Item);
        item.add_value(Field::AtomLink, literal("http://example.com/1"));
        item.add_value(Field::Link, literal("not an IRI"));
        resolve_identifiers(&mut feed, None)?;

        assert_eq!(
            feed.channel().and_then(Item::identifier),
            Some(&named("http://example.com/feed"))
        );
        assert_eq!(
            feed.common(NodeType::Image)[0].identifier(),
            Some(&named("http://example.com/logo.png"))
        );
        assert_eq!(
            feed.common(NodeType::TextInput)[0].identifier(),
            Some(&named("http://example.com/search"))
        );
        assert_eq!(
            feed.items()[0].identifier(),
            Some(&named("http://example.com/1"))
        );
        Ok(())
    }

    #[test]
    fn fallbacks() -> Result<(), RssSyntaxError> {
        let mut feed = Feed::default();
        feed.push(NodeType::Channel);
        feed.push(NodeType::Item);
        let item = feed.push(NodeType::Item);
        item.add_value(Field::Title, literal("no link"));
        item.push_enclosure(Enclosure::default());
        let mut with_url = Enclosure::default();
        with_url.set_url(NamedNode::new_unchecked("http://example.com/a.mp3"));
        item.push_enclosure(with_url);
        resolve_identifiers(&mut feed, None)?;

        assert!(
            feed.channel()
                .and_then(Item::identifier)
                .is_some_and(NamedOrBlankNode::is_blank_node)
        );
        assert_eq!(feed.items()[0].identifier(), None, "empty items are skipped");
        let item = &feed.items()[1];
        assert!(item.identifier().is_some_and(NamedOrBlankNode::is_blank_node));
        assert!(
            item.enclosures()[0]
                .identifier()
                .is_some_and(NamedOrBlankNode::is_blank_node)
        );
        assert_eq!(
            item.enclosures()[1].identifier(),
            Some(&named("http://example.com/a.mp3"))
        );
        Ok(())
    }

    #[test]
    fn explicit_subject_wins() -> Result<(), RssSyntaxError> {
        let mut feed = Feed::default();
        feed.common_mut(NodeType::Channel).push(Item::with_subject(
            NodeType::Channel,
            named("http://example.com/channel"),
        ));
        if let Some(channel) = feed.last_mut(NodeType::Channel) {
            channel.add_value(Field::Link, literal("http://example.com/other"));
        }
        resolve_identifiers(&mut feed, None)?;
        assert_eq!(
            feed.channel().and_then(Item::identifier),
            Some(&named("http://example.com/channel"))
        );
        Ok(())
    }

    #[test]
    fn relative_links_use_base() -> Result<(), Box<dyn std::error::Error>> {
        let base = Iri::parse("http://example.com/blog/".to_owned())?;
        let mut feed = Feed::default();
        feed.push(NodeType::Channel)
            .add_value(Field::Link, literal(" posts/ "));
        resolve_identifiers(&mut feed, Some(&base))?;
        assert_eq!(
            feed.channel().and_then(Item::identifier),
            Some(&named("http://example.com/blog/posts/"))
        );
        Ok(())
    }
}
