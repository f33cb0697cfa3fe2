use crate::model::{Feed, FieldValue, Item};
use crate::reconstruct::reconstruct_feed;
use crate::vocab::{Field, Namespace, NodeType};
use oxrdf::{NamedOrBlankNode, SubjectRef, TermRef, Triple, TripleRef};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io;
use std::io::Write;
use std::sync::Arc;
#[cfg(feature = "async-tokio")]
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// A [RSS 1.0](https://web.resource.org/rss/1.0/spec) serializer of RDF triples.
///
/// The triples are grouped back into a channel, its items and its other nodes, in any order.
/// Nothing is written before [`finish`](WriterRssSerializer::finish) is called.
/// Triples that are not about a node of the feed are dropped.
///
/// ```
/// use oxrdf::vocab::rdf;
/// use oxrdf::{LiteralRef, NamedNodeRef, TripleRef};
/// use oxrss::RssSerializer;
///
/// let channel = NamedNodeRef::new("http://example.com/")?;
/// let mut serializer = RssSerializer::new().for_writer(Vec::new());
/// serializer.serialize_triple(TripleRef::new(
///     channel,
///     rdf::TYPE,
///     NamedNodeRef::new("http://purl.org/rss/1.0/channel")?,
/// ))?;
/// serializer.serialize_triple(TripleRef::new(
///     channel,
///     NamedNodeRef::new("http://purl.org/rss/1.0/title")?,
///     LiteralRef::new_simple_literal("News"),
/// ))?;
/// let output = String::from_utf8(serializer.finish()?)?;
/// assert!(output.contains(r#"<channel rdf:about="http://example.com/">"#));
/// assert!(output.contains("<title>News</title>"));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct RssSerializer;

impl RssSerializer {
    /// Builds a new [`RssSerializer`].
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Writes a RSS 1.0 file to a [`Write`] implementation.
    ///
    /// ```
    /// use oxrdf::vocab::rdf;
    /// use oxrdf::{LiteralRef, NamedNodeRef, TripleRef};
    /// use oxrss::RssSerializer;
    ///
    /// let item = NamedNodeRef::new("http://example.com/1")?;
    /// let mut serializer = RssSerializer::new().for_writer(Vec::new());
    /// serializer.serialize_triple(TripleRef::new(
    ///     item,
    ///     rdf::TYPE,
    ///     NamedNodeRef::new("http://purl.org/rss/1.0/item")?,
    /// ))?;
    /// serializer.serialize_triple(TripleRef::new(
    ///     item,
    ///     NamedNodeRef::new("http://purl.org/dc/elements/1.1/creator")?,
    ///     LiteralRef::new_simple_literal("Alice"),
    /// ))?;
    /// let output = String::from_utf8(serializer.finish()?)?;
    /// assert!(output.contains(r#"<item rdf:about="http://example.com/1">"#));
    /// assert!(output.contains("<dc:creator>Alice</dc:creator>"));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[allow(clippy::unused_self)]
    pub fn for_writer<W: Write>(self, writer: W) -> WriterRssSerializer<W> {
        WriterRssSerializer {
            writer: Writer::new_with_indent(writer, b' ', 2),
            inner: InnerRssSerializer::default(),
        }
    }

    /// Writes a RSS 1.0 file to a [`AsyncWrite`] implementation.
    ///
    /// ```
    /// use oxrdf::vocab::rdf;
    /// use oxrdf::{NamedNodeRef, TripleRef};
    /// use oxrss::RssSerializer;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let channel = NamedNodeRef::new("http://example.com/")?;
    /// let mut serializer = RssSerializer::new().for_tokio_async_writer(Vec::new());
    /// serializer.serialize_triple(TripleRef::new(
    ///     channel,
    ///     rdf::TYPE,
    ///     NamedNodeRef::new("http://purl.org/rss/1.0/channel")?,
    /// ))?;
    /// let output = String::from_utf8(serializer.finish().await?)?;
    /// assert!(output.contains(r#"<channel rdf:about="http://example.com/"/>"#));
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::unused_self)]
    #[cfg(feature = "async-tokio")]
    pub fn for_tokio_async_writer<W: AsyncWrite + Unpin>(
        self,
        writer: W,
    ) -> TokioAsyncWriterRssSerializer<W> {
        TokioAsyncWriterRssSerializer {
            writer: Writer::new_with_indent(writer, b' ', 2),
            inner: InnerRssSerializer::default(),
        }
    }
}

/// Writes a RSS 1.0 file to a [`Write`] implementation.
///
/// Can be built using [`RssSerializer::for_writer`].
#[must_use]
pub struct WriterRssSerializer<W: Write> {
    writer: Writer<W>,
    inner: InnerRssSerializer,
}

impl<W: Write> WriterRssSerializer<W> {
    /// Adds a triple to the feed.
    ///
    /// Fails if the triple is not a plain RDF triple (RDF-star).
    pub fn serialize_triple<'a>(&mut self, t: impl Into<TripleRef<'a>>) -> io::Result<()> {
        self.inner.serialize_triple(t)
    }

    /// Writes the feed and returns the underlying [`Write`].
    pub fn finish(mut self) -> io::Result<W> {
        let feed = self.inner.finish();
        let mut buffer = Vec::new();
        write_feed(&feed, &mut buffer);
        for event in buffer {
            self.writer.write_event(event).map_err(map_err)?;
        }
        self.writer.get_mut().flush()?;
        Ok(self.writer.into_inner())
    }
}

/// Writes a RSS 1.0 file to a [`AsyncWrite`] implementation.
///
/// Can be built using [`RssSerializer::for_tokio_async_writer`].
#[cfg(feature = "async-tokio")]
#[must_use]
pub struct TokioAsyncWriterRssSerializer<W: AsyncWrite + Unpin> {
    writer: Writer<W>,
    inner: InnerRssSerializer,
}

#[cfg(feature = "async-tokio")]
impl<W: AsyncWrite + Unpin> TokioAsyncWriterRssSerializer<W> {
    /// Adds a triple to the feed.
    ///
    /// Fails if the triple is not a plain RDF triple (RDF-star).
    pub fn serialize_triple<'a>(&mut self, t: impl Into<TripleRef<'a>>) -> io::Result<()> {
        self.inner.serialize_triple(t)
    }

    /// Writes the feed and returns the underlying [`AsyncWrite`].
    pub async fn finish(mut self) -> io::Result<W> {
        use tokio::io::AsyncWriteExt;

        let feed = self.inner.finish();
        let mut buffer = Vec::new();
        write_feed(&feed, &mut buffer);
        for event in buffer {
            self.writer
                .write_event_async(event)
                .await
                .map_err(map_err)?;
        }
        self.writer.get_mut().flush().await?;
        Ok(self.writer.into_inner())
    }
}

#[derive(Default)]
struct InnerRssSerializer {
    triples: Vec<Triple>,
}

impl InnerRssSerializer {
    #[allow(clippy::match_wildcard_for_single_variants, unreachable_patterns)]
    fn serialize_triple<'a>(&mut self, t: impl Into<TripleRef<'a>>) -> io::Result<()> {
        let triple = t.into();
        match triple.subject {
            SubjectRef::NamedNode(_) | SubjectRef::BlankNode(_) => (),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "RSS only supports named or blank subject",
                ));
            }
        }
        match triple.object {
            TermRef::NamedNode(_) | TermRef::BlankNode(_) | TermRef::Literal(_) => (),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "RSS only supports named, blank or literal object",
                ));
            }
        }
        self.triples.push(triple.into_owned());
        Ok(())
    }

    fn finish(&mut self) -> Feed {
        reconstruct_feed(std::mem::take(&mut self.triples))
    }
}

fn write_feed<'a>(feed: &'a Feed, output: &mut Vec<Event<'a>>) {
    output.push(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
    let mut root = BytesStart::new("rdf:RDF");
    root.push_attribute(("xmlns:rdf", RDF_NAMESPACE));
    if let Some(uri) = Namespace::Rss10.uri() {
        root.push_attribute(("xmlns", uri));
    }
    for namespace in Namespace::ALL {
        if let (Some(prefix), Some(uri)) = (namespace.prefix(), namespace.uri()) {
            root.push_attribute((format!("xmlns:{prefix}").as_str(), uri));
        }
    }
    output.push(Event::Start(root));

    let items = feed
        .items()
        .iter()
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>();
    let others = NodeType::ALL
        .into_iter()
        .filter(|t| *t != NodeType::Channel && *t != NodeType::Item && !t.is_ignored())
        .flat_map(|t| feed.common(t))
        .filter(|node| !node.is_empty())
        .collect::<Vec<_>>();

    if let Some(channel) = feed.channel() {
        write_channel(channel, &others, &items, output);
    } else {
        warn!("no RSS channel in the serialized triples");
    }
    for item in &items {
        write_node(item, output);
    }
    for node in &others {
        write_node(node, output);
    }
    debug!(
        items = items.len(),
        others = others.len(),
        "RSS 1.0 document written"
    );
    output.push(Event::End(BytesEnd::new("rdf:RDF")));
}

fn write_channel<'a>(
    channel: &'a Item,
    others: &[&'a Item],
    items: &[&'a Item],
    output: &mut Vec<Event<'a>>,
) {
    let Some(start) = node_start(channel) else {
        return;
    };
    let references = others
        .iter()
        .filter_map(|node| Some((node.node_type(), node.identifier()?)))
        .collect::<Vec<_>>();
    if channel.fields_count() == 0 && references.is_empty() && items.is_empty() {
        output.push(Event::Empty(start));
        return;
    }
    let end = start.to_end().into_owned();
    output.push(Event::Start(start));
    write_fields(channel, output);
    for (node_type, identifier) in references {
        let mut reference = BytesStart::new(element_name(node_type.namespace(), node_type.name()));
        push_reference(&mut reference, "rdf:resource", identifier);
        output.push(Event::Empty(reference));
    }
    if !items.is_empty() {
        output.push(Event::Start(BytesStart::new("items")));
        output.push(Event::Start(BytesStart::new("rdf:Seq")));
        for identifier in items.iter().filter_map(|item| item.identifier()) {
            let mut member = BytesStart::new("rdf:li");
            push_reference(&mut member, "rdf:resource", identifier);
            output.push(Event::Empty(member));
        }
        output.push(Event::End(BytesEnd::new("rdf:Seq")));
        output.push(Event::End(BytesEnd::new("items")));
    }
    output.push(Event::End(end));
}

fn write_node<'a>(node: &'a Item, output: &mut Vec<Event<'a>>) {
    let Some(start) = node_start(node) else {
        return;
    };
    let end = start.to_end().into_owned();
    output.push(Event::Start(start));
    write_fields(node, output);
    for enclosure in node.enclosures() {
        let Some(identifier) = enclosure.identifier() else {
            continue;
        };
        let mut element = BytesStart::new("enc:enclosure");
        push_reference(&mut element, "rdf:resource", identifier);
        if let Some(url) = enclosure.url() {
            element.push_attribute(("enc:url", url.as_str()));
        }
        if let Some(mime_type) = enclosure.mime_type() {
            element.push_attribute(("enc:type", mime_type));
        }
        if let Some(length) = enclosure.length() {
            element.push_attribute(("enc:length", length));
        }
        output.push(Event::Empty(element));
    }
    output.push(Event::End(end));
}

fn node_start(node: &Item) -> Option<BytesStart<'static>> {
    let Some(identifier) = node.identifier() else {
        debug!(node = node.node_type().name(), "skipping node without identifier");
        return None;
    };
    let node_type = node.node_type();
    let mut start = BytesStart::new(element_name(node_type.namespace(), node_type.name()));
    push_reference(&mut start, "rdf:about", identifier);
    Some(start)
}

fn write_fields<'a>(node: &'a Item, output: &mut Vec<Event<'a>>) {
    for (field, values) in node.fields() {
        if field == Field::Items || field.is_enclosure() || field.iri().is_none() {
            continue;
        }
        let name = element_name(field.namespace(), field.name());
        for value in values {
            match value {
                FieldValue::Literal(text) => {
                    output.push(Event::Start(BytesStart::new(name.clone())));
                    if field == Field::ContentEncoded && !text.contains("]]>") {
                        output.push(Event::CData(BytesCData::new(text.as_str())));
                    } else {
                        output.push(Event::Text(BytesText::new(text)));
                    }
                    output.push(Event::End(BytesEnd::new(name.clone())));
                }
                FieldValue::Resource(resource) => {
                    let mut element = BytesStart::new(name.clone());
                    push_reference(&mut element, "rdf:resource", resource);
                    output.push(Event::Empty(element));
                }
            }
        }
    }
}

/// Adds `rdf:about`/`rdf:resource` for IRIs and `rdf:nodeID` for blank nodes.
fn push_reference(element: &mut BytesStart<'_>, attribute: &str, node: &NamedOrBlankNode) {
    match node {
        NamedOrBlankNode::NamedNode(node) => element.push_attribute((attribute, node.as_str())),
        NamedOrBlankNode::BlankNode(node) => element.push_attribute(("rdf:nodeID", node.as_str())),
    }
}

/// RSS 1.0 is the default namespace of the document, the other ones get their prefix.
fn element_name(namespace: Namespace, name: &str) -> String {
    match namespace.prefix() {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_owned(),
    }
}

fn map_err(error: impl Into<quick_xml::Error>) -> io::Error {
    match error.into() {
        quick_xml::Error::Io(error) => {
            Arc::try_unwrap(error).unwrap_or_else(|error| io::Error::new(error.kind(), error))
        }
        error => io::Error::other(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::rdf;
    use oxrdf::{BlankNode, Literal, NamedNode};

    fn serialize(triples: &[Triple]) -> String {
        let mut serializer = RssSerializer::new().for_writer(Vec::new());
        for triple in triples {
            serializer.serialize_triple(triple).unwrap();
        }
        String::from_utf8(serializer.finish().unwrap()).unwrap()
    }

    fn typed(subject: impl Into<oxrdf::Subject>, node_type: NodeType) -> Triple {
        Triple::new(subject, rdf::TYPE, node_type.iri().unwrap())
    }

    fn field(subject: impl Into<oxrdf::Subject>, field: Field, value: impl Into<oxrdf::Term>) -> Triple {
        Triple::new(subject, field.iri().unwrap(), value)
    }

    #[test]
    fn document_layout() {
        let channel = NamedNode::new_unchecked("http://example.com/");
        let item = NamedNode::new_unchecked("http://example.com/1");
        let image = NamedNode::new_unchecked("http://example.com/logo.png");
        let sequence = BlankNode::default();
        let output = serialize(&[
            field(item.clone(), Field::Title, Literal::new_simple_literal("First")),
            typed(item.clone(), NodeType::Item),
            typed(image.clone(), NodeType::Image),
            field(image.clone(), Field::Url, Literal::new_simple_literal("http://example.com/logo.png")),
            Triple::new(channel.clone(), NodeType::Image.iri().unwrap(), image),
            typed(channel.clone(), NodeType::Channel),
            field(channel.clone(), Field::Title, Literal::new_simple_literal("News & more")),
            field(channel, Field::Items, sequence.clone()),
            Triple::new(sequence.clone(), rdf::TYPE, rdf::SEQ),
            Triple::new(sequence, crate::vocab::rdf_ordinal(1), item),
        ]);

        assert!(output.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(output.contains(r#"xmlns="http://purl.org/rss/1.0/""#));
        assert!(output.contains(r#"xmlns:dc="http://purl.org/dc/elements/1.1/""#));
        assert!(output.contains("<title>News &amp; more</title>"));
        assert!(output.contains(r#"<image rdf:resource="http://example.com/logo.png"/>"#));
        assert!(output.contains(r#"<rdf:li rdf:resource="http://example.com/1"/>"#));
        let channel_at = output.find("<channel ").unwrap();
        let item_at = output.find(r#"<item rdf:about="http://example.com/1">"#).unwrap();
        let image_at = output.find(r#"<image rdf:about="http://example.com/logo.png">"#).unwrap();
        assert!(channel_at < item_at && item_at < image_at);
        assert!(output.trim_end().ends_with("</rdf:RDF>"));
    }

    #[test]
    fn content_encoded_and_blank_nodes() {
        let channel = BlankNode::new_unchecked("c");
        let output = serialize(&[
            typed(channel.clone(), NodeType::Channel),
            field(channel.clone(), Field::ContentEncoded, Literal::new_simple_literal("<p>Hi</p>")),
            field(channel, Field::DcDescription, Literal::new_simple_literal("a ]]> b")),
        ]);
        assert!(output.contains(r#"<channel rdf:nodeID="c">"#));
        assert!(output.contains("<content:encoded><![CDATA[<p>Hi</p>]]></content:encoded>"));
        assert!(output.contains("<dc:description>a ]]&gt; b</dc:description>"));
    }

    #[test]
    fn enclosure_element() {
        let item = NamedNode::new_unchecked("http://example.com/1");
        let enclosure = NamedNode::new_unchecked("http://example.com/1.mp3");
        let output = serialize(&[
            typed(NamedNode::new_unchecked("http://example.com/"), NodeType::Channel),
            typed(item.clone(), NodeType::Item),
            typed(enclosure.clone(), NodeType::Enclosure),
            field(item, Field::EncEnclosure, enclosure.clone()),
            field(enclosure.clone(), Field::EncUrl, enclosure.clone()),
            field(enclosure, Field::EncLength, Literal::new_simple_literal("42")),
        ]);
        assert!(output.contains(
            r#"<enc:enclosure rdf:resource="http://example.com/1.mp3" enc:url="http://example.com/1.mp3" enc:length="42"/>"#
        ));
    }

    #[test]
    fn channel_without_fields() {
        let output = serialize(&[typed(
            NamedNode::new_unchecked("http://example.com/"),
            NodeType::Channel,
        )]);
        assert!(output.contains(r#"<channel rdf:about="http://example.com/"/>"#));
        assert!(!output.contains("<items>"));
    }

    #[test]
    fn without_channel() {
        let output = serialize(&[Triple::new(
            NamedNode::new_unchecked("http://example.com/s"),
            NamedNode::new_unchecked("http://example.com/p"),
            Literal::new_simple_literal("o"),
        )]);
        assert!(!output.contains("channel"));
        assert!(output.contains("<rdf:RDF"));
    }
}
