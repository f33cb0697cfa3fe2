use crate::model::{Enclosure, Feed, FieldValue};
use crate::resolve::parse_iri;
use crate::vocab::{Field, Namespace, NodeType};
use oxiri::Iri;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    None,
    Unknown,
    Known(Field),
}

/// Builds a [`Feed`] from the XML events of a RSS or Atom document.
///
/// It does not validate anything: elements are recognized by their local name and namespace,
/// unknown ones are skipped.
/// Only one level of nested node types is tracked (e.g. an `image` inside a `channel`).
pub(crate) struct TagSoup {
    feed: Feed,
    current_type: Option<NodeType>,
    previous_type: Option<NodeType>,
    current_field: FieldState,
    guid_is_permalink: bool,
    text: String,
    base_iri: Option<Iri<String>>,
}

impl TagSoup {
    pub fn new(base_iri: Option<Iri<String>>) -> Self {
        Self {
            feed: Feed::default(),
            current_type: None,
            previous_type: None,
            current_field: FieldState::None,
            guid_is_permalink: false,
            text: String::new(),
            base_iri,
        }
    }

    /// `attributes` are (local name, value) pairs.
    pub fn start_element(
        &mut self,
        name: &str,
        namespace: Namespace,
        attributes: &[(String, String)],
        is_empty: bool,
    ) {
        self.flush_text();
        if let Some(current_type) = self.current_type {
            self.start_nested_element(current_type, name, namespace);
        } else {
            self.start_top_level_element(name, namespace);
        }
        self.read_attributes(name, attributes, is_empty);
        if is_empty {
            self.end_element();
        }
    }

    pub fn end_element(&mut self) {
        self.flush_text();
        if self.current_field != FieldState::None {
            self.current_field = FieldState::None;
            self.guid_is_permalink = false;
        } else if self.current_type.is_some() {
            self.current_type = self.previous_type.take();
        }
    }

    /// Text and CDATA content. Adjacent chunks are joined.
    pub fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn finish(mut self) -> Feed {
        self.flush_text();
        self.feed
    }

    fn start_top_level_element(&mut self, name: &str, namespace: Namespace) {
        match name {
            "rss" | "rdf" | "RDF" => (),
            "feed" | "Channel" => self.enter_type(NodeType::Channel),
            "item" | "entry" => self.enter_type(NodeType::Item),
            _ => {
                if let Some(node_type) = NodeType::from_element(name, namespace) {
                    self.enter_type(node_type);
                } else {
                    debug!(element = name, "unknown top level element");
                    self.current_type = Some(NodeType::Unknown);
                }
            }
        }
    }

    fn start_nested_element(&mut self, current_type: NodeType, name: &str, namespace: Namespace) {
        if matches!(name, "item" | "entry") {
            self.enter_type(NodeType::Item);
            return;
        }
        if let Some(node_type) = NodeType::from_element(name, namespace) {
            if node_type != current_type && node_type != NodeType::Item {
                self.previous_type = Some(current_type);
                self.enter_type(node_type);
                return;
            }
        }

        self.current_field = if let Some(field) = Field::from_element(name, namespace) {
            FieldState::Known(field.atom_alias())
        } else {
            debug!(element = name, node = current_type.name(), "unknown field");
            FieldState::Unknown
        };
        if self.current_field == FieldState::Known(Field::Enclosure)
            && current_type == NodeType::Item
        {
            if let Some(item) = self.feed.last_mut(NodeType::Item) {
                item.push_enclosure(Enclosure::default());
            }
        }
    }

    fn enter_type(&mut self, node_type: NodeType) {
        self.current_type = Some(node_type);
        self.current_field = FieldState::None;
        if node_type == NodeType::Channel && self.feed.channel().is_some() {
            return; // A feed has a single channel
        }
        if node_type != NodeType::Unknown {
            self.feed.push(node_type);
        }
    }

    fn read_attributes(&mut self, name: &str, attributes: &[(String, String)], is_empty: bool) {
        let mut href = None;
        let mut rel = None;
        for (attribute, value) in attributes {
            match (name, attribute.as_str()) {
                ("guid", "isPermaLink") => self.guid_is_permalink = value == "true",
                ("source", "url") | ("category", "domain") => {
                    debug!(element = name, attribute = attribute.as_str(), "ignored attribute");
                }
                ("enclosure", "url") => {
                    if let Some(url) = parse_iri(self.base_iri.as_ref(), value) {
                        if let Some(enclosure) = self.current_enclosure() {
                            enclosure.set_url(url);
                        }
                    }
                }
                ("enclosure", "length") => {
                    if let Some(enclosure) = self.current_enclosure() {
                        enclosure.set_length(value.clone());
                    }
                }
                ("enclosure", "type") => {
                    if let Some(enclosure) = self.current_enclosure() {
                        enclosure.set_mime_type(value.clone());
                    }
                }
                ("link", "href") => href = Some(value),
                (_, "rel") => rel = Some(value.as_str()),
                _ => (),
            }
        }

        if !is_empty || rel != Some("alternate") {
            return;
        }
        let Some(href) = href else {
            return;
        };
        if !self.current_type.is_some_and(|t| !t.is_ignored()) {
            return;
        }
        if let FieldState::Known(field) = self.current_field {
            self.add_value(field, FieldValue::Literal(href.clone()));
        } else {
            debug!(href = href.as_str(), "link outside of a known field");
        }
    }

    fn current_enclosure(&mut self) -> Option<&mut Enclosure> {
        if self.current_type != Some(NodeType::Item)
            || self.current_field != FieldState::Known(Field::Enclosure)
        {
            return None;
        }
        self.feed.last_mut(NodeType::Item)?.last_enclosure_mut()
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let (Some(node_type), FieldState::Known(field)) = (self.current_type, self.current_field)
        else {
            if !text.trim().is_empty() {
                debug!(text = text.trim(), "text outside of a known field");
            }
            return;
        };
        if node_type.is_ignored() || field == Field::Enclosure {
            return;
        }
        let value = if field == Field::Guid && self.guid_is_permalink {
            match parse_iri(self.base_iri.as_ref(), &text) {
                Some(iri) => FieldValue::Resource(iri.into()),
                None => FieldValue::Literal(text),
            }
        } else {
            FieldValue::Literal(text)
        };
        self.add_value(field, value);
    }

    fn add_value(&mut self, field: Field, value: FieldValue) {
        let Some(node_type) = self.current_type else {
            return;
        };
        if let Some(item) = self.feed.last_mut(node_type) {
            item.add_value(field, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::NamedNode;

    fn start(soup: &mut TagSoup, name: &str, attributes: &[(&str, &str)]) {
        start_ns(soup, name, Namespace::None, attributes, false);
    }

    fn start_ns(
        soup: &mut TagSoup,
        name: &str,
        namespace: Namespace,
        attributes: &[(&str, &str)],
        is_empty: bool,
    ) {
        let attributes = attributes
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<Vec<_>>();
        soup.start_element(name, namespace, &attributes, is_empty);
    }

    fn element(soup: &mut TagSoup, name: &str, text: &str) {
        start(soup, name, &[]);
        soup.text(text);
        soup.end_element();
    }

    fn literal(value: &str) -> FieldValue {
        FieldValue::Literal(value.into())
    }

    #[test]
    fn rss2_channel_with_nested_image() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "rss", &[("version", "2.0")]);
        start(&mut soup, "channel", &[]);
        element(&mut soup, "title", "News");
        start(&mut soup, "image", &[]);
        element(&mut soup, "url", "http://example.com/logo.png");
        soup.end_element();
        element(&mut soup, "link", "http://example.com/");
        start(&mut soup, "item", &[]);
        element(&mut soup, "title", "First");
        soup.end_element();
        start(&mut soup, "item", &[]);
        element(&mut soup, "title", "Second");
        soup.end_element();
        soup.end_element();
        soup.end_element();
        let feed = soup.finish();

        let channel = feed.channel().unwrap();
        assert_eq!(channel.values(Field::Title), [literal("News")]);
        assert_eq!(
            channel.values(Field::Link),
            [literal("http://example.com/")],
            "the channel is restored after the image"
        );
        let image = &feed.common(NodeType::Image)[0];
        assert_eq!(
            image.values(Field::Url),
            [literal("http://example.com/logo.png")]
        );
        assert_eq!(feed.items().len(), 2);
        assert_eq!(feed.items()[1].values(Field::Title), [literal("Second")]);
    }

    #[test]
    fn guid_permalink() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "channel", &[]);
        start(&mut soup, "item", &[]);
        start(&mut soup, "guid", &[("isPermaLink", "true")]);
        soup.text("http://x/1");
        soup.end_element();
        start(&mut soup, "guid", &[("isPermaLink", "false")]);
        soup.text("tag:x,2004:1");
        soup.end_element();
        element(&mut soup, "guid", "plain");
        let feed = soup.finish();

        assert_eq!(
            feed.items()[0].values(Field::Guid),
            [
                FieldValue::Resource(NamedNode::new_unchecked("http://x/1").into()),
                literal("tag:x,2004:1"),
                literal("plain"),
            ]
        );
    }

    #[test]
    fn enclosure_attributes() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "channel", &[]);
        start(&mut soup, "item", &[]);
        start_ns(
            &mut soup,
            "enclosure",
            Namespace::None,
            &[
                ("url", "http://a/f.mp3"),
                ("length", "123"),
                ("type", "audio/mpeg"),
            ],
            true,
        );
        element(&mut soup, "title", "Episode");
        let feed = soup.finish();

        let item = &feed.items()[0];
        assert_eq!(item.values(Field::Title), [literal("Episode")]);
        assert!(item.values(Field::Enclosure).is_empty());
        let enclosure = &item.enclosures()[0];
        assert_eq!(
            enclosure.url().map(NamedNode::as_str),
            Some("http://a/f.mp3")
        );
        assert_eq!(enclosure.length(), Some("123"));
        assert_eq!(enclosure.mime_type(), Some("audio/mpeg"));
    }

    #[test]
    fn alternate_link_href() {
        let mut soup = TagSoup::new(None);
        start_ns(&mut soup, "feed", Namespace::Atom03, &[], false);
        start_ns(
            &mut soup,
            "title",
            Namespace::Atom03,
            &[("mode", "escaped")],
            false,
        );
        soup.text("Atom feed");
        soup.end_element();
        start_ns(&mut soup, "entry", Namespace::Atom03, &[], false);
        start_ns(
            &mut soup,
            "link",
            Namespace::Atom03,
            &[("rel", "alternate"), ("href", "http://x/2")],
            true,
        );
        start_ns(
            &mut soup,
            "link",
            Namespace::Atom03,
            &[("rel", "related"), ("href", "http://x/3")],
            true,
        );
        start_ns(&mut soup, "content", Namespace::Atom03, &[], false);
        soup.text("Body");
        soup.end_element();
        let feed = soup.finish();

        assert_eq!(
            feed.channel().unwrap().values(Field::Title),
            [literal("Atom feed")]
        );
        let entry = &feed.items()[0];
        assert_eq!(entry.values(Field::AtomLink), [literal("http://x/2")]);
        assert_eq!(entry.values(Field::Description), [literal("Body")]);
    }

    #[test]
    fn href_and_text_links_are_equivalent() {
        let mut by_href = TagSoup::new(None);
        start(&mut by_href, "channel", &[]);
        start_ns(
            &mut by_href,
            "link",
            Namespace::None,
            &[("rel", "alternate"), ("href", "http://x/2")],
            true,
        );
        let mut by_text = TagSoup::new(None);
        start(&mut by_text, "channel", &[]);
        element(&mut by_text, "link", "http://x/2");
        assert_eq!(by_href.finish(), by_text.finish());
    }

    #[test]
    fn ignored_content() {
        let mut soup = TagSoup::new(None);
        soup.text("  \n ");
        start(&mut soup, "channel", &[]);
        start(&mut soup, "skipHours", &[]);
        element(&mut soup, "hour", "3");
        soup.end_element();
        element(&mut soup, "unknownThing", "lost");
        soup.text("stray text");
        element(&mut soup, "description", "kept");
        let feed = soup.finish();

        let channel = feed.channel().unwrap();
        assert_eq!(channel.fields_count(), 1);
        assert_eq!(channel.values(Field::Description), [literal("kept")]);
        assert!(feed.common(NodeType::SkipHours)[0].is_empty());
    }

    #[test]
    fn whitespace_in_a_field_is_a_value() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "channel", &[]);
        soup.text("\n  ");
        element(&mut soup, "title", " ");
        soup.text("\n");
        element(&mut soup, "description", "\t\n");
        let feed = soup.finish();

        let channel = feed.channel().unwrap();
        assert_eq!(channel.values(Field::Title), [literal(" ")]);
        assert_eq!(channel.values(Field::Description), [literal("\t\n")]);
        assert_eq!(channel.fields_count(), 2);
    }

    #[test]
    fn text_chunks_are_joined() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "channel", &[]);
        start(&mut soup, "description", &[]);
        soup.text("a &");
        soup.text(" <b>");
        soup.end_element();
        let feed = soup.finish();
        assert_eq!(
            feed.channel().unwrap().values(Field::Description),
            [literal("a & <b>")]
        );
    }

    #[test]
    fn single_nesting_level() {
        let mut soup = TagSoup::new(None);
        start(&mut soup, "channel", &[]);
        start(&mut soup, "image", &[]);
        start(&mut soup, "textinput", &[]);
        soup.end_element();
        soup.end_element();
        element(&mut soup, "title", "lost");
        let feed = soup.finish();
        assert!(
            feed.channel().unwrap().is_empty(),
            "the channel is forgotten after two nested types"
        );
    }
}
