use crate::date::parse_date;
use crate::emit::emit_feed;
use crate::error::{RssParseError, RssSyntaxError};
use crate::model::Feed;
use crate::resolve::resolve_identifiers;
use crate::soup::TagSoup;
use crate::uplift::{DateParser, uplift_fields};
use crate::vocab::Namespace;
use oxiri::{Iri, IriParseError};
use oxrdf::Triple;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{Error, NsReader};
use std::io::{BufReader, Read};
use std::mem;
#[cfg(feature = "async-tokio")]
use tokio::io::{AsyncRead, BufReader as AsyncBufReader};
use tracing::{debug, warn};

/// A tolerant RSS and Atom parser producing [RDF](https://www.w3.org/TR/rdf11-concepts/) triples.
///
/// It understands RSS 0.9, 0.91, 0.92, 1.0, 1.1 and 2.0 and Atom 0.3 documents, and also
/// the many broken documents in between: elements are recognized by their name, unknown ones are skipped.
/// The triples use the [RSS 1.0](https://web.resource.org/rss/1.0/spec) vocabulary and its modules.
///
/// The triples are only available once the whole document has been read:
/// the node identifiers depend on elements that might come last.
///
/// Count the number of items:
/// ```
/// use oxrdf::NamedNodeRef;
/// use oxrdf::vocab::rdf;
/// use oxrss::RssParser;
///
/// let file = r#"<?xml version="1.0"?>
/// <rss version="2.0">
///  <channel>
///   <title>Example</title>
///   <link>http://example.com/</link>
///   <item><title>First</title><link>http://example.com/1</link></item>
///   <item><title>Second</title><link>http://example.com/2</link></item>
///  </channel>
/// </rss>"#;
///
/// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
/// let mut count = 0;
/// for triple in RssParser::new().for_reader(file.as_bytes()) {
///     let triple = triple?;
///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone)]
#[must_use]
pub struct RssParser {
    base: Option<Iri<String>>,
    date_parser: Option<DateParser>,
}

impl Default for RssParser {
    #[inline]
    fn default() -> Self {
        Self {
            base: None,
            date_parser: Some(parse_date),
        }
    }
}

impl RssParser {
    /// Builds a new [`RssParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base IRI used to resolve relative links, enclosure URLs and permalinks.
    ///
    /// Without a base IRI, relative values are ignored.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Sets the function used to read `pubDate` values into Unix timestamps.
    ///
    /// Each parsed date is added to its node as a `dc:date` value.
    /// The default is [`parse_date`](crate::parse_date).
    ///
    /// ```
    /// use oxrss::{Field, RssParser};
    ///
    /// let file = r#"<rss><channel>
    ///   <link>http://example.com/</link>
    ///   <pubDate>yesterday</pubDate>
    /// </channel></rss>"#;
    ///
    /// let feed = RssParser::new()
    ///     .with_date_parser(|date| (date == "yesterday").then_some(0))
    ///     .for_slice(file)
    ///     .parse_feed()?;
    /// let channel = feed.channel().unwrap();
    /// assert_eq!(channel.values(Field::DcDate)[0].as_str(), "1970-01-01T00:00:00Z");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_date_parser(mut self, date_parser: fn(&str) -> Option<i64>) -> Self {
        self.date_parser = Some(date_parser);
        self
    }

    /// Does not derive `dc:date` values from `pubDate`.
    #[inline]
    pub fn without_date_parser(mut self) -> Self {
        self.date_parser = None;
        self
    }

    /// Parses a RSS or Atom file from a [`Read`] implementation.
    ///
    /// Count the number of items:
    /// ```
    /// use oxrdf::NamedNodeRef;
    /// use oxrdf::vocab::rdf;
    /// use oxrss::RssParser;
    ///
    /// let file = r#"<?xml version="1.0"?>
    /// <feed xmlns="http://purl.org/atom/ns#" version="0.3">
    ///  <title>Example</title>
    ///  <id>http://example.com/feed</id>
    ///  <entry><title>First</title><link rel="alternate" href="http://example.com/1"/></entry>
    /// </feed>"#;
    ///
    /// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
    /// let mut count = 0;
    /// for triple in RssParser::new().for_reader(file.as_bytes()) {
    ///     let triple = triple?;
    ///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(1, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_reader<R: Read>(self, reader: R) -> ReaderRssParser<R> {
        ReaderRssParser {
            results: Vec::new(),
            parser: self.into_internal(BufReader::new(reader)),
            reader_buffer: Vec::default(),
        }
    }

    /// Parses a RSS or Atom file from a [`AsyncRead`] implementation.
    ///
    /// Count the number of items:
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use oxrdf::NamedNodeRef;
    /// use oxrdf::vocab::rdf;
    /// use oxrss::RssParser;
    ///
    /// let file = r#"<?xml version="1.0"?>
    /// <rss version="2.0">
    ///   <channel>
    ///     <title>Example</title>
    ///     <link>http://example.com/</link>
    ///     <item><title>First</title><link>http://example.com/1</link></item>
    ///     <item><title>Second</title><link>http://example.com/2</link></item>
    ///   </channel>
    /// </rss>"#;
    ///
    /// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
    /// let mut count = 0;
    /// let mut parser = RssParser::new().for_tokio_async_reader(file.as_bytes());
    /// while let Some(triple) = parser.next().await {
    ///     let triple = triple?;
    ///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(2, count);
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "async-tokio")]
    pub fn for_tokio_async_reader<R: AsyncRead + Unpin>(
        self,
        reader: R,
    ) -> TokioAsyncReaderRssParser<R> {
        TokioAsyncReaderRssParser {
            results: Vec::new(),
            parser: self.into_internal(AsyncBufReader::new(reader)),
            reader_buffer: Vec::default(),
        }
    }

    /// Parses a RSS or Atom file from a byte slice.
    ///
    /// Count the number of items:
    /// ```
    /// use oxrdf::NamedNodeRef;
    /// use oxrdf::vocab::rdf;
    /// use oxrss::RssParser;
    ///
    /// let file = r#"<?xml version="1.0"?>
    /// <rss version="2.0">
    ///  <channel>
    ///   <title>Example</title>
    ///   <link>http://example.com/</link>
    ///   <item><title>First</title><link>http://example.com/1</link></item>
    ///   <item><title>Second</title><link>http://example.com/2</link></item>
    ///  </channel>
    /// </rss>"#;
    ///
    /// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
    /// let mut count = 0;
    /// for triple in RssParser::new().for_slice(file) {
    ///     let triple = triple?;
    ///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
    ///         count += 1;
    ///     }
    /// }
    /// assert_eq!(2, count);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn for_slice(self, slice: &(impl AsRef<[u8]> + ?Sized)) -> SliceRssParser<'_> {
        SliceRssParser {
            results: Vec::new(),
            parser: self.into_internal(slice.as_ref()),
        }
    }

    fn into_internal<T>(self, reader: T) -> InternalRssParser<T> {
        let mut reader = NsReader::from_reader(reader);
        reader.config_mut().check_end_names = false;
        InternalRssParser {
            reader,
            soup: TagSoup::new(self.base.clone()),
            feed: None,
            line: 1,
            is_end: false,
            base: self.base,
            date_parser: self.date_parser,
        }
    }
}

/// Parses a RSS or Atom file from a [`Read`] implementation.
///
/// Can be built using [`RssParser::for_reader`].
///
/// Count the number of items:
/// ```
/// use oxrdf::NamedNodeRef;
/// use oxrdf::vocab::rdf;
/// use oxrss::RssParser;
///
/// let file = r#"<?xml version="1.0"?>
/// <rss version="2.0">
///  <channel>
///   <title>Example</title>
///   <link>http://example.com/</link>
///   <item><title>First</title><link>http://example.com/1</link></item>
///   <item><title>Second</title><link>http://example.com/2</link></item>
///  </channel>
/// </rss>"#;
///
/// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
/// let mut count = 0;
/// for triple in RssParser::new().for_reader(file.as_bytes()) {
///     let triple = triple?;
///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[must_use]
pub struct ReaderRssParser<R: Read> {
    results: Vec<Triple>,
    parser: InternalRssParser<BufReader<R>>,
    reader_buffer: Vec<u8>,
}

impl<R: Read> Iterator for ReaderRssParser<R> {
    type Item = Result<Triple, RssParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.results.pop() {
                return Some(Ok(triple));
            } else if self.parser.is_end {
                return None;
            }
            if let Err(e) = self.parse_step() {
                return Some(Err(e));
            }
        }
    }
}

impl<R: Read> ReaderRssParser<R> {
    /// Reads the whole file and returns the resolved feed instead of its triples.
    ///
    /// ```
    /// use oxrss::{Field, RssParser};
    ///
    /// let file = r#"<rss version="2.0"><channel>
    ///   <title>Example</title>
    ///   <link>http://example.com/</link>
    ///   <item><title>First</title></item>
    /// </channel></rss>"#;
    ///
    /// let feed = RssParser::new().for_reader(file.as_bytes()).parse_feed()?;
    /// assert_eq!(feed.items().len(), 1);
    /// assert_eq!(feed.items()[0].values(Field::Title)[0].as_str(), "First");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn parse_feed(mut self) -> Result<Feed, RssParseError> {
        while !self.parser.is_end {
            self.parse_step()?;
        }
        Ok(self.parser.take_feed()?)
    }

    /// The line of the document the parser is at, starting from 1.
    pub fn line(&self) -> u64 {
        self.parser.line
    }

    fn parse_step(&mut self) -> Result<(), RssParseError> {
        self.reader_buffer.clear();
        match self.parser.reader.read_event_into(&mut self.reader_buffer) {
            Ok(event) => self.parser.parse_event(event, &mut self.results),
            Err(error) => Err(self.parser.fail(error.into())),
        }
    }
}

/// Parses a RSS or Atom file from a [`AsyncRead`] implementation.
///
/// Can be built using [`RssParser::for_tokio_async_reader`].
///
/// Count the number of items:
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use oxrdf::NamedNodeRef;
/// use oxrdf::vocab::rdf;
/// use oxrss::RssParser;
///
/// let file = r#"<?xml version="1.0"?>
/// <rss version="2.0">
///   <channel>
///     <title>Example</title>
///     <link>http://example.com/</link>
///     <item><title>First</title><link>http://example.com/1</link></item>
///     <item><title>Second</title><link>http://example.com/2</link></item>
///   </channel>
/// </rss>"#;
///
/// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
/// let mut count = 0;
/// let mut parser = RssParser::new().for_tokio_async_reader(file.as_bytes());
/// while let Some(triple) = parser.next().await {
///     let triple = triple?;
///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async-tokio")]
#[must_use]
pub struct TokioAsyncReaderRssParser<R: AsyncRead + Unpin> {
    results: Vec<Triple>,
    parser: InternalRssParser<AsyncBufReader<R>>,
    reader_buffer: Vec<u8>,
}

#[cfg(feature = "async-tokio")]
impl<R: AsyncRead + Unpin> TokioAsyncReaderRssParser<R> {
    /// Reads the next triple or returns `None` if the file is finished.
    pub async fn next(&mut self) -> Option<Result<Triple, RssParseError>> {
        loop {
            if let Some(triple) = self.results.pop() {
                return Some(Ok(triple));
            } else if self.parser.is_end {
                return None;
            }
            if let Err(e) = self.parse_step().await {
                return Some(Err(e));
            }
        }
    }

    /// Reads the whole file and returns the resolved feed instead of its triples.
    pub async fn parse_feed(mut self) -> Result<Feed, RssParseError> {
        while !self.parser.is_end {
            self.parse_step().await?;
        }
        Ok(self.parser.take_feed()?)
    }

    /// The line of the document the parser is at, starting from 1.
    pub fn line(&self) -> u64 {
        self.parser.line
    }

    async fn parse_step(&mut self) -> Result<(), RssParseError> {
        self.reader_buffer.clear();
        match self
            .parser
            .reader
            .read_event_into_async(&mut self.reader_buffer)
            .await
        {
            Ok(event) => self.parser.parse_event(event, &mut self.results),
            Err(error) => Err(self.parser.fail(error.into())),
        }
    }
}

/// Parses a RSS or Atom file from a byte slice.
///
/// Can be built using [`RssParser::for_slice`].
///
/// Count the number of items:
/// ```
/// use oxrdf::NamedNodeRef;
/// use oxrdf::vocab::rdf;
/// use oxrss::RssParser;
///
/// let file = r#"<?xml version="1.0"?>
/// <rss version="2.0">
///  <channel>
///   <title>Example</title>
///   <link>http://example.com/</link>
///   <item><title>First</title><link>http://example.com/1</link></item>
///   <item><title>Second</title><link>http://example.com/2</link></item>
///  </channel>
/// </rss>"#;
///
/// let item = NamedNodeRef::new("http://purl.org/rss/1.0/item")?;
/// let mut count = 0;
/// for triple in RssParser::new().for_slice(file) {
///     let triple = triple?;
///     if triple.predicate == rdf::TYPE && triple.object == item.into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[must_use]
pub struct SliceRssParser<'a> {
    results: Vec<Triple>,
    parser: InternalRssParser<&'a [u8]>,
}

impl Iterator for SliceRssParser<'_> {
    type Item = Result<Triple, RssSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.results.pop() {
                return Some(Ok(triple));
            } else if self.parser.is_end {
                return None;
            }
            if let Err(RssParseError::Syntax(e)) = self.parse_step() {
                // I/O errors can't happen
                return Some(Err(e));
            }
        }
    }
}

impl SliceRssParser<'_> {
    /// Reads the whole file and returns the resolved feed instead of its triples.
    ///
    /// ```
    /// use oxrss::{NodeType, RssParser};
    ///
    /// let file = r#"<rss version="0.91"><channel>
    ///   <link>http://example.com/</link>
    ///   <image><url>http://example.com/logo.png</url></image>
    /// </channel></rss>"#;
    ///
    /// let feed = RssParser::new().for_slice(file).parse_feed()?;
    /// let image = &feed.common(NodeType::Image)[0];
    /// assert_eq!(
    ///     image.identifier().map(ToString::to_string).as_deref(),
    ///     Some("<http://example.com/logo.png>")
    /// );
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn parse_feed(mut self) -> Result<Feed, RssSyntaxError> {
        while !self.parser.is_end {
            if let Err(RssParseError::Syntax(e)) = self.parse_step() {
                return Err(e);
            }
        }
        self.parser.take_feed()
    }

    /// The line of the document the parser is at, starting from 1.
    pub fn line(&self) -> u64 {
        self.parser.line
    }

    fn parse_step(&mut self) -> Result<(), RssParseError> {
        match self.parser.reader.read_event() {
            Ok(event) => self.parser.parse_event(event, &mut self.results),
            Err(error) => Err(self.parser.fail(error.into())),
        }
    }
}

struct InternalRssParser<R> {
    reader: NsReader<R>,
    soup: TagSoup,
    feed: Option<Feed>,
    line: u64,
    is_end: bool,
    base: Option<Iri<String>>,
    date_parser: Option<DateParser>,
}

impl<R> InternalRssParser<R> {
    fn parse_event(
        &mut self,
        event: Event<'_>,
        results: &mut Vec<Triple>,
    ) -> Result<(), RssParseError> {
        if matches!(event, Event::Eof) {
            self.is_end = true;
            return Ok(self.finish(results)?);
        }
        let newlines = newline_count(&event);
        if let Err(error) = self.parse_markup_event(event) {
            return Err(self.fail(error));
        }
        self.line += newlines;
        Ok(())
    }

    fn parse_markup_event(&mut self, event: Event<'_>) -> Result<(), RssParseError> {
        match event {
            Event::Start(event) => self.parse_start_event(&event, false),
            Event::Empty(event) => self.parse_start_event(&event, true),
            Event::End(_) => {
                self.soup.end_element();
                Ok(())
            }
            Event::Text(event) => {
                self.soup.text(&event.unescape().map_err(Error::from)?);
                Ok(())
            }
            Event::CData(event) => {
                let text = self.reader.decoder().decode(&event).map_err(Error::from)?;
                self.soup.text(&text);
                Ok(())
            }
            Event::Decl(decl) => check_encoding(&decl),
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) | Event::Eof => Ok(()),
        }
    }

    fn parse_start_event(
        &mut self,
        event: &BytesStart<'_>,
        is_empty: bool,
    ) -> Result<(), RssParseError> {
        let decoder = self.reader.decoder();
        let (namespace, local_name) = self.reader.resolve_element(event.name());
        let namespace = match namespace {
            ResolveResult::Bound(namespace) => {
                Namespace::from_uri(&decoder.decode(namespace.as_ref()).map_err(Error::from)?)
            }
            ResolveResult::Unbound => Namespace::None,
            ResolveResult::Unknown(prefix) => {
                debug!(
                    prefix = %String::from_utf8_lossy(&prefix),
                    "undeclared namespace prefix"
                );
                Namespace::Unknown
            }
        };
        let name = decoder.decode(local_name.as_ref()).map_err(Error::from)?;

        let mut attributes = Vec::new();
        for attribute in event.attributes().with_checks(false) {
            let attribute = attribute.map_err(Error::InvalidAttr)?;
            if attribute.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let key = decoder
                .decode(attribute.key.local_name().as_ref())
                .map_err(Error::from)?
                .into_owned();
            let value = attribute
                .decode_and_unescape_value(decoder)
                .map_err(Error::from)?
                .into_owned();
            attributes.push((key, value));
        }

        self.soup
            .start_element(&name, namespace, &attributes, is_empty);
        Ok(())
    }

    fn finish(&mut self, results: &mut Vec<Triple>) -> Result<(), RssSyntaxError> {
        let soup = mem::replace(&mut self.soup, TagSoup::new(None));
        let mut feed = soup.finish();
        resolve_identifiers(&mut feed, self.base.as_ref())?;
        uplift_fields(&mut feed, self.date_parser);
        emit_feed(&feed, results)?;
        debug!(
            triples = results.len(),
            items = feed.items().len(),
            "feed converted to RDF"
        );
        results.reverse();
        self.feed = Some(feed);
        Ok(())
    }

    fn fail(&mut self, error: RssParseError) -> RssParseError {
        self.is_end = true;
        error.at_line(self.line)
    }

    fn take_feed(&mut self) -> Result<Feed, RssSyntaxError> {
        self.feed
            .take()
            .ok_or_else(|| RssSyntaxError::msg("The feed has already been consumed"))
    }
}

fn newline_count(event: &Event<'_>) -> u64 {
    let bytes: &[u8] = match event {
        Event::Start(event) | Event::Empty(event) => event,
        Event::End(event) => event,
        Event::Text(event) | Event::Comment(event) | Event::DocType(event) => event,
        Event::CData(event) => event,
        _ => return 0,
    };
    u64::try_from(memchr::memchr_iter(b'\n', bytes).count()).unwrap_or(u64::MAX)
}

fn check_encoding(decl: &BytesDecl<'_>) -> Result<(), RssParseError> {
    if let Some(encoding) = decl.encoding() {
        let encoding = encoding.map_err(Error::from)?;
        if !is_utf8(&encoding) {
            warn!(
                encoding = %String::from_utf8_lossy(&encoding),
                "only UTF-8 is supported, reading the document as UTF-8"
            );
        }
    }
    Ok(())
}

fn is_utf8(encoding: &[u8]) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_slice(),
        b"unicode-1-1-utf-8"
            | b"unicode11utf8"
            | b"unicode20utf8"
            | b"utf-8"
            | b"utf8"
            | b"x-unicode20utf8"
    )
}
