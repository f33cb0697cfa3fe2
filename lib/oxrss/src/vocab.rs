//! Namespaces, node types and fields understood by the feed parser and serializer.

use oxrdf::{NamedNode, NamedNodeRef};
use std::sync::LazyLock;

const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// An XML namespace used by one of the supported feed dialects.
///
/// RSS 0.92 and RSS 2.0 do not use any namespace and are both mapped to [`Namespace::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// A namespace that is not one of the known feed namespaces.
    Unknown,
    /// No namespace at all (RSS 0.92, RSS 2.0).
    None,
    /// `http://purl.org/rss/1.0/modules/rss091#`
    Rss091,
    /// `http://my.netscape.com/rdf/simple/0.9/`
    Rss09,
    /// `http://purl.org/rss/1.0/`
    Rss10,
    /// `http://purl.org/atom/ns#`
    Atom03,
    /// `http://purl.org/dc/elements/1.1/`
    Dc,
    /// `http://purl.oclc.org/net/rss_2.0/enc#`
    Enc,
    /// `http://purl.org/net/rss1.1#`
    Rss11,
    /// `http://web.resource.org/rss/1.0/modules/content/`
    Content,
}

impl Namespace {
    /// All namespaces, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Unknown,
        Self::None,
        Self::Rss091,
        Self::Rss09,
        Self::Rss10,
        Self::Atom03,
        Self::Dc,
        Self::Enc,
        Self::Rss11,
        Self::Content,
    ];

    /// The namespace URI, if this is a real namespace.
    #[inline]
    pub const fn uri(self) -> Option<&'static str> {
        match self {
            Self::Unknown | Self::None => None,
            Self::Rss091 => Some("http://purl.org/rss/1.0/modules/rss091#"),
            Self::Rss09 => Some("http://my.netscape.com/rdf/simple/0.9/"),
            Self::Rss10 => Some("http://purl.org/rss/1.0/"),
            Self::Atom03 => Some("http://purl.org/atom/ns#"),
            Self::Dc => Some("http://purl.org/dc/elements/1.1/"),
            Self::Enc => Some("http://purl.oclc.org/net/rss_2.0/enc#"),
            Self::Rss11 => Some("http://purl.org/net/rss1.1#"),
            Self::Content => Some("http://web.resource.org/rss/1.0/modules/content/"),
        }
    }

    /// The prefix used when writing RSS 1.0.
    ///
    /// RSS 1.0 itself is the default namespace of the written documents and has no prefix.
    #[inline]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Rss091 => Some("rss091"),
            Self::Atom03 => Some("atom"),
            Self::Dc => Some("dc"),
            Self::Enc => Some("enc"),
            Self::Content => Some("content"),
            Self::Unknown | Self::None | Self::Rss09 | Self::Rss10 | Self::Rss11 => None,
        }
    }

    /// Maps a namespace URI found in a document to a known namespace.
    pub fn from_uri(uri: &str) -> Self {
        if uri.is_empty() {
            return Self::None;
        }
        Self::ALL
            .into_iter()
            .find(|ns| ns.uri() == Some(uri))
            .unwrap_or(Self::Unknown)
    }

    /// RSS 0.9 and RSS 1.1 elements are matched as if they were RSS 1.0 ones.
    #[inline]
    pub(crate) const fn folded(self) -> Self {
        match self {
            Self::Rss09 | Self::Rss11 => Self::Rss10,
            other => other,
        }
    }
}

/// The kind of a node of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Channel,
    Image,
    TextInput,
    Item,
    /// Atom 0.3 `author`.
    Author,
    SkipHours,
    SkipDays,
    /// Only used in the RDF projection of RSS 2.0 `enclosure` elements.
    Enclosure,
    Unknown,
}

impl NodeType {
    pub const COUNT: usize = 9;

    /// All types, in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Channel,
        Self::Image,
        Self::TextInput,
        Self::Item,
        Self::Author,
        Self::SkipHours,
        Self::SkipDays,
        Self::Enclosure,
        Self::Unknown,
    ];

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Image => "image",
            Self::TextInput => "textinput",
            Self::Item => "item",
            Self::Author => "author",
            Self::SkipHours => "skipHours",
            Self::SkipDays => "skipDays",
            Self::Enclosure => "Enclosure",
            Self::Unknown => "<unknown>",
        }
    }

    #[inline]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::Channel | Self::Image | Self::TextInput | Self::Item => Namespace::Rss10,
            Self::Author => Namespace::Atom03,
            Self::SkipHours | Self::SkipDays => Namespace::Rss091,
            Self::Enclosure => Namespace::Enc,
            Self::Unknown => Namespace::Unknown,
        }
    }

    /// The RDF class of the nodes of this type.
    #[inline]
    pub fn iri(self) -> Option<NamedNodeRef<'static>> {
        TYPE_IRIS[self.index()].as_ref().map(NamedNode::as_ref)
    }

    /// Text content inside nodes of these types is never recorded.
    #[inline]
    pub const fn is_ignored(self) -> bool {
        matches!(
            self,
            Self::SkipHours | Self::SkipDays | Self::Enclosure | Self::Unknown
        )
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Finds the type whose element is named `name`.
    ///
    /// Atom `author` only matches inside the Atom namespace so that RSS 2.0 `author` stays a field.
    pub(crate) fn from_element(name: &str, namespace: Namespace) -> Option<Self> {
        Self::ALL.into_iter().find(|t| {
            *t != Self::Unknown
                && t.name() == name
                && (t.namespace() != Namespace::Atom03 || namespace == Namespace::Atom03)
        })
    }

    /// Finds the type whose RDF class is `iri`.
    pub(crate) fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.iri() == Some(iri))
    }
}

/// A field of a feed node.
///
/// The order of the variants is the order in which fields are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Title,
    Link,
    Description,
    Url,
    Name,
    Language,
    Rating,
    Copyright,
    PubDate,
    LastBuildDate,
    Docs,
    ManagingEditor,
    WebMaster,
    Cloud,
    Ttl,
    Width,
    Height,
    Hour,
    Day,
    Generator,
    Source,
    Author,
    Guid,
    /// RSS 2.0 `enclosure` element.
    Enclosure,
    /// `enc:enclosure`, links an item to its enclosures in RDF.
    EncEnclosure,
    EncUrl,
    EncLength,
    EncType,
    Length,
    Type,
    Category,
    Comments,
    /// RSS 1.0 `items`, the link from the channel to the item sequence.
    Items,
    Image,
    TextInput,
    AtomContent,
    AtomCopyright,
    AtomCreated,
    AtomId,
    AtomIssued,
    AtomLink,
    AtomModified,
    AtomSummary,
    AtomTagline,
    AtomTitle,
    DcTitle,
    DcContributor,
    DcCreator,
    DcPublisher,
    DcSubject,
    DcDescription,
    DcDate,
    DcType,
    DcFormat,
    DcIdentifier,
    DcLanguage,
    DcRelation,
    DcSource,
    DcCoverage,
    DcRights,
    ContentEncoded,
}

struct FieldInfo {
    field: Field,
    name: &'static str,
    namespace: Namespace,
}

macro_rules! fields {
    ($($field:ident => $name:literal in $ns:ident),* $(,)?) => {
        [$(FieldInfo { field: Field::$field, name: $name, namespace: Namespace::$ns }),*]
    };
}

static FIELD_INFOS: [FieldInfo; Field::COUNT] = fields![
    Title => "title" in Rss10,
    Link => "link" in Rss10,
    Description => "description" in Rss10,
    Url => "url" in Rss10,
    Name => "name" in Rss10,
    Language => "language" in Rss091,
    Rating => "rating" in Rss091,
    Copyright => "copyright" in Rss091,
    PubDate => "pubDate" in Rss091,
    LastBuildDate => "lastBuildDate" in Rss091,
    Docs => "docs" in Rss091,
    ManagingEditor => "managingEditor" in Rss091,
    WebMaster => "webMaster" in Rss091,
    Cloud => "cloud" in None,
    Ttl => "ttl" in None,
    Width => "width" in Rss091,
    Height => "height" in Rss091,
    Hour => "hour" in Rss091,
    Day => "day" in Rss091,
    Generator => "generator" in None,
    Source => "source" in None,
    Author => "author" in None,
    Guid => "guid" in None,
    Enclosure => "enclosure" in None,
    EncEnclosure => "enclosure" in Enc,
    EncUrl => "url" in Enc,
    EncLength => "length" in Enc,
    EncType => "type" in Enc,
    Length => "length" in None,
    Type => "type" in None,
    Category => "category" in None,
    Comments => "comments" in None,
    Items => "items" in Rss10,
    Image => "image" in Rss10,
    TextInput => "textinput" in Rss10,
    AtomContent => "content" in Atom03,
    AtomCopyright => "copyright" in Atom03,
    AtomCreated => "created" in Atom03,
    AtomId => "id" in Atom03,
    AtomIssued => "issued" in Atom03,
    AtomLink => "link" in Atom03,
    AtomModified => "modified" in Atom03,
    AtomSummary => "summary" in Atom03,
    AtomTagline => "tagline" in Atom03,
    AtomTitle => "title" in Atom03,
    DcTitle => "title" in Dc,
    DcContributor => "contributor" in Dc,
    DcCreator => "creator" in Dc,
    DcPublisher => "publisher" in Dc,
    DcSubject => "subject" in Dc,
    DcDescription => "description" in Dc,
    DcDate => "date" in Dc,
    DcType => "type" in Dc,
    DcFormat => "format" in Dc,
    DcIdentifier => "identifier" in Dc,
    DcLanguage => "language" in Dc,
    DcRelation => "relation" in Dc,
    DcSource => "source" in Dc,
    DcCoverage => "coverage" in Dc,
    DcRights => "rights" in Dc,
    ContentEncoded => "encoded" in Content,
];

static FIELD_IRIS: LazyLock<Vec<Option<NamedNode>>> = LazyLock::new(|| {
    FIELD_INFOS
        .iter()
        .map(|info| {
            Some(NamedNode::new_unchecked(format!(
                "{}{}",
                info.namespace.uri()?,
                info.name
            )))
        })
        .collect()
});

static TYPE_IRIS: LazyLock<Vec<Option<NamedNode>>> = LazyLock::new(|| {
    NodeType::ALL
        .iter()
        .map(|t| {
            Some(NamedNode::new_unchecked(format!(
                "{}{}",
                t.namespace().uri()?,
                t.name()
            )))
        })
        .collect()
});

impl Field {
    pub const COUNT: usize = 61;

    /// All fields, in emission order.
    pub fn all() -> impl Iterator<Item = Self> {
        FIELD_INFOS.iter().map(|info| info.field)
    }

    /// The local name of the field element.
    #[inline]
    pub fn name(self) -> &'static str {
        FIELD_INFOS[self.index()].name
    }

    #[inline]
    pub fn namespace(self) -> Namespace {
        FIELD_INFOS[self.index()].namespace
    }

    /// The RDF predicate of the field.
    ///
    /// Fields without a namespace (e.g. RSS 2.0 `guid`) have none and are not part of the RDF projection.
    #[inline]
    pub fn iri(self) -> Option<NamedNodeRef<'static>> {
        FIELD_IRIS[self.index()].as_ref().map(NamedNode::as_ref)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Finds the field of an element.
    ///
    /// A field of the same namespace wins, then elements without namespace and namespace-less fields
    /// match on the local name only.
    /// The `enc:` fields only exist in RDF: an `enc:enclosure` element is a RSS 2.0 enclosure.
    pub(crate) fn from_element(name: &str, namespace: Namespace) -> Option<Self> {
        let namespace = namespace.folded();
        let mut candidates = FIELD_INFOS.iter().filter(|info| info.name == name);
        candidates
            .clone()
            .find(|info| info.namespace == namespace && !info.field.is_enclosure())
            .or_else(|| {
                candidates.find(|info| {
                    namespace == Namespace::None || info.namespace == Namespace::None
                })
            })
            .map(|info| info.field)
    }

    /// Finds the field whose predicate is `iri`.
    pub(crate) fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        Self::all().find(|field| field.iri() == Some(iri))
    }

    /// Rewrites Atom fields to their RSS counterpart.
    #[inline]
    pub(crate) const fn atom_alias(self) -> Self {
        match self {
            Self::AtomContent => Self::Description,
            Self::AtomTitle => Self::Title,
            other => other,
        }
    }

    /// Fields carried by [`Enclosure`](crate::Enclosure) values instead of field slots.
    #[inline]
    pub(crate) const fn is_enclosure(self) -> bool {
        matches!(
            self,
            Self::Enclosure | Self::EncEnclosure | Self::EncUrl | Self::EncLength | Self::EncType
        )
    }
}

/// `rdf:_n`
pub(crate) fn rdf_ordinal(position: usize) -> NamedNode {
    NamedNode::new_unchecked(format!("{RDF_NAMESPACE}_{position}"))
}

/// The `n` of an `rdf:_n` predicate.
pub(crate) fn ordinal_position(iri: NamedNodeRef<'_>) -> Option<usize> {
    let position = iri.as_str().strip_prefix(RDF_NAMESPACE)?.strip_prefix('_')?;
    if position.starts_with('0') {
        return None;
    }
    position.parse().ok()
}
