#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc(html_favicon_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/oxigraph/oxigraph/main/logo.svg")]

mod date;
mod emit;
mod error;
mod format;
mod model;
mod parser;
mod reconstruct;
mod resolve;
mod serializer;
mod soup;
mod uplift;
mod vocab;

pub use date::parse_date;
pub use error::{RssParseError, RssSyntaxError};
pub use format::recognize_syntax;
pub use model::{Enclosure, Feed, FieldValue, Item};
#[cfg(feature = "async-tokio")]
pub use parser::TokioAsyncReaderRssParser;
pub use parser::{ReaderRssParser, RssParser, SliceRssParser};
#[cfg(feature = "async-tokio")]
pub use serializer::TokioAsyncWriterRssSerializer;
pub use serializer::{RssSerializer, WriterRssSerializer};
pub use vocab::{Field, Namespace, NodeType};
