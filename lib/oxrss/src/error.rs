use std::error::Error;
use std::sync::Arc;
use std::{fmt, io};

/// Error returned during RSS or Atom parsing.
#[derive(Debug, thiserror::Error)]
pub enum RssParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax or structure.
    #[error(transparent)]
    Syntax(#[from] RssSyntaxError),
}

impl RssParseError {
    /// Attaches the line where the error has been found, if it has none yet.
    pub(crate) fn at_line(self, line: u64) -> Self {
        match self {
            Self::Syntax(error) => Self::Syntax(error.at_line(line)),
            Self::Io(error) => Self::Io(error),
        }
    }
}

impl From<RssParseError> for io::Error {
    #[inline]
    fn from(error: RssParseError) -> Self {
        match error {
            RssParseError::Io(error) => error,
            RssParseError::Syntax(error) => error.into(),
        }
    }
}

impl From<quick_xml::Error> for RssParseError {
    #[inline]
    fn from(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(error) => {
                Self::Io(Arc::try_unwrap(error).unwrap_or_else(|e| io::Error::new(e.kind(), e)))
            }
            _ => Self::Syntax(RssSyntaxError {
                inner: RssSyntaxErrorKind::Xml(error),
                line: None,
            }),
        }
    }
}

/// An error in the syntax of the parsed feed, or a feed that can't be converted to RDF.
#[derive(Debug)]
pub struct RssSyntaxError {
    inner: RssSyntaxErrorKind,
    line: Option<u64>,
}

#[derive(Debug)]
enum RssSyntaxErrorKind {
    Xml(quick_xml::Error),
    Msg { msg: String },
}

impl RssSyntaxError {
    /// Builds an error from a printable error message.
    #[inline]
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        Self {
            inner: RssSyntaxErrorKind::Msg { msg: msg.into() },
            line: None,
        }
    }

    fn at_line(mut self, line: u64) -> Self {
        self.line.get_or_insert(line);
        self
    }

    /// The line (starting from 1) where the error has been found, if known.
    ///
    /// Errors about the feed structure, found once the whole document is read, have no line.
    #[inline]
    pub fn line(&self) -> Option<u64> {
        self.line
    }
}

impl fmt::Display for RssSyntaxError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            RssSyntaxErrorKind::Xml(error) => write!(f, "{error}"),
            RssSyntaxErrorKind::Msg { msg } => f.write_str(msg),
        }?;
        if let Some(line) = self.line {
            write!(f, " on line {line}")?;
        }
        Ok(())
    }
}

impl Error for RssSyntaxError {
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.inner {
            RssSyntaxErrorKind::Xml(error) => Some(error),
            RssSyntaxErrorKind::Msg { .. } => None,
        }
    }
}

impl From<RssSyntaxError> for io::Error {
    #[inline]
    fn from(error: RssSyntaxError) -> Self {
        match error.inner {
            RssSyntaxErrorKind::Xml(quick_xml::Error::Io(error)) => {
                Arc::try_unwrap(error).unwrap_or_else(|e| Self::new(e.kind(), e))
            }
            _ => Self::new(io::ErrorKind::InvalidData, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_with_line() {
        let error = RssParseError::from(RssSyntaxError::msg("broken")).at_line(3);
        let RssParseError::Syntax(error) = error else {
            panic!("syntax error expected")
        };
        assert_eq!(error.line(), Some(3));
        assert_eq!(error.to_string(), "broken on line 3");
        let error = error.at_line(5);
        assert_eq!(error.line(), Some(3), "the first line is kept");
    }

    #[test]
    fn into_io_error() {
        let error = io::Error::from(RssSyntaxError::msg("no channel"));
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert_eq!(error.to_string(), "no channel");
    }
}
