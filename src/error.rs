use std::fmt;

use http::StatusCode;

use crate::request::ParseError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A block of the input could not be parsed; `block` counts from 1.
    Parse { block: usize, source: ParseError },
    /// The outgoing request could not be assembled.
    Request(http::Error),
    Transport(BoxError),
    TooManyRedirects { url: String, limit: usize },
    /// Fail-on-error mode saw a status above 300.
    Status(StatusCode),
    MissingContentType,
    MalformedContentType(String),
    UnknownStyle(String),
    Highlight(BoxError),
    Io(std::io::Error),
}

impl Error {
    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Status(status) => i32::from(status.as_u16()),
            _ => 1,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { block, source } => write!(f, "request block {block}: {source}"),
            Error::Request(err) => write!(f, "invalid request: {err}"),
            Error::Transport(err) => write!(f, "request failed: {err}"),
            Error::TooManyRedirects { url, limit } => {
                write!(f, "{url}: stopped after {limit} redirects")
            }
            Error::Status(status) => write!(f, "server responded with {status}"),
            Error::MissingContentType => {
                write!(f, "response has no Content-Type header, use --raw to print the body as is")
            }
            Error::MalformedContentType(value) => write!(f, "malformed Content-Type {value:?}"),
            Error::UnknownStyle(name) => {
                write!(f, "unknown style {name:?}, see --list-styles")
            }
            Error::Highlight(err) => write!(f, "highlighting failed: {err}"),
            Error::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse { source, .. } => Some(source),
            Error::Request(err) => Some(err),
            Error::Transport(err) | Error::Highlight(err) => Some(err.as_ref()),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::Request(err)
    }
}
