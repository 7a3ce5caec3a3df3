use std::fmt;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, Method};
use httparse::Status;
use log::debug;
use url::Url;

use crate::error::{Error, Result};

const MAX_HEADERS: usize = 64;

/// One request block of the input file, ready to be sent.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Always absolute; origin-form targets are resolved against `Host`.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

#[derive(Debug)]
pub enum ParseError {
    Syntax(httparse::Error),
    Incomplete,
    InvalidMethod(String),
    InvalidTarget(String),
    UnsupportedScheme(String),
    MissingHost,
    InvalidHeader(String),
    InvalidContentLength,
    BodyTooShort { expected: usize, actual: usize },
    InvalidChunk,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax(err) => write!(f, "malformed request: {err}"),
            ParseError::Incomplete => write!(f, "missing request line"),
            ParseError::InvalidMethod(method) => write!(f, "invalid method {method:?}"),
            ParseError::InvalidTarget(target) => write!(f, "invalid request target {target:?}"),
            ParseError::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {scheme:?}"),
            ParseError::MissingHost => write!(f, "origin-form target requires a Host header"),
            ParseError::InvalidHeader(name) => write!(f, "invalid header {name:?}"),
            ParseError::InvalidContentLength => write!(f, "invalid Content-Length"),
            ParseError::BodyTooShort { expected, actual } => {
                write!(f, "Content-Length is {expected} but the body has {actual} bytes")
            }
            ParseError::InvalidChunk => write!(f, "malformed chunked body"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<httparse::Error> for ParseError {
    fn from(err: httparse::Error) -> Self {
        ParseError::Syntax(err)
    }
}

impl RequestSpec {
    /// Parses a single block. A blank line is appended first so a block
    /// whose headers run up to the delimiter still parses.
    pub fn parse(block: &[u8]) -> std::result::Result<Self, ParseError> {
        let mut padded = Vec::with_capacity(block.len() + 2);
        padded.extend_from_slice(block);
        padded.extend_from_slice(b"\n\n");

        let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut raw_headers);
        let offset = match req.parse(&padded)? {
            Status::Complete(offset) => offset,
            Status::Partial => return Err(ParseError::Incomplete),
        };

        let method = req.method.ok_or(ParseError::Incomplete)?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ParseError::InvalidMethod(method.to_string()))?;
        let target = req.path.ok_or(ParseError::Incomplete)?;

        let mut headers = parse_headers(req.headers)?;
        let url = parse_target(target, &headers)?;

        let body = if is_chunked(&headers) {
            // sent with a plain length; hyper frames it again
            let body = decode_chunked(padded.get(offset..).unwrap_or_default())?;
            headers.remove(TRANSFER_ENCODING);
            headers.remove(CONTENT_LENGTH);
            Some(body).filter(|body| !body.is_empty())
        } else {
            let rest = padded.get(offset..block.len()).unwrap_or_default();
            parse_body(rest, &headers)?
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Splits the input into blocks, strips the shebang line, and parses every
/// block. Any failure aborts the whole batch.
pub fn parse_requests(input: &[u8]) -> Result<Vec<RequestSpec>> {
    let requests = split_blocks(strip_shebang(input))
        .into_iter()
        .enumerate()
        .map(|(index, block)| {
            RequestSpec::parse(block).map_err(|source| Error::Parse {
                block: index + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("parsed {} request block(s)", requests.len());
    Ok(requests)
}

pub fn strip_shebang(input: &[u8]) -> &[u8] {
    if !input.starts_with(b"#!") {
        return input;
    }
    match input.iter().position(|&b| b == b'\n') {
        Some(end) => &input[end + 1..],
        None => &[],
    }
}

/// Splits on lines consisting solely of `###`. `n` delimiters always give
/// `n + 1` blocks, so empty input is one (empty) block.
pub fn split_blocks(input: &[u8]) -> Vec<&[u8]> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in input.split_inclusive(|&b| b == b'\n') {
        let end = offset + line.len();
        if line == b"###\n" || line == b"###\r\n" {
            blocks.push(trim_leading_newline(&input[start..offset]));
            start = end;
        }
        offset = end;
    }
    blocks.push(trim_leading_newline(&input[start..]));

    blocks
}

fn trim_leading_newline(block: &[u8]) -> &[u8] {
    block
        .strip_prefix(b"\r\n")
        .or_else(|| block.strip_prefix(b"\n"))
        .unwrap_or(block)
}

fn parse_headers(raw: &[httparse::Header<'_>]) -> std::result::Result<HeaderMap, ParseError> {
    let mut headers = HeaderMap::with_capacity(raw.len());

    for header in raw {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| ParseError::InvalidHeader(header.name.to_string()))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|_| ParseError::InvalidHeader(header.name.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn parse_target(target: &str, headers: &HeaderMap) -> std::result::Result<Url, ParseError> {
    if target.starts_with('/') {
        let host = headers
            .get(HOST)
            .and_then(|host| host.to_str().ok())
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or(ParseError::MissingHost)?;

        return Url::parse(&format!("http://{host}{target}"))
            .map_err(|_| ParseError::InvalidTarget(target.to_string()));
    }

    if !target.contains("://") {
        return Err(ParseError::InvalidTarget(target.to_string()));
    }

    let url = Url::parse(target).map_err(|_| ParseError::InvalidTarget(target.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ParseError::UnsupportedScheme(scheme.to_string())),
    }
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers.get_all(TRANSFER_ENCODING).iter().any(|value| {
        value
            .to_str()
            .map(|value| value.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    })
}

/// Decodes a chunked body; chunk extensions and trailers are dropped.
fn decode_chunked(mut rest: &[u8]) -> std::result::Result<Bytes, ParseError> {
    let mut body = Vec::new();

    loop {
        let (line, after) = split_line(rest).ok_or(ParseError::InvalidChunk)?;
        let size = std::str::from_utf8(line)
            .ok()
            .and_then(|line| {
                let size = line.split(';').next()?.trim();
                usize::from_str_radix(size, 16).ok()
            })
            .ok_or(ParseError::InvalidChunk)?;
        rest = after;

        if size == 0 {
            return Ok(Bytes::from(body));
        }

        let data = rest.get(..size).ok_or(ParseError::InvalidChunk)?;
        body.extend_from_slice(data);

        let (end, after) = split_line(&rest[size..]).ok_or(ParseError::InvalidChunk)?;
        if !end.is_empty() {
            return Err(ParseError::InvalidChunk);
        }
        rest = after;
    }
}

/// One line without its LF or CRLF, and what follows it.
fn split_line(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let line = &buf[..end];
    Some((line.strip_suffix(b"\r").unwrap_or(line), &buf[end + 1..]))
}

fn parse_body(rest: &[u8], headers: &HeaderMap) -> std::result::Result<Option<Bytes>, ParseError> {
    if let Some(expected) = content_length(headers)? {
        if rest.len() < expected {
            return Err(ParseError::BodyTooShort {
                expected,
                actual: rest.len(),
            });
        }
        return Ok(Some(Bytes::copy_from_slice(&rest[..expected])));
    }

    let end = rest
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |last| last + 1);
    if end == 0 {
        return Ok(None);
    }
    debug!("no Content-Length, sending the remaining {end} byte(s) of the block as the body");
    Ok(Some(Bytes::copy_from_slice(&rest[..end])))
}

fn content_length(headers: &HeaderMap) -> std::result::Result<Option<usize>, ParseError> {
    let mut length = None;

    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .ok_or(ParseError::InvalidContentLength)?;
        match length {
            Some(previous) if previous != parsed => return Err(ParseError::InvalidContentLength),
            _ => length = Some(parsed),
        }
    }
    Ok(length)
}
