use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode, Version};
use hyper::ext::ReasonPhrase;

/// A completed response with its body read in full.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub version: Version,
    pub status: StatusCode,
    /// As sent by the server, else the canonical phrase; may be empty.
    pub reason: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseRecord {
    /// `HTTP/1.1 200 OK`
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            format!("{:?} {}", self.version, self.status.as_u16())
        } else {
            format!("{:?} {} {}", self.version, self.status.as_u16(), self.reason)
        }
    }

    /// Anything above 300 ends the displayed output.
    pub fn is_error(&self) -> bool {
        self.status.as_u16() > 300
    }
}

impl From<Response<Bytes>> for ResponseRecord {
    fn from(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        let reason = match parts.extensions.get::<ReasonPhrase>() {
            Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
            None => parts.status.canonical_reason().unwrap_or_default().to_string(),
        };
        Self {
            version: parts.version,
            status: parts.status,
            reason,
            headers: parts.headers,
            body,
        }
    }
}
