use bytes::Bytes;
use http::header::{
    HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION,
    TRANSFER_ENCODING, USER_AGENT, WWW_AUTHENTICATE,
};
use http::{HeaderMap, Method, Request, StatusCode};
use log::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::request::RequestSpec;
use crate::response::ResponseRecord;
use crate::transport::Transport;

pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// How requests leave the process. The default mirrors a stock HTTP
/// client: follow up to ten redirects and identify with a user agent only
/// when the request does not carry one.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: 10,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

pub struct Executor<T> {
    transport: T,
    config: ClientConfig,
    fail_on_error: bool,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            fail_on_error: false,
        }
    }

    /// Turns a final status above 300 into `Error::Status`.
    pub fn fail_on_error(mut self, enabled: bool) -> Self {
        self.fail_on_error = enabled;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues one request, following redirects. Every call goes out again;
    /// nothing is cached.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<ResponseRecord> {
        let mut method = spec.method.clone();
        let mut url = spec.url.clone();
        let mut headers = spec.headers.clone();
        let mut body = spec.body.clone();
        let mut redirects = 0;

        let response = loop {
            debug!("sending {method} {url}");
            let request = self.build_request(&method, &url, &headers, body.clone())?;
            let response = ResponseRecord::from(self.transport.send(request).await?);
            info!("{method} {url} -> {}", response.status);

            let Some(next) = self.redirect_target(&response, &url) else {
                break response;
            };
            if redirects == self.config.max_redirects {
                return Err(Error::TooManyRedirects {
                    url: spec.url.to_string(),
                    limit: self.config.max_redirects,
                });
            }
            redirects += 1;

            let rewrites_to_get = matches!(
                response.status,
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            );
            if rewrites_to_get && method != Method::HEAD {
                method = Method::GET;
                body = None;
                headers.remove(CONTENT_LENGTH);
                headers.remove(CONTENT_TYPE);
                headers.remove(TRANSFER_ENCODING);
            }
            if next.host_str() != url.host_str() {
                headers.remove(AUTHORIZATION);
                headers.remove(WWW_AUTHENTICATE);
                headers.remove(COOKIE);
            }

            debug!("redirect {redirects} to {next}");
            url = next;
        };

        if self.fail_on_error && response.is_error() {
            return Err(Error::Status(response.status));
        }
        Ok(response)
    }

    /// Runs the batch strictly in order, handing each response to
    /// `on_response` before the next request goes out. The first error,
    /// from the transport or from `on_response`, ends the batch.
    pub async fn execute_all<F>(&self, specs: &[RequestSpec], mut on_response: F) -> Result<()>
    where
        F: FnMut(usize, ResponseRecord) -> Result<()>,
    {
        for (index, spec) in specs.iter().enumerate() {
            let response = self.execute(spec).await?;
            on_response(index, response)?;
        }
        Ok(())
    }

    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Request<Bytes>> {
        let mut request = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .body(body.unwrap_or_default())?;

        let out = request.headers_mut();
        *out = headers.clone();

        let host = match url.port() {
            Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
            None => url.host_str().unwrap_or_default().to_string(),
        };
        out.insert(HOST, HeaderValue::from_str(&host).map_err(http::Error::from)?);

        if let Some(agent) = &self.config.user_agent {
            if !out.contains_key(USER_AGENT) {
                out.insert(USER_AGENT, HeaderValue::from_str(agent).map_err(http::Error::from)?);
            }
        }

        Ok(request)
    }

    fn redirect_target(&self, response: &ResponseRecord, current: &Url) -> Option<Url> {
        if !self.config.follow_redirects {
            return None;
        }
        if !matches!(response.status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            return None;
        }

        let location = response.headers.get(LOCATION)?.to_str().ok()?;
        match current.join(location) {
            Ok(next) if matches!(next.scheme(), "http" | "https") => Some(next),
            Ok(next) => {
                warn!("not following redirect to {next}");
                None
            }
            Err(err) => {
                warn!("ignoring unparsable Location {location:?}: {err}");
                None
            }
        }
    }
}
