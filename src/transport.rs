use std::future::Future;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::{Error, Result};

/// Sends one request and reads the whole response body.
///
/// The executor only talks to this trait, so tests can swap in a recording
/// transport and never touch the network.
pub trait Transport {
    fn send(&self, request: Request<Bytes>) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

/// Pooled hyper client with TLS from the platform's trust store. Speaks
/// HTTP/1.1 and HTTP/2; redirects are left to the executor.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new() -> Result<Self> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let tls = native_tls::TlsConnector::new().map_err(|err| Error::Transport(err.into()))?;
        let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));

        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self { client })
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request<Bytes>) -> impl Future<Output = Result<Response<Bytes>>> + Send {
        let client = self.client.clone();

        async move {
            let res: Response<Incoming> = client
                .request(request.map(Full::new))
                .await
                .map_err(|err| Error::Transport(err.into()))?;

            let (parts, body) = res.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|err| Error::Transport(err.into()))?
                .to_bytes();

            Ok(Response::from_parts(parts, body))
        }
    }
}
