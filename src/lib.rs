//! Runs the HTTP requests of a `.http` file in order and prints each
//! response the way the requests were written: status line, headers, body,
//! separated by `###`.

pub mod error;
pub mod executor;
pub mod highlight;
pub mod presenter;
pub mod request;
pub mod response;
pub mod transport;

use std::io::Write;

use log::debug;

pub use error::{Error, Result};
pub use executor::{ClientConfig, Executor};
pub use highlight::{Highlight, SyntectHighlighter};
pub use presenter::{OutputOptions, Presenter};
pub use request::{parse_requests, RequestSpec};
pub use response::ResponseRecord;
pub use transport::{HyperTransport, Transport};

/// Parses the whole input, then executes and prints one request at a time.
///
/// Nothing is sent unless every block parses. A response above 300 is
/// printed and followed by an `Error:` summary line; the requests after it
/// are still sent, only their responses are no longer shown. Errors are
/// returned as-is, exit codes are the caller's business.
pub async fn run<T, H, W>(
    input: &[u8],
    executor: &Executor<T>,
    presenter: &Presenter<H>,
    out: &mut W,
) -> Result<()>
where
    T: Transport,
    H: Highlight,
    W: Write,
{
    let requests = parse_requests(input)?;
    let total = requests.len();
    let mut stopped = false;

    executor
        .execute_all(&requests, |index, response| {
            if stopped {
                debug!("response {} not shown: {}", index + 1, response.status);
                return Ok(());
            }

            if index > 0 {
                presenter.delimiter(out)?;
            }
            presenter.present(out, &response)?;

            if response.is_error() {
                presenter.summary(out, &response, total - index - 1)?;
                stopped = true;
            }
            out.flush()?;
            Ok(())
        })
        .await
}

#[cfg(test)]
mod run_tests {
    use http::StatusCode;

    use super::*;
    use crate::highlight::testing::RecordingHighlighter;
    use crate::transport::testing::MockTransport;

    const TWO_REQUESTS: &str = "GET /ok HTTP/1.1\r\nHost: example.com\r\n\r\n###\nGET /missing HTTP/1.1\r\nHost: example.com\r\n\r\n";

    fn raw_presenter() -> Presenter<RecordingHighlighter> {
        let options = OutputOptions {
            hide_headers: true,
            raw: true,
            ..OutputOptions::default()
        };
        Presenter::new(RecordingHighlighter::default(), options)
    }

    fn scripted() -> MockTransport {
        MockTransport::default()
            .reply(200, &[("content-type", "text/plain")], "ok\n")
            .reply(404, &[("content-type", "text/plain")], "missing\n")
    }

    #[tokio::test]
    async fn test_error_status_without_fail_on_error() {
        let executor = Executor::new(scripted(), ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();

        run(TWO_REQUESTS.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\n\nok\n###\n\nHTTP/1.1 404 Not Found\n\nmissing\nError: HTTP/1.1 404 Not Found\n"
        );
        assert!(presenter.highlighter().calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fail_on_error_prints_only_successes() {
        let executor = Executor::new(scripted(), ClientConfig::default()).fail_on_error(true);
        let presenter = raw_presenter();
        let mut out = Vec::new();

        let err = run(TWO_REQUESTS.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Status(StatusCode::NOT_FOUND)));
        assert_eq!(err.exit_code(), 404);
        assert_eq!(String::from_utf8(out).unwrap(), "HTTP/1.1 200 OK\n\nok\n");
    }

    #[tokio::test]
    async fn test_error_status_hides_later_responses() {
        let transport = MockTransport::default()
            .reply(200, &[], "")
            .reply(500, &[], "")
            .reply(200, &[], "");
        let executor = Executor::new(transport, ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();
        let input = "GET /1 HTTP/1.1\nHost: a\n###\nGET /2 HTTP/1.1\nHost: a\n###\nGET /3 HTTP/1.1\nHost: a\n";

        run(input.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\n\n\n###\n\nHTTP/1.1 500 Internal Server Error\n\n\nError: HTTP/1.1 500 Internal Server Error (1 more response(s) not shown)\n"
        );
        assert_eq!(executor.transport().sent().len(), 3);
    }

    #[tokio::test]
    async fn test_requests_after_error_status_are_still_sent() {
        let transport = MockTransport::default()
            .reply(200, &[], "")
            .reply(404, &[], "")
            .reply(200, &[], "");
        let executor = Executor::new(transport, ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();
        let input = "POST /1 HTTP/1.1\nHost: a\n\none\n###\nPOST /2 HTTP/1.1\nHost: a\n\ntwo\n###\nPOST /3 HTTP/1.1\nHost: a\n\nthree\n";

        run(input.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap();

        let sent = executor.transport().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].1, "http://a/3");
        assert_eq!(sent[2].3, "three");

        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("Error: HTTP/1.1 404 Not Found (1 more response(s) not shown)\n"));
    }

    #[tokio::test]
    async fn test_single_error_status_gets_summary() {
        let transport = MockTransport::default().reply(500, &[], "boom");
        let executor = Executor::new(transport, ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();

        run(b"GET / HTTP/1.1\nHost: a\n", &executor, &presenter, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 500 Internal Server Error\n\nboom\nError: HTTP/1.1 500 Internal Server Error\n"
        );
    }

    #[tokio::test]
    async fn test_parse_failure_sends_nothing() {
        let executor = Executor::new(scripted(), ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();
        let input = "GET /ok HTTP/1.1\nHost: example.com\n\n###\nHost: example.com\n";

        let err = run(input.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse { block: 2, .. }));
        assert!(executor.transport().sent().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_printed_responses() {
        let transport = MockTransport::default()
            .reply(200, &[], "first")
            .fail("dns error");
        let executor = Executor::new(transport, ClientConfig::default());
        let presenter = raw_presenter();
        let mut out = Vec::new();
        let input = "GET /1 HTTP/1.1\nHost: a\n###\nGET /2 HTTP/1.1\nHost: b\n";

        let err = run(input.as_bytes(), &executor, &presenter, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "HTTP/1.1 200 OK\n\nfirst\n");
    }

    #[tokio::test]
    async fn test_highlighting_uses_content_category() {
        let transport = MockTransport::default().reply(200, &[("content-type", "application/xml")], "<a/>");
        let executor = Executor::new(transport, ClientConfig::default());
        let presenter = Presenter::new(
            RecordingHighlighter::default(),
            OutputOptions {
                hide_headers: true,
                ..OutputOptions::default()
            },
        );
        let mut out = Vec::new();

        run(b"GET / HTTP/1.1\nHost: a\n", &executor, &presenter, &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "HTTP/1.1 200 OK\n\n[xml]<a/>[/xml]\n");
    }
}
