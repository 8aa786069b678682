//! HTTP transport for SIRI requests.
//!
//! Two strategies are offered, selected by [`Transport`]:
//! [`Transport::Embedded`] performs a plain GET and buffers the body in one
//! go, [`Transport::Explicit`] opens the connection with keep-alive disabled
//! and streams the body chunk by chunk. In both cases the response (and with
//! it the connection) is dropped on every exit path.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::{Bytes, BytesMut};
use reqwest::header::{CONNECTION, HeaderValue};
use tracing::debug;

use crate::config::Transport;
use crate::error::TransportError;

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATED_BODY: u64 = 1 << 20;

/// Fetches `url` with the given transport strategy.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    transport: Transport,
) -> Result<Bytes, TransportError> {
    match transport {
        Transport::Embedded => fetch_embedded(client, url).await,
        Transport::Explicit => fetch_explicit(client, url).await,
    }
}

fn get_request(url: &str) -> Result<reqwest::Request, TransportError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(reqwest::Request::new(reqwest::Method::GET, parsed))
}

async fn fetch_embedded<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes, TransportError> {
    let req = get_request(url)?;
    let resp = client.execute(req).await?;
    check_status(&resp, url)?;

    let body = resp.bytes().await?;
    debug!(bytes = body.len(), "Response body received");
    Ok(body)
}

async fn fetch_explicit<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Bytes, TransportError> {
    let mut req = get_request(url)?;
    // Connection reuse is disabled for explicit connections.
    req.headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));

    let mut resp = client.execute(req).await?;
    check_status(&resp, url)?;

    // Content-Length is untrusted; only a bounded reservation is made.
    let hint = resp.content_length().unwrap_or(0).min(MAX_PREALLOCATED_BODY);
    let mut buf = BytesMut::with_capacity(hint as usize);
    let mut chunks = 0usize;
    while let Some(chunk) = resp.chunk().await? {
        chunks += 1;
        buf.extend_from_slice(&chunk);
    }

    debug!(bytes = buf.len(), chunks, "Response body streamed");
    Ok(buf.freeze())
}

fn check_status(resp: &reqwest::Response, url: &str) -> Result<(), TransportError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            status,
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embedded_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vm.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"Siri\":{}}"))
            .mount(&server)
            .await;

        let client = BasicClient::new();
        let url = format!("{}/vm.json", server.uri());
        let body = fetch_bytes(&client, &url, Transport::Embedded)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"Siri\":{}}");
    }

    /// Records the headers of every request before delegating.
    struct RecordingClient {
        inner: BasicClient,
        seen: std::sync::Mutex<Vec<reqwest::header::HeaderMap>>,
    }

    #[async_trait::async_trait]
    impl HttpClient for RecordingClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.seen.lock().unwrap().push(req.headers().clone());
            self.inner.execute(req).await
        }
    }

    #[tokio::test]
    async fn test_explicit_fetch_disables_keep_alive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vm.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<Siri/>"))
            .expect(2)
            .mount(&server)
            .await;

        let client = RecordingClient {
            inner: BasicClient::new(),
            seen: Default::default(),
        };
        let url = format!("{}/vm.xml", server.uri());

        let body = fetch_bytes(&client, &url, Transport::Explicit)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<Siri/>");
        fetch_bytes(&client, &url, Transport::Embedded)
            .await
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].get(CONNECTION).unwrap(), "close");
        assert!(seen[1].get(CONNECTION).is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = BasicClient::new();
        let url = format!("{}/vm.json", server.uri());
        for transport in [Transport::Embedded, Transport::Explicit] {
            let err = fetch_bytes(&client, &url, transport).await.unwrap_err();
            assert!(matches!(
                err,
                TransportError::Status { status, .. } if status.as_u16() == 503
            ));
        }
    }

    /// Serves one canned HTTP response over a raw socket and returns its URL.
    async fn serve_raw_once(response: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/vm.xml")
    }

    #[tokio::test]
    async fn test_explicit_fetch_oversized_content_length() {
        let url = serve_raw_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100000000000000\r\n\r\n<Siri/>",
        )
        .await;

        let client = BasicClient::new();
        let err = fetch_bytes(&client, &url, Transport::Explicit)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn test_explicit_fetch_from_raw_server() {
        let url = serve_raw_once(
            b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 13\r\n\r\n<Siri></Siri>",
        )
        .await;

        let client = BasicClient::new();
        let body = fetch_bytes(&client, &url, Transport::Explicit)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<Siri></Siri>");
    }

    #[tokio::test]
    async fn test_unparseable_url() {
        let client = BasicClient::new();
        let err = fetch_bytes(&client, "not a url.json?", Transport::Embedded)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = BasicClient::new();
        // Port 9 (discard) is not expected to accept HTTP connections.
        let err = fetch_bytes(&client, "http://127.0.0.1:9/vm.json", Transport::Explicit)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
