//! This module provides the fetcher abstraction and its HTTP implementation.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use reqwest::Client;
pub use url::Url;

/// Upper bound of the buffer preallocated from an announced `Content-Length`, the body growing it past that if needed.
const MAX_PREALLOCATION: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("fetcher panicked")]
    Panicked,
}

/// Retrieve the whole content behind a URL.
///
/// Implementors own their transport policy (timeouts, TLS, status handling). Callers never retry.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Transport settings of the [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Whole request timeout, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
        }
    }
}

/// A [`Fetcher`] issuing `GET` requests, any non-2xx status being an error.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }

}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let url = Url::parse(url)?;

        let mut resp = self.client.get(url).send().await?.error_for_status()?;

        let capacity = resp.content_length().map_or(0, |len| len.min(MAX_PREALLOCATION));
        let mut body = BytesMut::with_capacity(capacity as usize);

        while let Some(chunk) = resp.chunk().await? {
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>ok</html>".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetchSettings::default()).unwrap();
        let body = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();

        assert_eq!(&body[..], b"<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_fails_on_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::default();
        let err = fetcher.fetch(&format!("{}/missing", server.uri())).await.unwrap_err();

        match err {
            FetchError::Reqwest(err) => assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND)),
            err => panic!("unexpected error: {err:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let settings = FetchSettings {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();

        assert!(matches!(err, FetchError::Reqwest(ref err) if err.is_timeout()), "{err:?}");
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let fetcher = HttpFetcher::default();

        let err = fetcher.fetch("dummyUrl1").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl(url::ParseError::RelativeUrlWithoutBase)));
    }

    #[tokio::test]
    async fn test_announced_length_is_not_trusted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000000000000\r\n\r\nOK")
                .await
                .unwrap();
        });

        let fetcher = HttpFetcher::default();
        let result = fetcher.fetch(&format!("http://{addr}/huge")).await;

        // the connection closes long before the announced length, without the whole length being allocated
        match result {
            Ok(body) => assert_eq!(&body[..], b"OK"),
            Err(err) => assert!(matches!(err, FetchError::Reqwest(_)), "{err:?}"),
        }
    }
}
