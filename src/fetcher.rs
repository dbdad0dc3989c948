//! Source fetching.
//!
//! [`Fetch`] is the seam between the aggregator and the network: the
//! aggregator only needs "address in, text out", so tests can plug in an
//! in-memory implementation while the binary uses [`HttpFetcher`].

use std::time::Duration;

use crate::error::{FetchCause, FetchError};
use crate::Result;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Retrieves the raw text of one source.
pub trait Fetch: Sync {
    /// Fetch the full body of `address`.
    ///
    /// Implementations must not retry; a failure is reported once and the
    /// caller moves on.
    fn fetch(&self, address: &str) -> std::result::Result<String, FetchError>;
}

/// HTTP(S) fetcher backed by a blocking reqwest client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout and user agent.
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT, &default_user_agent())
    }

    /// Create a fetcher with a custom timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, address: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(address)
            .send()
            .map_err(|e| FetchError::new(address, FetchCause::Transport(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(address, FetchCause::Status(status.as_u16())));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::new(address, FetchCause::Body(e.to_string())))?;

        log::debug!("Fetched {} ({} bytes, {})", address, body.len(), status);
        Ok(body)
    }
}

/// User agent sent with every request.
pub fn default_user_agent() -> String {
    format!("rulemerge/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve a single canned HTTP response on a random local port.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/list.txt", addr)
    }

    #[test]
    fn test_fetch_success() {
        let url = serve_once("200 OK", "||a.com^\n! comment\n");
        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher.fetch(&url).unwrap();
        assert_eq!(body, "||a.com^\n! comment\n");
    }

    #[test]
    fn test_fetch_non_success_status() {
        let url = serve_once("404 Not Found", "missing");
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&url).unwrap_err();
        assert_eq!(err.address, url);
        assert_eq!(err.cause, FetchCause::Status(404));
    }

    #[test]
    fn test_fetch_transport_failure() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/list.txt", port);

        let fetcher = HttpFetcher::with_options(Duration::from_secs(2), "test").unwrap();
        let err = fetcher.fetch(&url).unwrap_err();
        assert!(matches!(err.cause, FetchCause::Transport(_)));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(default_user_agent().starts_with("rulemerge/"));
    }
}
