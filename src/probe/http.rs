//! HTTP probe implementation.

use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};

use super::{round_to_millis, Probe, ProbeConfig, ProbeError};

/// Measures the round trip of a `HEAD` request. Any HTTP status counts as a
/// response; the body is never read.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .referer(false)
            .no_proxy()
            .build()
            .map_err(|e| ProbeError::Unknown(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

impl Probe for HttpProbe {
    async fn measure(&self, url: &str) -> Result<u64, ProbeError> {
        run_http_probe(&self.client, url, self.timeout).await
    }
}

/// Run an HTTP probe against the given address.
///
/// Returns latency in milliseconds. The deadline covers the whole request;
/// when it fires the request future is dropped, which closes the connection.
pub async fn run_http_probe(
    client: &reqwest::Client,
    address: &str,
    timeout: Duration,
) -> Result<u64, ProbeError> {
    let url = cache_busted(&normalize_url(address));

    let request = client
        .head(&url)
        .header(CACHE_CONTROL, "no-store")
        .header(PRAGMA, "no-cache")
        .send();

    let start = Instant::now();

    match tokio::time::timeout(timeout, request).await {
        Err(_) => Err(ProbeError::Timeout(timeout)),
        Ok(Err(e)) => Err(classify_error(&e, timeout)),
        Ok(Ok(_response)) => Ok(round_to_millis(start.elapsed())),
    }
}

/// Prefix bare host names with `http://`.
pub fn normalize_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Append a unique query parameter so no intermediate cache answers.
pub fn cache_busted(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let nonce: u32 = rand::random();
    format!(
        "{}{}t={}-{:08x}",
        url,
        separator,
        Utc::now().timestamp_millis(),
        nonce
    )
}

fn classify_error(e: &reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if e.is_connect() || e.is_request() || e.is_body() {
        ProbeError::Network(e.to_string())
    } else {
        ProbeError::Unknown(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    fn probe_with_timeout(ms: u64) -> HttpProbe {
        HttpProbe::new(&ProbeConfig::new(Duration::from_millis(ms))).unwrap()
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_cache_busted_separator() {
        let plain = cache_busted("https://example.com/trace");
        assert!(plain.starts_with("https://example.com/trace?t="));

        let with_query = cache_busted("https://example.com/trace?x=1");
        assert!(with_query.starts_with("https://example.com/trace?x=1&t="));

        assert_ne!(cache_busted("https://example.com"), cache_busted("https://example.com"));
    }

    #[tokio::test]
    async fn test_http_probe_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
                .await;
        });

        let probe = probe_with_timeout(2000);
        let latency = assert_ok!(probe.measure(&format!("http://{}/", addr)).await);
        assert!(latency < 2000);
    }

    #[tokio::test]
    async fn test_http_probe_timeout() {
        // Accepts connections but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let probe = probe_with_timeout(200);
        let result = probe.measure(&format!("http://{}/", addr)).await;
        assert_eq!(result, Err(ProbeError::Timeout(Duration::from_millis(200))));
    }

    #[tokio::test]
    async fn test_http_probe_invalid_url_is_unknown() {
        let probe = probe_with_timeout(2000);
        let result = probe.measure("http://exa mple.com/").await;
        assert!(matches!(result, Err(ProbeError::Unknown(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_http_probe_closed_before_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                drop(socket);
            }
        });

        let probe = probe_with_timeout(2000);
        let result = probe.measure(&format!("http://{}/", addr)).await;
        assert!(matches!(result, Err(ProbeError::Network(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_http_probe_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = probe_with_timeout(2000);
        let result = probe.measure(&format!("http://{}/", addr)).await;
        assert!(matches!(result, Err(ProbeError::Network(_))), "got {:?}", result);
    }
}
