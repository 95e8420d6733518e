//! Shared plumbing for the HTTP clients of the agent runtime and the backend.

use std::time::Duration;

use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::GatewayError;

/// Outbound WebSocket to the agent runtime or the backend.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Non-streaming calls only; live sockets are not bounded.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub fn http_client() -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Append percent-encoded path segments to `base`, keeping any prefix path.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GatewayError::Internal(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Same host and path with the matching WebSocket scheme.
pub fn websocket_url(mut url: Url) -> Result<Url, GatewayError> {
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| GatewayError::Internal(format!("cannot use {url} as a WebSocket URL")))?;
    Ok(url)
}

pub async fn connect(service: &'static str, url: &Url) -> Result<UpstreamSocket, GatewayError> {
    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| GatewayError::unavailable(service, e))?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_prefix_and_encodes() {
        let base = Url::parse("http://backend:8080/coach/").unwrap();
        let url = join_segments(&base, &["api", "v1", "a b@x.com"]).unwrap();
        assert_eq!(url.as_str(), "http://backend:8080/coach/api/v1/a%20b@x.com");
    }

    #[test]
    fn websocket_scheme_follows_tls() {
        let ws = websocket_url(Url::parse("http://h:1/x").unwrap()).unwrap();
        assert_eq!(ws.scheme(), "ws");
        let wss = websocket_url(Url::parse("https://h/x").unwrap()).unwrap();
        assert_eq!(wss.as_str(), "wss://h/x");
    }
}
