use crate::client::ChatClientOptions;
use crate::types::{ChatError, Result};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, COOKIE, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket factory for creating broker connections
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Opens a WebSocket to `endpoint`, carrying the session cookie and
    /// bearer token the backend's handshake interceptor checks.
    pub async fn create(endpoint: &str, options: &ChatClientOptions) -> Result<WsStream> {
        let mut request = endpoint.into_client_request()?;

        if let Some(cookie) = &options.cookie {
            request
                .headers_mut()
                .insert(COOKIE, header_value(cookie, "cookie")?);
        }
        if let Some(token) = &options.access_token {
            request.headers_mut().insert(
                AUTHORIZATION,
                header_value(&format!("Bearer {}", token), "access token")?,
            );
        }

        tracing::debug!("Creating WebSocket connection to: {}", endpoint);
        let (stream, response) = connect_async(request).await?;
        tracing::debug!("WebSocket handshake answered with {}", response.status());

        Ok(stream)
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ChatError::Connection(format!("invalid {} header: {}", what, e)))
}
