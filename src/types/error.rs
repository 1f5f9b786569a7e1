use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur when using the MoneyTalk chat client.
#[derive(Error, Debug)]
pub enum ChatError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected STOMP frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error from the REST client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Room ids are positive integers
    #[error("Invalid room id: {0}")]
    InvalidRoom(u64),

    /// Handshake did not complete within the configured timeout
    #[error("Timeout error")]
    Timeout,

    /// The broker closed the socket before the operation finished
    #[error("Connection closed")]
    Closed,
}

/// Convenience type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
