use super::ChatClient;
use crate::stomp::HeartBeat;
use crate::types::constants::{
    DEFAULT_HEARTBEAT_INCOMING, DEFAULT_HEARTBEAT_OUTGOING, DEFAULT_RECONNECT_DELAY,
    SESSION_COOKIE, destinations,
};
use crate::types::{ChatError, Result};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ChatClientOptions {
    /// Topic prefix; the room id is appended (`/sub/chat/room/{roomId}`)
    pub subscribe_prefix: String,
    /// Application destination for outbound messages. The backend has
    /// shipped both `/pub/chat/message` and `/pub/chat/pub`.
    pub publish_destination: String,
    /// Delay between reconnect attempts (milliseconds)
    pub reconnect_delay: Option<u64>,
    /// Outgoing heart-beat offered on CONNECT (milliseconds, 0 disables)
    pub heartbeat_outgoing: Option<u64>,
    /// Incoming heart-beat requested on CONNECT (milliseconds, 0 disables)
    pub heartbeat_incoming: Option<u64>,
    /// Handshake timeout (milliseconds); none by default
    pub timeout: Option<u64>,
    /// Raw `Cookie` header for the WebSocket handshake
    pub cookie: Option<String>,
    /// Bearer token for the WebSocket handshake
    pub access_token: Option<String>,
}

impl Default for ChatClientOptions {
    fn default() -> Self {
        Self {
            subscribe_prefix: destinations::SUBSCRIBE_PREFIX.to_string(),
            publish_destination: destinations::PUBLISH.to_string(),
            reconnect_delay: None,
            heartbeat_outgoing: None,
            heartbeat_incoming: None,
            timeout: None,
            cookie: None,
            access_token: None,
        }
    }
}

impl ChatClientOptions {
    /// Defaults overlaid with `MONEYTALK_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(prefix) = lookup("MONEYTALK_SUBSCRIBE_PREFIX") {
            options.subscribe_prefix = prefix;
        }
        if let Some(destination) = lookup("MONEYTALK_PUBLISH_DESTINATION") {
            options.publish_destination = destination;
        }
        options.reconnect_delay = parse_millis(&lookup, "MONEYTALK_RECONNECT_DELAY_MS");
        options.heartbeat_outgoing = parse_millis(&lookup, "MONEYTALK_HEARTBEAT_OUTGOING_MS");
        options.heartbeat_incoming = parse_millis(&lookup, "MONEYTALK_HEARTBEAT_INCOMING_MS");
        options.timeout = parse_millis(&lookup, "MONEYTALK_CONNECT_TIMEOUT_MS");
        if let Some(token) = lookup("MONEYTALK_SESSION_TOKEN") {
            options = options.with_session_token(&token);
        }
        options.access_token = lookup("MONEYTALK_ACCESS_TOKEN");

        options
    }

    /// Sends the login cookie (`token=...`) on the WebSocket handshake
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.cookie = Some(format!("{}={}", SESSION_COOKIE, token));
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY))
    }

    pub fn heartbeat(&self) -> HeartBeat {
        HeartBeat::new(
            self.heartbeat_outgoing.unwrap_or(DEFAULT_HEARTBEAT_OUTGOING),
            self.heartbeat_incoming.unwrap_or(DEFAULT_HEARTBEAT_INCOMING),
        )
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}: '{}' is not a number of milliseconds", key, raw);
            None
        }
    }
}

/// Builder for ChatClient that validates configuration
pub struct ChatClientBuilder {
    endpoint: Url,
    options: ChatClientOptions,
}

impl ChatClientBuilder {
    /// Create a new builder
    pub fn new(endpoint: impl Into<String>, options: ChatClientOptions) -> Result<Self> {
        let endpoint = Url::parse(&endpoint.into())?;

        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(ChatError::Connection(format!(
                "unsupported endpoint scheme '{}', expected ws or wss",
                endpoint.scheme()
            )));
        }

        for (name, destination) in [
            ("subscribe prefix", &options.subscribe_prefix),
            ("publish destination", &options.publish_destination),
        ] {
            if !destination.starts_with('/') {
                return Err(ChatError::Connection(format!(
                    "{} must start with '/', got '{}'",
                    name, destination
                )));
            }
        }

        Ok(Self { endpoint, options })
    }

    pub fn build(self) -> ChatClient {
        ChatClient {
            endpoint: self.endpoint,
            options: Arc::new(self.options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let options = ChatClientOptions::default();
        assert_eq!(options.subscribe_prefix, "/sub/chat/room");
        assert_eq!(options.publish_destination, "/pub/chat/message");
        assert_eq!(options.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(options.heartbeat(), HeartBeat::new(10000, 10000));
        assert_eq!(options.connect_timeout(), None);
    }

    #[test]
    fn test_from_lookup_overlays_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MONEYTALK_PUBLISH_DESTINATION", "/pub/chat/pub"),
            ("MONEYTALK_RECONNECT_DELAY_MS", "250"),
            ("MONEYTALK_HEARTBEAT_OUTGOING_MS", "0"),
            ("MONEYTALK_CONNECT_TIMEOUT_MS", "soon"),
            ("MONEYTALK_SESSION_TOKEN", "abc.def"),
        ]);
        let options = ChatClientOptions::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(options.publish_destination, "/pub/chat/pub");
        assert_eq!(options.subscribe_prefix, "/sub/chat/room");
        assert_eq!(options.reconnect_delay(), Duration::from_millis(250));
        assert_eq!(options.heartbeat(), HeartBeat::new(0, 10000));
        assert_eq!(options.timeout, None);
        assert_eq!(options.cookie.as_deref(), Some("token=abc.def"));
        assert_eq!(options.access_token, None);
    }

    #[test]
    fn test_builder_rejects_bad_endpoints() {
        assert!(matches!(
            ChatClientBuilder::new("not a url", ChatClientOptions::default()),
            Err(ChatError::UrlParse(_))
        ));
        assert!(matches!(
            ChatClientBuilder::new("http://localhost:8080/ws-chat", ChatClientOptions::default()),
            Err(ChatError::Connection(_))
        ));
        assert!(ChatClientBuilder::new("wss://chat.example/ws-chat/websocket", ChatClientOptions::default()).is_ok());
    }

    #[test]
    fn test_builder_rejects_relative_destinations() {
        let options = ChatClientOptions {
            publish_destination: "pub/chat/message".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ChatClientBuilder::new("ws://localhost:8080/ws-chat/websocket", options),
            Err(ChatError::Connection(_))
        ));
    }
}
