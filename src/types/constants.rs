/// STOMP header names (magic strings layer)
pub mod stomp_headers {
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HOST: &str = "host";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const VERSION: &str = "version";
    pub const ID: &str = "id";
    pub const DESTINATION: &str = "destination";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const MESSAGE: &str = "message";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const RECEIPT_ID: &str = "receipt-id";
}

/// Broker destinations used by the chat backend
pub mod destinations {
    /// Per-room topic prefix; the room id is appended as the last segment.
    pub const SUBSCRIBE_PREFIX: &str = "/sub/chat/room";
    /// Application destination that accepts outbound chat messages.
    ///
    /// Backend builds that map `@MessageMapping("/chat/pub")` only route
    /// `/pub/chat/pub`; point `MONEYTALK_PUBLISH_DESTINATION` there for them.
    pub const PUBLISH: &str = "/pub/chat/message";
}

/// STOMP versions offered on CONNECT
pub const ACCEPT_VERSIONS: &str = "1.2,1.1,1.0";

/// Content type of chat payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default WebSocket endpoint (raw WebSocket path of the SockJS-enabled `/ws-chat` endpoint)
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws-chat/websocket";

/// Default REST base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";

/// Name of the session cookie issued on login
pub const SESSION_COOKIE: &str = "token";

/// Default delay between reconnect attempts (milliseconds)
pub const DEFAULT_RECONNECT_DELAY: u64 = 5000;

/// Default heart-beat intervals offered on CONNECT (milliseconds)
pub const DEFAULT_HEARTBEAT_OUTGOING: u64 = 10000;
pub const DEFAULT_HEARTBEAT_INCOMING: u64 = 10000;

/// Silence tolerated on the incoming side, as a multiple of the negotiated interval
pub const HEARTBEAT_GRACE_FACTOR: u32 = 2;
