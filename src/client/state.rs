use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Connection status as seen by the view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Connected,
    Reconnecting,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Disconnected => "DISCONNECTED",
        }
    }

    pub fn is_connected(&self) -> bool {
        *self == Self::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type MessageCallback = Box<dyn FnMut(ChatMessage) + Send + 'static>;
type StatusCallback = Box<dyn FnMut(ConnectionStatus) + Send + 'static>;
type SignalCallback = Box<dyn FnMut() + Send + 'static>;

/// Handlers a view registers when opening a room connection.
///
/// All of them run on the connection's driver task, one at a time and in
/// transport order.
pub struct ChatCallbacks {
    pub(crate) on_message: MessageCallback,
    pub(crate) on_status_change: Option<StatusCallback>,
    pub(crate) on_forced_disconnect: Option<SignalCallback>,
    pub(crate) on_reconnected: Option<SignalCallback>,
}

impl ChatCallbacks {
    pub fn new<F>(on_message: F) -> Self
    where
        F: FnMut(ChatMessage) + Send + 'static,
    {
        Self {
            on_message: Box::new(on_message),
            on_status_change: None,
            on_forced_disconnect: None,
            on_reconnected: None,
        }
    }

    pub fn on_status_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ConnectionStatus) + Send + 'static,
    {
        self.on_status_change = Some(Box::new(callback));
        self
    }

    /// Fired when the socket closes while the transport is not connected,
    /// which the backend uses to signal an expired session.
    pub fn on_forced_disconnect<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_forced_disconnect = Some(Box::new(callback));
        self
    }

    pub fn on_reconnected<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_reconnected = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for ChatCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCallbacks")
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_forced_disconnect", &self.on_forced_disconnect.is_some())
            .field("on_reconnected", &self.on_reconnected.is_some())
            .finish_non_exhaustive()
    }
}
