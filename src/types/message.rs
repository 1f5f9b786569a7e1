use serde::{Deserialize, Deserializer, Serialize};

/// Kind of chat message carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Text,
    Image,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message delivered by the broker on a room topic.
///
/// `sent_at` is kept verbatim; depending on the backend build it is either
/// a local date-time (`2025-04-25T14:05:00`) or an RFC 3339 instant
/// (`2024-01-01T00:00:00Z`). Live broadcasts echo the sender's payload and
/// usually carry `null` here, so it is only set on persisted messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub chat_room_id: u64,
    pub sender_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sender_nickname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sent_at: Option<String>,
}

// The backend emits `null` for empty text fields (image-only messages).
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload published to the broker when sending a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChatMessage {
    pub chat_room_id: u64,
    pub sender_id: u64,
    pub sender_nickname: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl OutgoingChatMessage {
    pub fn text(
        chat_room_id: u64,
        sender_id: u64,
        sender_nickname: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            chat_room_id,
            sender_id,
            sender_nickname: sender_nickname.into(),
            message: message.into(),
            kind: MessageType::Text,
            image_url: None,
        }
    }

    pub fn image(
        chat_room_id: u64,
        sender_id: u64,
        sender_nickname: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            chat_room_id,
            sender_id,
            sender_nickname: sender_nickname.into(),
            message: String::new(),
            kind: MessageType::Image,
            image_url: Some(image_url.into()),
        }
    }

    pub fn with_caption(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Serializes the payload for publishing. `imageUrl` only travels with
    /// `IMAGE` messages.
    pub fn to_json(&self) -> serde_json::Result<String> {
        if self.kind == MessageType::Image || self.image_url.is_none() {
            return serde_json::to_string(self);
        }

        let mut stripped = self.clone();
        stripped.image_url = None;
        serde_json::to_string(&stripped)
    }
}
