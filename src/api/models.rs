//! REST payloads exchanged with the marketplace backend.
//!
//! Timestamps are server-local date-times (`2025-04-25T16:30:00`) and are
//! kept as strings.

use crate::types::MessageType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub nickname: &'a str,
}

/// Body of a successful login. The session token also arrives as an
/// httpOnly `token` cookie; some backend builds echo it here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    pub email: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: u64,
    pub email: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: u64,
    pub email: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicknameSuggestion {
    pub base: String,
    pub available: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductStatus {
    Sale,
    Reserved,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub seller_nickname: Option<String>,
}

/// Room returned when a buyer opens a chat on a product
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub chat_room_id: u64,
    pub product_id: u64,
    pub buyer_nickname: String,
    pub seller_nickname: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
}

/// Entry of the signed-in user's room list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomSummary {
    pub chat_room_id: u64,
    pub product_id: u64,
    #[serde(default)]
    pub product_title: Option<String>,
    #[serde(default)]
    pub product_thumbnail_url: Option<String>,
    #[serde(default)]
    pub opponent_nickname: Option<String>,
    #[serde(default)]
    pub opponent_profile_image: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
    // Jackson drops the `is` prefix of boolean getters
    #[serde(default, rename = "closed", alias = "isClosed")]
    pub is_closed: bool,
    #[serde(default)]
    pub opponent_user_id: Option<u64>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Persisted message from a room's history
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryMessage {
    pub message_id: u64,
    pub sender_id: u64,
    #[serde(default)]
    pub sender_nickname: Option<String>,
    #[serde(default)]
    pub sender_profile_image: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub sent_at: String,
    #[serde(default, rename = "read", alias = "isRead")]
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_response_without_token() {
        let response: LoginResponse =
            serde_json::from_value(json!({"email": "a@b.c", "nickname": "dohyun"})).unwrap();
        assert_eq!(response.token, None);
        assert_eq!(response.nickname, "dohyun");
    }

    #[test]
    fn test_room_summary_accepts_jackson_boolean_names() {
        let summary: ChatRoomSummary = serde_json::from_value(json!({
            "chatRoomId": 1001,
            "productId": 2002,
            "productTitle": "Galaxy Z Flip 5",
            "opponentNickname": "jenny88",
            "lastMessage": null,
            "closed": true,
            "opponentUserId": 15,
            "unreadCount": 2
        }))
        .unwrap();
        assert!(summary.is_closed);
        assert_eq!(summary.unread_count, 2);
        assert_eq!(summary.last_message, None);

        let summary: ChatRoomSummary = serde_json::from_value(json!({
            "chatRoomId": 1, "productId": 2, "isClosed": true
        }))
        .unwrap();
        assert!(summary.is_closed);
        assert_eq!(summary.unread_count, 0);
    }

    #[test]
    fn test_history_message() {
        let message: ChatHistoryMessage = serde_json::from_value(json!({
            "messageId": 9,
            "senderId": 7,
            "senderNickname": "jenny88",
            "senderProfileImage": null,
            "message": null,
            "imageUrl": "https://cdn.example/a.png",
            "type": "IMAGE",
            "sentAt": "2025-04-25T16:30:00",
            "read": false
        }))
        .unwrap();
        assert_eq!(message.kind, MessageType::Image);
        assert_eq!(message.message, None);
        assert!(!message.is_read);
    }

    #[test]
    fn test_product_status() {
        let product: Product = serde_json::from_value(json!({
            "id": 3,
            "title": "Bike",
            "price": 120000,
            "status": "RESERVED",
            "createdAt": "2025-04-25T16:30:00",
            "sellerNickname": "jenny88"
        }))
        .unwrap();
        assert_eq!(product.status, ProductStatus::Reserved);
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_signup_request_shape() {
        let body = serde_json::to_value(SignupRequest {
            email: "a@b.c",
            password: "pw",
            nickname: "dohyun",
        })
        .unwrap();
        assert_eq!(body, json!({"email": "a@b.c", "password": "pw", "nickname": "dohyun"}));
    }
}
