//! # MoneyTalk Chat
//!
//! Real-time chat client for the MoneyTalk marketplace: STOMP over
//! WebSocket with per-room subscriptions, automatic reconnection and an
//! explicit teardown handle, plus a small REST client for login and room
//! history.
//!
//! ## Example
//!
//! ```no_run
//! use moneytalk_chat::{ApiClient, ChatCallbacks, ChatClient, ChatClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = ApiClient::local()?;
//!     api.login("user@example.com", "password").await?;
//!
//!     let options = ChatClientOptions {
//!         cookie: api.session_cookie(),
//!         ..Default::default()
//!     };
//!     let client = ChatClient::new("ws://localhost:8080/ws-chat/websocket", options)?;
//!
//!     let connection = client.open(
//!         42,
//!         ChatCallbacks::new(|message| println!("{}: {}", message.sender_nickname, message.message))
//!             .on_forced_disconnect(|| eprintln!("session expired")),
//!     )?;
//!
//!     connection.teardown().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod infrastructure;
pub mod stomp;
pub mod types;
pub mod websocket;

pub use api::ApiClient;
pub use client::{
    BusTransport, ChatCallbacks, ChatClient, ChatClientBuilder, ChatClientOptions,
    ChatConnection, ConnectionManager, ConnectionStatus, Subscription,
};
pub use types::{ChatError, ChatMessage, MessageType, OutgoingChatMessage, Result};
