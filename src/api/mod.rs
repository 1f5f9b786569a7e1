//! REST companion for the chat client: authentication, products, rooms
//! and message history.

mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    ChatHistoryMessage, ChatRoom, ChatRoomSummary, LoginResponse, NicknameSuggestion, Product,
    ProductStatus, SignupResponse, UserInfo,
};
