pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{ChatError, Result};
pub use message::{ChatMessage, MessageType, OutgoingChatMessage};
