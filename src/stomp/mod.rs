// STOMP 1.2 wire layer - frame codec and heart-beat negotiation
mod frame;
mod heartbeat;

pub use frame::{StompCommand, StompFrame};
pub use heartbeat::HeartBeat;
