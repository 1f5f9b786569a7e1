mod factory;
mod transport;

pub use factory::{WebSocketFactory, WsStream};
pub use transport::StompTransport;
