// Module declarations
mod builder;
mod connection;
mod core;
mod handle;
mod state;

// Public API exports
pub use builder::{ChatClientBuilder, ChatClientOptions};
pub use connection::{BusTransport, ConnectionManager, Subscription};
pub use core::ChatClient;
pub use handle::ChatConnection;
pub use state::{ChatCallbacks, ConnectionStatus};
