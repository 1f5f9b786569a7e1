use super::ConnectionStatus;
use super::core::Command;
use crate::types::OutgoingChatMessage;
use tokio::sync::{mpsc, oneshot, watch};

/// Handle to one room connection, returned by
/// [`ChatClient::open`](super::ChatClient::open).
///
/// Clones share the same connection. Dropping the last clone tears the
/// connection down in the background; call [`teardown`](Self::teardown) to
/// wait for it.
#[derive(Debug, Clone)]
pub struct ChatConnection {
    room_id: u64,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ChatConnection {
    pub(crate) fn new(
        room_id: u64,
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        Self {
            room_id,
            commands,
            status,
        }
    }

    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Receiver that observes every status change
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Publishes a message to the room.
    ///
    /// Fire-and-forget: the message is dropped without error unless the
    /// connection is `CONNECTED` when the driver picks it up. Gate sends on
    /// [`status`](Self::status) if loss matters.
    pub fn send(&self, message: OutgoingChatMessage) {
        if self.commands.send(Command::Send(message)).is_err() {
            tracing::debug!(
                "Dropping outbound message: room {} connection is gone",
                self.room_id
            );
        }
    }

    /// Unsubscribes, closes the socket and reports `DISCONNECTED`.
    ///
    /// Returns once no further callbacks can fire. Safe to call repeatedly
    /// and before the connection ever succeeded.
    pub async fn teardown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Teardown(ack_tx)).is_err() {
            return;
        }
        // Err means the driver already exited after an earlier teardown
        let _ = ack_rx.await;
    }
}
