use crate::client::{BusTransport, Subscription};
use crate::stomp::StompFrame;
use std::collections::VecDeque;

/// [`BusTransport`] that turns bus operations into queued STOMP frames.
///
/// The driver owns the socket and drains the outbox after every call into
/// the connection manager, so nothing here touches I/O.
#[derive(Debug, Default)]
pub struct StompTransport {
    connected: bool,
    outbox: VecDeque<StompFrame>,
    close_requested: bool,
}

impl StompTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// CONNECTED was received on a fresh socket
    pub fn mark_connected(&mut self) {
        self.connected = true;
        self.close_requested = false;
        self.outbox.clear();
    }

    /// The socket went away; anything still queued is stale
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.outbox.clear();
    }

    pub fn next_frame(&mut self) -> Option<StompFrame> {
        self.outbox.pop_front()
    }

    /// Returns true once after `close` was requested
    pub fn take_close_request(&mut self) -> bool {
        std::mem::take(&mut self.close_requested)
    }

    fn enqueue(&mut self, frame: StompFrame) {
        if !self.connected {
            tracing::debug!("Dropping {} frame: transport not connected", frame.command);
            return;
        }
        self.outbox.push_back(frame);
    }
}

impl BusTransport for StompTransport {
    fn subscribe(&mut self, subscription: &Subscription) {
        self.enqueue(StompFrame::subscribe(
            &subscription.id,
            &subscription.destination,
        ));
    }

    fn unsubscribe(&mut self, subscription: &Subscription) {
        self.enqueue(StompFrame::unsubscribe(&subscription.id));
    }

    fn publish(&mut self, destination: &str, body: String) {
        self.enqueue(StompFrame::send(destination, body));
    }

    fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.enqueue(StompFrame::disconnect());
        self.close_requested = true;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
