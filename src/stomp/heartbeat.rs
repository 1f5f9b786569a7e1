use crate::types::constants::HEARTBEAT_GRACE_FACTOR;
use crate::types::{ChatError, Result};
use std::time::Duration;

/// STOMP heart-beat setting, in milliseconds. Zero disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub outgoing: u64,
    pub incoming: u64,
}

impl HeartBeat {
    pub fn new(outgoing: u64, incoming: u64) -> Self {
        Self { outgoing, incoming }
    }

    /// Parses a `heart-beat:cx,cy` header value
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ChatError::Protocol(format!("invalid heart-beat header '{}'", value));

        let (outgoing, incoming) = value.split_once(',').ok_or_else(invalid)?;
        Ok(Self {
            outgoing: outgoing.trim().parse().map_err(|_| invalid())?,
            incoming: incoming.trim().parse().map_err(|_| invalid())?,
        })
    }

    pub fn to_header(&self) -> String {
        format!("{},{}", self.outgoing, self.incoming)
    }

    /// Combines what the client offered with what the server answered in
    /// CONNECTED. Each direction runs at the slower of the two rates, or not
    /// at all if either side declined.
    pub fn negotiate(client: HeartBeat, server: HeartBeat) -> HeartBeat {
        let outgoing = if client.outgoing == 0 || server.incoming == 0 {
            0
        } else {
            client.outgoing.max(server.incoming)
        };
        let incoming = if client.incoming == 0 || server.outgoing == 0 {
            0
        } else {
            client.incoming.max(server.outgoing)
        };
        HeartBeat { outgoing, incoming }
    }

    /// How often the client must write an EOL to keep the session alive
    pub fn outgoing_interval(&self) -> Option<Duration> {
        (self.outgoing > 0).then(|| Duration::from_millis(self.outgoing))
    }

    /// How long the server may stay silent before the socket counts as dead
    pub fn incoming_timeout(&self) -> Option<Duration> {
        (self.incoming > 0).then(|| Duration::from_millis(self.incoming) * HEARTBEAT_GRACE_FACTOR)
    }
}
