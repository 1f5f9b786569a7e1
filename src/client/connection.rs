use super::{ChatCallbacks, ConnectionStatus};
use crate::types::constants::destinations;
use crate::types::{ChatMessage, OutgoingChatMessage};
use tokio::sync::watch;

/// Interest in one room's message topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub destination: String,
}

/// Outbound side of a message-bus connection.
///
/// Calls are fire-and-forget; implementations queue or drop work as their
/// own connection state allows and never block.
pub trait BusTransport {
    fn subscribe(&mut self, subscription: &Subscription);
    fn unsubscribe(&mut self, subscription: &Subscription);
    fn publish(&mut self, destination: &str, body: String);
    fn close(&mut self);
    /// Whether the bus session is currently usable
    fn is_connected(&self) -> bool;
}

/// State machine for one room-scoped connection.
///
/// The driver feeds it transport events through the `handle_*` methods;
/// the view reaches it through `send` and `teardown`. Every status change
/// updates the status watch and notifies the view before anything else
/// happens.
pub struct ConnectionManager<T: BusTransport> {
    room_id: u64,
    subscribe_prefix: String,
    publish_destination: String,
    transport: T,
    callbacks: ChatCallbacks,
    status: ConnectionStatus,
    subscription: Option<Subscription>,
    was_disconnected: bool,
    torn_down: bool,
    subscription_counter: u64,
    status_tx: Option<watch::Sender<ConnectionStatus>>,
}

impl<T: BusTransport> ConnectionManager<T> {
    pub fn new(room_id: u64, transport: T, callbacks: ChatCallbacks) -> Self {
        Self {
            room_id,
            subscribe_prefix: destinations::SUBSCRIBE_PREFIX.to_string(),
            publish_destination: destinations::PUBLISH.to_string(),
            transport,
            callbacks,
            status: ConnectionStatus::Disconnected,
            subscription: None,
            was_disconnected: false,
            torn_down: false,
            subscription_counter: 0,
            status_tx: None,
        }
    }

    pub fn with_destinations(
        mut self,
        subscribe_prefix: impl Into<String>,
        publish_destination: impl Into<String>,
    ) -> Self {
        self.subscribe_prefix = subscribe_prefix.into();
        self.publish_destination = publish_destination.into();
        self
    }

    /// Mirrors every status change into a watch channel
    pub fn with_status_watch(mut self, status_tx: watch::Sender<ConnectionStatus>) -> Self {
        status_tx.send_replace(self.status);
        self.status_tx = Some(status_tx);
        self
    }

    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Topic the room's messages arrive on
    pub fn room_destination(&self) -> String {
        format!(
            "{}/{}",
            self.subscribe_prefix.trim_end_matches('/'),
            self.room_id
        )
    }

    /// The bus handshake completed
    pub fn handle_connected(&mut self) {
        if self.torn_down {
            tracing::debug!("Ignoring handshake for torn down room {}", self.room_id);
            return;
        }

        self.set_status(ConnectionStatus::Connected);

        if self.was_disconnected {
            self.was_disconnected = false;
            tracing::info!("Reconnected to room {}", self.room_id);
            if let Some(callback) = self.callbacks.on_reconnected.as_mut() {
                callback();
            }
        }

        self.release_subscription();
        self.subscribe();
    }

    /// A MESSAGE frame arrived. Frames for anything but the active
    /// subscription, and bodies that do not decode, are dropped.
    pub fn handle_message(&mut self, subscription_id: Option<&str>, body: &str) {
        if self.torn_down {
            tracing::debug!("Dropping message for torn down room {}", self.room_id);
            return;
        }

        let Some(active) = self.subscription.as_ref() else {
            tracing::warn!("Dropping message for room {}: no active subscription", self.room_id);
            return;
        };

        if let Some(id) = subscription_id
            && id != active.id
        {
            tracing::warn!(
                "Dropping message for stale subscription {} (active: {})",
                id,
                active.id
            );
            return;
        }

        match serde_json::from_str::<ChatMessage>(body) {
            Ok(message) => {
                tracing::debug!(
                    "Received message in room {} from sender {}",
                    message.chat_room_id,
                    message.sender_id
                );
                (self.callbacks.on_message)(message);
            }
            Err(e) => {
                tracing::warn!("Failed to parse chat message: {} - Raw: {}", e, body);
            }
        }
    }

    /// The transport closed, expectedly or not
    pub fn handle_closed(&mut self) {
        if self.torn_down {
            return;
        }

        let transport_connected = self.transport.is_connected();

        // The broker drops subscriptions together with the socket
        self.subscription = None;
        self.was_disconnected = true;
        self.set_status(ConnectionStatus::Reconnecting);

        if !transport_connected {
            tracing::warn!("Room {} lost its bus session", self.room_id);
            if let Some(callback) = self.callbacks.on_forced_disconnect.as_mut() {
                callback();
            }
        }
    }

    /// Broker-reported error; status is driven by open/close events only
    pub fn handle_error(&mut self, message: &str) {
        tracing::error!("Broker error on room {}: {}", self.room_id, message);
    }

    /// Publishes a chat message if connected, otherwise drops it silently
    pub fn send(&mut self, message: OutgoingChatMessage) {
        if self.torn_down || self.status != ConnectionStatus::Connected {
            tracing::debug!(
                "Dropping outbound message for room {} while {}",
                self.room_id,
                self.status
            );
            return;
        }

        match message.to_json() {
            Ok(body) => self.transport.publish(&self.publish_destination, body),
            Err(e) => tracing::warn!("Failed to serialize chat message: {}", e),
        }
    }

    /// Releases the subscription and closes the transport. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        tracing::info!("Tearing down connection to room {}", self.room_id);
        self.release_subscription();
        self.transport.close();
        self.set_status(ConnectionStatus::Disconnected);
        self.torn_down = true;
    }

    fn subscribe(&mut self) {
        let subscription = Subscription {
            id: format!("sub-{}", self.subscription_counter),
            destination: self.room_destination(),
        };
        self.subscription_counter += 1;

        tracing::info!("Subscribing to {}", subscription.destination);
        self.transport.subscribe(&subscription);
        self.subscription = Some(subscription);
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::debug!("Releasing subscription {}", subscription.id);
            self.transport.unsubscribe(&subscription);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        if let Some(tx) = &self.status_tx {
            tx.send_replace(status);
        }
        if let Some(callback) = self.callbacks.on_status_change.as_mut() {
            callback(status);
        }
    }
}

impl<T: BusTransport> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("room_id", &self.room_id)
            .field("status", &self.status)
            .field("subscription", &self.subscription)
            .field("was_disconnected", &self.was_disconnected)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Subscribe(Subscription),
        Unsubscribe(String),
        Publish(String, String),
        Close,
    }

    #[derive(Default)]
    struct RecordingTransport {
        connected: bool,
        calls: Vec<Call>,
    }

    impl BusTransport for RecordingTransport {
        fn subscribe(&mut self, subscription: &Subscription) {
            self.calls.push(Call::Subscribe(subscription.clone()));
        }

        fn unsubscribe(&mut self, subscription: &Subscription) {
            self.calls.push(Call::Unsubscribe(subscription.id.clone()));
        }

        fn publish(&mut self, destination: &str, body: String) {
            self.calls.push(Call::Publish(destination.to_string(), body));
        }

        fn close(&mut self) {
            self.connected = false;
            self.calls.push(Call::Close);
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Message(ChatMessage),
        Status(ConnectionStatus),
        Forced,
        Reconnected,
    }

    fn recording_manager(room_id: u64) -> (ConnectionManager<RecordingTransport>, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));

        let on_message = Arc::clone(&events);
        let on_status = Arc::clone(&events);
        let on_forced = Arc::clone(&events);
        let on_reconnected = Arc::clone(&events);

        let callbacks = ChatCallbacks::new(move |msg| on_message.lock().unwrap().push(Event::Message(msg)))
            .on_status_change(move |status| on_status.lock().unwrap().push(Event::Status(status)))
            .on_forced_disconnect(move || on_forced.lock().unwrap().push(Event::Forced))
            .on_reconnected(move || on_reconnected.lock().unwrap().push(Event::Reconnected));

        (
            ConnectionManager::new(room_id, RecordingTransport::default(), callbacks),
            events,
        )
    }

    fn connect(manager: &mut ConnectionManager<RecordingTransport>) {
        manager.transport_mut().connected = true;
        manager.handle_connected();
    }

    fn drop_socket(manager: &mut ConnectionManager<RecordingTransport>) {
        manager.transport_mut().connected = false;
        manager.handle_closed();
    }

    fn take(events: &Arc<Mutex<Vec<Event>>>) -> Vec<Event> {
        std::mem::take(&mut *events.lock().unwrap())
    }

    fn statuses(events: &[Event]) -> Vec<ConnectionStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Status(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    const INBOUND: &str = r#"{"chatRoomId":42,"senderId":7,"senderNickname":"A","message":"hi","type":"TEXT","sentAt":"2024-01-01T00:00:00Z"}"#;

    #[test]
    fn test_room_42_scenario() {
        let (mut manager, events) = recording_manager(42);

        // connect
        connect(&mut manager);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(take(&events), vec![Event::Status(ConnectionStatus::Connected)]);
        let subscription = manager.subscription().cloned().unwrap();
        assert_eq!(subscription.destination, "/sub/chat/room/42");
        assert_eq!(manager.transport().calls, vec![Call::Subscribe(subscription.clone())]);

        // inbound message
        manager.handle_message(Some(&subscription.id), INBOUND);
        assert_eq!(
            take(&events),
            vec![Event::Message(ChatMessage {
                chat_room_id: 42,
                sender_id: 7,
                sender_nickname: "A".to_string(),
                message: "hi".to_string(),
                kind: MessageType::Text,
                image_url: None,
                sent_at: Some("2024-01-01T00:00:00Z".to_string()),
            })]
        );

        // outbound message while connected
        manager.send(OutgoingChatMessage::text(42, 7, "A", "bye"));
        let publishes: Vec<_> = manager
            .transport()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Publish(dest, body) => Some((dest.clone(), body.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(publishes.len(), 1);
        assert_eq!(publishes[0].0, "/pub/chat/message");
        let body: serde_json::Value = serde_json::from_str(&publishes[0].1).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "chatRoomId": 42,
                "senderId": 7,
                "senderNickname": "A",
                "message": "bye",
                "type": "TEXT"
            })
        );

        // unexpected close
        drop_socket(&mut manager);
        assert_eq!(manager.status(), ConnectionStatus::Reconnecting);
        assert_eq!(
            take(&events),
            vec![Event::Status(ConnectionStatus::Reconnecting), Event::Forced]
        );
        assert!(manager.subscription().is_none());

        // reconnect
        connect(&mut manager);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert_eq!(
            take(&events),
            vec![Event::Status(ConnectionStatus::Connected), Event::Reconnected]
        );
        let resubscribed = manager.subscription().cloned().unwrap();
        assert_eq!(resubscribed.destination, "/sub/chat/room/42");
        assert_ne!(resubscribed.id, subscription.id);

        // teardown
        manager.transport_mut().calls.clear();
        manager.teardown();
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert_eq!(take(&events), vec![Event::Status(ConnectionStatus::Disconnected)]);
        assert_eq!(
            manager.transport().calls,
            vec![Call::Unsubscribe(resubscribed.id.clone()), Call::Close]
        );
        assert!(manager.subscription().is_none());

        // stray traffic after teardown
        manager.handle_message(Some(&resubscribed.id), INBOUND);
        manager.handle_connected();
        manager.handle_closed();
        manager.send(OutgoingChatMessage::text(42, 7, "A", "late"));
        assert!(take(&events).is_empty());
        assert_eq!(manager.transport().calls.len(), 2);
    }

    #[test]
    fn test_send_is_noop_unless_connected() {
        let (mut manager, events) = recording_manager(1);

        manager.send(OutgoingChatMessage::text(1, 1, "n", "before connect"));

        connect(&mut manager);
        drop_socket(&mut manager);
        manager.send(OutgoingChatMessage::text(1, 1, "n", "while reconnecting"));

        manager.teardown();
        manager.send(OutgoingChatMessage::text(1, 1, "n", "after teardown"));

        let publishes = manager
            .transport()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Publish(..)))
            .count();
        assert_eq!(publishes, 0);
        assert!(!take(&events).iter().any(|e| matches!(e, Event::Message(_))));
    }

    #[test]
    fn test_reconnected_fires_only_after_a_drop() {
        let (mut manager, events) = recording_manager(3);

        connect(&mut manager);
        assert!(!take(&events).contains(&Event::Reconnected));

        // several failed retries still yield a single reconnected event
        drop_socket(&mut manager);
        drop_socket(&mut manager);
        drop_socket(&mut manager);
        connect(&mut manager);

        let recorded = take(&events);
        assert_eq!(
            recorded.iter().filter(|e| **e == Event::Reconnected).count(),
            1
        );
        assert_eq!(
            statuses(&recorded),
            vec![
                ConnectionStatus::Reconnecting,
                ConnectionStatus::Reconnecting,
                ConnectionStatus::Reconnecting,
                ConnectionStatus::Connected,
            ]
        );

        // flag is cleared once reported
        drop_socket(&mut manager);
        connect(&mut manager);
        connect(&mut manager);
        let recorded = take(&events);
        assert_eq!(
            recorded.iter().filter(|e| **e == Event::Reconnected).count(),
            1
        );
    }

    #[test]
    fn test_reconnected_fires_before_subscribing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let on_reconnected = Arc::clone(&events);

        struct Probe {
            connected: bool,
            log: Arc<Mutex<Vec<&'static str>>>,
        }
        impl BusTransport for Probe {
            fn subscribe(&mut self, _: &Subscription) {
                self.log.lock().unwrap().push("subscribe");
            }
            fn unsubscribe(&mut self, _: &Subscription) {}
            fn publish(&mut self, _: &str, _: String) {}
            fn close(&mut self) {}
            fn is_connected(&self) -> bool {
                self.connected
            }
        }

        let callbacks = ChatCallbacks::new(|_| {})
            .on_reconnected(move || on_reconnected.lock().unwrap().push("reconnected"));
        let probe = Probe {
            connected: true,
            log: Arc::clone(&events),
        };
        let mut manager = ConnectionManager::new(5, probe, callbacks);

        manager.handle_connected();
        manager.transport_mut().connected = false;
        manager.handle_closed();
        manager.transport_mut().connected = true;
        manager.handle_connected();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["subscribe", "reconnected", "subscribe"]
        );
    }

    #[test]
    fn test_close_while_transport_connected_is_not_forced() {
        let (mut manager, events) = recording_manager(8);

        connect(&mut manager);
        take(&events);

        // transport still reports a live session at close time
        manager.handle_closed();
        assert_eq!(take(&events), vec![Event::Status(ConnectionStatus::Reconnecting)]);
        assert_eq!(manager.status(), ConnectionStatus::Reconnecting);
    }

    #[test]
    fn test_single_live_subscription() {
        let (mut manager, _events) = recording_manager(9);

        connect(&mut manager);
        let first = manager.subscription().cloned().unwrap();

        // a repeated handshake replaces rather than stacks the subscription
        manager.handle_connected();
        let second = manager.subscription().cloned().unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(
            manager.transport().calls,
            vec![
                Call::Subscribe(first.clone()),
                Call::Unsubscribe(first.id.clone()),
                Call::Subscribe(second),
            ]
        );
    }

    #[test]
    fn test_malformed_and_foreign_frames_are_dropped() {
        let (mut manager, events) = recording_manager(42);

        // nothing subscribed yet
        manager.handle_message(None, INBOUND);

        connect(&mut manager);
        take(&events);
        let id = manager.subscription().unwrap().id.clone();

        manager.handle_message(Some(&id), "not json");
        manager.handle_message(Some(&id), r#"{"chatRoomId":42}"#);
        manager.handle_message(Some("sub-999"), INBOUND);
        assert!(take(&events).is_empty());

        // the connection keeps working afterwards
        manager.handle_message(Some(&id), INBOUND);
        manager.handle_message(None, INBOUND);
        assert_eq!(take(&events).len(), 2);
        assert_eq!(manager.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_messages_keep_transport_order() {
        let (mut manager, events) = recording_manager(42);
        connect(&mut manager);
        take(&events);
        let id = manager.subscription().unwrap().id.clone();

        for (i, text) in ["one", "two", "one"].iter().enumerate() {
            let body = serde_json::json!({
                "chatRoomId": 42,
                "senderId": i,
                "senderNickname": "A",
                "message": text,
                "type": "TEXT",
                "sentAt": "2024-01-01T00:00:00Z"
            });
            manager.handle_message(Some(&id), &body.to_string());
        }

        let texts: Vec<_> = take(&events)
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m.message),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["one", "two", "one"]);
    }

    #[test]
    fn test_live_broadcast_without_timestamp_is_delivered() {
        let (mut manager, events) = recording_manager(42);
        connect(&mut manager);
        take(&events);
        let id = manager.subscription().unwrap().id.clone();

        manager.handle_message(
            Some(&id),
            r#"{"chatRoomId":42,"senderId":7,"senderNickname":"A","message":"hi","type":"TEXT","imageUrl":null,"sentAt":null}"#,
        );

        match take(&events).as_slice() {
            [Event::Message(message)] => {
                assert_eq!(message.message, "hi");
                assert_eq!(message.sent_at, None);
            }
            other => panic!("expected one message, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_do_not_change_status() {
        let (mut manager, events) = recording_manager(2);
        connect(&mut manager);
        take(&events);

        manager.handle_error("Failed to send message to ExecutorSubscribableChannel");
        assert_eq!(manager.status(), ConnectionStatus::Connected);
        assert!(take(&events).is_empty());
    }

    #[test]
    fn test_teardown_is_idempotent_and_safe_before_connect() {
        let (mut manager, events) = recording_manager(4);

        manager.teardown();
        manager.teardown();

        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert_eq!(take(&events), vec![Event::Status(ConnectionStatus::Disconnected)]);
        assert_eq!(manager.transport().calls, vec![Call::Close]);
        assert!(manager.is_torn_down());

        // no resurrection without a fresh manager
        connect(&mut manager);
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(take(&events).is_empty());
    }

    #[test]
    fn test_status_watch_tracks_transitions() {
        let (tx, rx) = watch::channel(ConnectionStatus::Reconnecting);
        let (manager, _events) = recording_manager(6);
        let mut manager = manager.with_status_watch(tx);
        assert_eq!(*rx.borrow(), ConnectionStatus::Disconnected);

        connect(&mut manager);
        assert_eq!(*rx.borrow(), ConnectionStatus::Connected);

        drop_socket(&mut manager);
        assert_eq!(*rx.borrow(), ConnectionStatus::Reconnecting);

        manager.teardown();
        assert_eq!(*rx.borrow(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_custom_destinations() {
        let (manager, _events) = recording_manager(77);
        let mut manager = manager.with_destinations("/topic/rooms/", "/pub/chat/pub");

        connect(&mut manager);
        assert_eq!(manager.subscription().unwrap().destination, "/topic/rooms/77");

        manager.send(OutgoingChatMessage::text(77, 1, "n", "x"));
        assert!(matches!(
            manager.transport().calls.last(),
            Some(Call::Publish(dest, _)) if dest == "/pub/chat/pub"
        ));
    }
}
