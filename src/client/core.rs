use super::{
    ChatCallbacks, ChatClientBuilder, ChatClientOptions, ChatConnection, ConnectionManager,
    ConnectionStatus,
};
use crate::infrastructure::Timer;
use crate::stomp::{HeartBeat, StompCommand, StompFrame};
use crate::types::constants::stomp_headers;
use crate::types::{ChatError, OutgoingChatMessage, Result};
use crate::websocket::{StompTransport, WebSocketFactory, WsStream};
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Entry point for opening room connections against one broker endpoint.
///
/// The client itself holds no connection state; every [`open`](Self::open)
/// call produces an independent [`ChatConnection`] with its own socket, so
/// several rooms or views can be live at once.
///
/// # Example
///
/// ```no_run
/// use moneytalk_chat::{ChatCallbacks, ChatClient, ChatClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChatClient::new(
///     "ws://localhost:8080/ws-chat/websocket",
///     ChatClientOptions::default().with_session_token("jwt-from-login"),
/// )?;
///
/// let connection = client.open(
///     42,
///     ChatCallbacks::new(|message| println!("{}: {}", message.sender_nickname, message.message))
///         .on_status_change(|status| println!("status: {}", status)),
/// )?;
///
/// // ... later, when the view goes away
/// connection.teardown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatClient {
    pub(crate) endpoint: Url,
    pub(crate) options: Arc<ChatClientOptions>,
}

impl ChatClient {
    /// Creates a new ChatClient.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UrlParse`] if the endpoint cannot be parsed and
    /// [`ChatError::Connection`] if it is not a `ws`/`wss` URL or a
    /// configured destination is not absolute.
    pub fn new(endpoint: impl Into<String>, options: ChatClientOptions) -> Result<Self> {
        ChatClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn options(&self) -> &ChatClientOptions {
        &self.options
    }

    /// Opens a connection to `room_id` and starts connecting in the
    /// background.
    ///
    /// Connection failures are not returned here: they surface through
    /// `on_status_change(RECONNECTING)` and `on_forced_disconnect`, and the
    /// connection keeps retrying every `reconnect_delay` until torn down.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidRoom`] for room id 0 and
    /// [`ChatError::Connection`] when no runtime is available.
    pub fn open(&self, room_id: u64, callbacks: ChatCallbacks) -> Result<ChatConnection> {
        if room_id == 0 {
            return Err(ChatError::InvalidRoom(room_id));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ChatError::Connection(format!("no tokio runtime: {}", e)))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let manager = ConnectionManager::new(room_id, StompTransport::new(), callbacks)
            .with_destinations(
                self.options.subscribe_prefix.clone(),
                self.options.publish_destination.clone(),
            )
            .with_status_watch(status_tx);

        let driver = Driver {
            endpoint: self.endpoint.clone(),
            options: Arc::clone(&self.options),
            manager,
            commands: command_rx,
            timer: Timer::new(vec![self.options.reconnect_delay()]),
        };
        runtime.spawn(driver.run());

        Ok(ChatConnection::new(room_id, command_tx, status_rx))
    }
}

/// Requests from a [`ChatConnection`] handle to its driver task
pub(crate) enum Command {
    Send(OutgoingChatMessage),
    Teardown(oneshot::Sender<()>),
}

enum Control {
    Continue,
    Stop(Option<oneshot::Sender<()>>),
}

/// Owns the socket and the connection manager for one room. All callbacks
/// run on this task.
struct Driver {
    endpoint: Url,
    options: Arc<ChatClientOptions>,
    manager: ConnectionManager<StompTransport>,
    commands: mpsc::UnboundedReceiver<Command>,
    timer: Timer,
}

impl Driver {
    async fn run(mut self) {
        let room_id = self.manager.room_id();
        tracing::info!("Starting connection task for room {}", room_id);

        loop {
            if let Control::Stop(ack) = self.session().await {
                self.finish(ack);
                break;
            }

            self.manager.transport_mut().mark_disconnected();
            self.manager.handle_closed();

            if let Control::Stop(ack) = self.wait_before_retry().await {
                self.finish(ack);
                break;
            }
        }

        tracing::info!("Connection task for room {} finished", room_id);
    }

    /// One socket lifetime: handshake, then frames until the socket closes
    /// (`Continue`) or the view tears the connection down (`Stop`).
    async fn session(&mut self) -> Control {
        let establish = establish(self.endpoint.clone(), Arc::clone(&self.options));
        tokio::pin!(establish);

        let (mut sink, mut source, heart_beat) = loop {
            tokio::select! {
                result = &mut establish => match result {
                    Ok(parts) => break parts,
                    Err(e) => {
                        tracing::error!("Failed to connect to {}: {}", self.endpoint, e);
                        return Control::Continue;
                    }
                },
                command = self.commands.recv() => {
                    if let Control::Stop(ack) = self.handle_command(command) {
                        return Control::Stop(ack);
                    }
                }
            }
        };

        self.timer.reset();
        self.manager.transport_mut().mark_connected();
        self.manager.handle_connected();
        if let Err(e) = self.flush(&mut sink).await {
            tracing::error!("Failed to subscribe: {}", e);
            return Control::Continue;
        }

        let mut outgoing = heart_beat.outgoing_interval().map(|period| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let silence_limit = heart_beat.incoming_timeout();
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                incoming = source.next() => {
                    last_seen = Instant::now();
                    match incoming {
                        Some(Ok(Message::Text(text))) => self.on_text(text.as_str()),
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => self.on_text(text),
                            Err(_) => tracing::warn!(
                                "Received non UTF-8 binary message ({} bytes)",
                                data.len()
                            ),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            if let Some(close_frame) = frame {
                                tracing::warn!(
                                    "Broker closed connection: code={:?}, reason='{}'",
                                    close_frame.code,
                                    close_frame.reason.as_str()
                                );
                            } else {
                                tracing::warn!("Broker closed connection without close frame");
                            }
                            return Control::Continue;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            tracing::debug!("Received ping ({} bytes)", data.len());
                        }
                        Some(Ok(Message::Pong(data))) => {
                            tracing::debug!("Received pong ({} bytes)", data.len());
                        }
                        Some(Ok(Message::Frame(_))) => {
                            tracing::debug!("Received raw frame (internal)");
                        }
                        Some(Err(e)) => {
                            tracing::error!("WebSocket read error: {}", e);
                            return Control::Continue;
                        }
                        None => {
                            tracing::warn!("WebSocket stream ended");
                            return Control::Continue;
                        }
                    }
                }
                command = self.commands.recv() => {
                    if let Control::Stop(ack) = self.handle_command(command) {
                        self.manager.teardown();
                        if let Err(e) = self.flush(&mut sink).await {
                            tracing::debug!("Socket already gone during teardown: {}", e);
                        }
                        return Control::Stop(ack);
                    }
                }
                _ = next_tick(&mut outgoing) => {
                    tracing::debug!("Sending heart-beat");
                    if let Err(e) = sink.send(Message::Text("\n".to_string().into())).await {
                        tracing::error!("Failed to send heart-beat: {}", e);
                        return Control::Continue;
                    }
                }
                _ = silence(silence_limit, last_seen) => {
                    tracing::warn!(
                        "No data from broker for {:?}, closing socket",
                        silence_limit.unwrap_or_default()
                    );
                    let _ = sink.close().await;
                    return Control::Continue;
                }
            }

            if let Err(e) = self.flush(&mut sink).await {
                tracing::error!("Failed to write to broker: {}", e);
                return Control::Continue;
            }
        }
    }

    /// Sleeps out the reconnect delay while still serving the handle
    async fn wait_before_retry(&mut self) -> Control {
        let delay = self.timer.next_delay();
        tracing::info!(
            "Reconnecting to room {} in {:?}",
            self.manager.room_id(),
            delay
        );

        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = time::sleep_until(deadline) => return Control::Continue,
                command = self.commands.recv() => {
                    if let Control::Stop(ack) = self.handle_command(command) {
                        return Control::Stop(ack);
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: Option<Command>) -> Control {
        match command {
            Some(Command::Send(message)) => {
                self.manager.send(message);
                Control::Continue
            }
            Some(Command::Teardown(ack)) => Control::Stop(Some(ack)),
            // every handle was dropped
            None => Control::Stop(None),
        }
    }

    fn finish(&mut self, ack: Option<oneshot::Sender<()>>) {
        self.manager.teardown();
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn on_text(&mut self, text: &str) {
        match StompFrame::decode_all(text) {
            Ok(frames) if frames.is_empty() => tracing::debug!("Received heart-beat"),
            Ok(frames) => {
                for frame in frames {
                    self.route(frame);
                }
            }
            Err(e) => tracing::warn!("Dropping undecodable frame: {} - Raw: {:?}", e, text),
        }
    }

    fn route(&mut self, frame: StompFrame) {
        match frame.command {
            StompCommand::Message => self
                .manager
                .handle_message(frame.header(stomp_headers::SUBSCRIPTION), &frame.body),
            StompCommand::Error => {
                let message = frame
                    .header(stomp_headers::MESSAGE)
                    .unwrap_or(frame.body.as_str());
                self.manager.handle_error(message);
            }
            StompCommand::Receipt => tracing::debug!(
                "Received receipt {}",
                frame.header(stomp_headers::RECEIPT_ID).unwrap_or("-")
            ),
            other => tracing::debug!("Ignoring unexpected {} frame", other),
        }
    }

    /// Writes whatever the connection manager queued
    async fn flush(&mut self, sink: &mut WsSink) -> Result<()> {
        while let Some(frame) = self.manager.transport_mut().next_frame() {
            tracing::debug!("Sending {} frame", frame.command);
            sink.send(Message::Text(frame.encode().into())).await?;
        }
        if self.manager.transport_mut().take_close_request() {
            sink.close().await?;
        }
        Ok(())
    }
}

async fn establish(
    endpoint: Url,
    options: Arc<ChatClientOptions>,
) -> Result<(WsSink, WsSource, HeartBeat)> {
    let handshake = handshake(&endpoint, &options);
    match options.connect_timeout() {
        Some(limit) => time::timeout(limit, handshake)
            .await
            .map_err(|_| ChatError::Timeout)?,
        None => handshake.await,
    }
}

/// Opens the socket and runs the STOMP CONNECT exchange
async fn handshake(
    endpoint: &Url,
    options: &ChatClientOptions,
) -> Result<(WsSink, WsSource, HeartBeat)> {
    tracing::info!("Connecting to {}", endpoint);

    let stream = WebSocketFactory::create(endpoint.as_str(), options).await?;
    let (mut sink, mut source) = stream.split();

    let offered = options.heartbeat();
    let connect = StompFrame::connect(endpoint.host_str(), offered);
    sink.send(Message::Text(connect.encode().into())).await?;

    while let Some(incoming) = source.next().await {
        let decoded = match incoming? {
            Message::Text(text) => StompFrame::decode(text.as_str())?,
            Message::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| ChatError::Protocol(format!("binary frame is not UTF-8: {}", e)))?;
                StompFrame::decode(text)?
            }
            Message::Close(_) => return Err(ChatError::Closed),
            _ => continue,
        };
        let Some(frame) = decoded else {
            continue;
        };

        match frame.command {
            StompCommand::Connected => {
                let server = frame
                    .header(stomp_headers::HEART_BEAT)
                    .map(HeartBeat::parse)
                    .transpose()?
                    .unwrap_or_default();
                let agreed = HeartBeat::negotiate(offered, server);
                tracing::info!(
                    "STOMP session established (version {}, heart-beat {}/{} ms)",
                    frame.header(stomp_headers::VERSION).unwrap_or("1.0"),
                    agreed.outgoing,
                    agreed.incoming
                );
                return Ok((sink, source, agreed));
            }
            StompCommand::Error => {
                return Err(ChatError::Connection(format!(
                    "broker rejected CONNECT: {}",
                    frame
                        .header(stomp_headers::MESSAGE)
                        .unwrap_or(frame.body.as_str())
                )));
            }
            other => tracing::debug!("Ignoring {} frame before CONNECTED", other),
        }
    }

    Err(ChatError::Closed)
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn silence(limit: Option<Duration>, last_seen: Instant) {
    match limit {
        Some(limit) => time::sleep_until(last_seen + limit).await,
        None => std::future::pending().await,
    }
}
