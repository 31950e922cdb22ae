//! WebSocket transport speaking the relay protocol.

use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use tungstenite::{Message, connect};
use url::Url;

use super::protocol::{ClientMessage, ServerMessage};
use super::{ChannelEvent, Transport, TransportError, TransportResult};
use crate::presence::{PresenceMeta, PresenceState};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Longest prefix of an outgoing message written to the debug log, in characters.
const LOG_PREVIEW_CHARS: usize = 100;

/// At most `max` characters of `msg`, cut on a character boundary.
fn log_preview(msg: &str, max: usize) -> &str {
    msg.char_indices().nth(max).map_or(msg, |(i, _)| &msg[..i])
}

/// Commands sent to the socket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// What the socket thread reports back.
enum WsEvent {
    Connected,
    Disconnected,
    Message(ServerMessage),
    Error(String),
}

/// Native WebSocket client for the relay server.
///
/// The socket lives on a background thread; outgoing messages are queued on
/// a channel and incoming ones are drained by [`Transport::poll`]. Messages
/// sent before the connection is up are delivered once it is.
pub struct WsTransport {
    state: ConnectionState,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<WsEvent>>,
    _thread: Option<JoinHandle<()>>,
    board: Option<String>,
    client_id: Option<String>,
    subscriptions: HashSet<String>,
    presence: PresenceState,
    closed: bool,
}

impl WsTransport {
    /// Start connecting to a relay at `url` (`ws://` or `wss://`).
    pub fn connect(url: &str) -> TransportResult<Self> {
        let parsed = Url::parse(url).map_err(|e| TransportError::Connect(format!("Invalid URL: {e}")))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(TransportError::Connect(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<WsEvent>();
        let url = url.to_string();
        let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

        Ok(Self {
            state: ConnectionState::Connecting,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            _thread: Some(handle),
            board: None,
            client_id: None,
            subscriptions: HashSet::new(),
            presence: PresenceState::new(),
            closed: false,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Id the relay assigned to this connection, once joined.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    fn send_message(&self, msg: &ClientMessage) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let json = serde_json::to_string(msg).map_err(|e| TransportError::Encode(e.to_string()))?;
        let tx = self.cmd_tx.as_ref().ok_or(TransportError::NotConnected)?;
        tx.send(WsCommand::Send(json))
            .map_err(|_| TransportError::Closed)
    }

    fn require_board(&self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.board.as_ref().map(|_| ()).ok_or(TransportError::NotConnected)
    }

    /// Fold a relay message into local state and turn it into a channel event.
    fn translate(&mut self, msg: ServerMessage) -> Option<ChannelEvent> {
        match msg {
            ServerMessage::Joined {
                board,
                client_id,
                presence,
            } => {
                log::info!("Joined board {board} as {client_id}");
                self.client_id = Some(client_id);
                self.presence = presence;
                Some(ChannelEvent::PresenceSync)
            }
            ServerMessage::Broadcast { from, event, payload } => {
                if !self.subscriptions.contains(&event) {
                    return None;
                }
                log::debug!("Broadcast {event} from {from}");
                Some(ChannelEvent::Broadcast { event, payload })
            }
            ServerMessage::PresenceJoin { key, metas } => {
                self.presence.insert(key.clone(), metas.clone());
                Some(ChannelEvent::PresenceJoin { key, metas })
            }
            ServerMessage::PresenceLeave { key, metas } => {
                self.presence.remove(&key);
                Some(ChannelEvent::PresenceLeave { key, metas })
            }
            ServerMessage::PresenceState { state } => {
                self.presence = state;
                Some(ChannelEvent::PresenceSync)
            }
            ServerMessage::Error { message } => Some(ChannelEvent::Error { message }),
        }
    }
}

impl Transport for WsTransport {
    fn join(&mut self, topic: &str) -> TransportResult<()> {
        if self.board.is_some() {
            self.leave()?;
        }
        self.send_message(&ClientMessage::Join {
            board: topic.to_string(),
        })?;
        self.board = Some(topic.to_string());
        Ok(())
    }

    fn leave(&mut self) -> TransportResult<()> {
        if self.board.take().is_none() {
            return Ok(());
        }
        self.subscriptions.clear();
        self.presence.clear();
        self.send_message(&ClientMessage::Leave)
    }

    fn subscribe(&mut self, event: &str) {
        self.subscriptions.insert(event.to_string());
    }

    fn unsubscribe_all(&mut self) {
        self.subscriptions.clear();
    }

    fn send(&mut self, event: &str, payload: Value) -> TransportResult<()> {
        self.require_board()?;
        self.send_message(&ClientMessage::Broadcast {
            event: event.to_string(),
            payload,
        })
    }

    fn track(&mut self, meta: PresenceMeta) -> TransportResult<()> {
        self.require_board()?;
        self.send_message(&ClientMessage::Track { meta })
    }

    fn untrack(&mut self) -> TransportResult<()> {
        self.require_board()?;
        self.send_message(&ClientMessage::Untrack)
    }

    fn presence_state(&self) -> PresenceState {
        self.presence.clone()
    }

    fn poll(&mut self) -> Vec<ChannelEvent> {
        let mut raw = Vec::new();
        if let Some(rx) = &self.event_rx {
            while let Ok(event) = rx.try_recv() {
                raw.push(event);
            }
        }

        let mut events = Vec::new();
        for event in raw {
            match event {
                WsEvent::Connected => {
                    self.state = ConnectionState::Connected;
                    events.push(ChannelEvent::Connected);
                }
                WsEvent::Disconnected => {
                    self.state = ConnectionState::Disconnected;
                    events.push(ChannelEvent::Disconnected);
                }
                WsEvent::Error(message) => {
                    self.state = ConnectionState::Error;
                    events.push(ChannelEvent::Error { message });
                }
                WsEvent::Message(msg) => events.extend(self.translate(msg)),
            }
        }
        events
    }

    fn close(&mut self) {
        if let Err(e) = self.leave() {
            log::debug!("Leave on close failed: {e}");
        }
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
        self.closed = true;
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

/// Socket thread body: connect, then alternate between draining commands
/// and reading with a short timeout until either side closes.
fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<WsEvent>) {
    log::info!("WebSocket thread: connecting to {url}");
    let (mut socket, response) = match connect(url) {
        Ok(ok) => ok,
        Err(e) => {
            log::error!("WebSocket connection failed: {e}");
            let _ = event_tx.send(WsEvent::Error(format!("Connection failed: {e}")));
            return;
        }
    };
    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(WsEvent::Connected);

    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("Non-plain stream, relying on default timeouts"),
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", log_preview(&msg, LOG_PREVIEW_CHARS));
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {e}");
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(msg) => {
                    let _ = event_tx.send(WsEvent::Message(msg));
                }
                Err(e) => log::warn!("Failed to parse relay message: {e}"),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {e}");
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(WsEvent::Disconnected);
}
