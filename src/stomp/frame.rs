use crate::types::constants::{ACCEPT_VERSIONS, JSON_CONTENT_TYPE, stomp_headers};
use crate::types::{ChatError, Result};

use super::HeartBeat;

/// Type-safe STOMP commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StompCommand {
    // Client frames
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,

    // Server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    /// Parse a command line into a StompCommand
    pub fn parse(s: &str) -> Option<Self> {
        let command = match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "CONNECTED" => Self::Connected,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(command)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED carry their headers unescaped (STOMP 1.2 §Value Encoding)
    fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl std::fmt::Display for StompCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
///
/// Headers keep their wire order; on lookup the first occurrence wins, as
/// STOMP 1.2 requires for repeated headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: Option<&str>, heart_beat: HeartBeat) -> Self {
        let mut frame = Self::new(StompCommand::Connect)
            .with_header(stomp_headers::ACCEPT_VERSION, ACCEPT_VERSIONS)
            .with_header(stomp_headers::HEART_BEAT, heart_beat.to_header());
        if let Some(host) = host {
            frame = frame.with_header(stomp_headers::HOST, host);
        }
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .with_header(stomp_headers::ID, id)
            .with_header(stomp_headers::DESTINATION, destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(StompCommand::Unsubscribe).with_header(stomp_headers::ID, id)
    }

    /// SEND with a JSON body and an explicit content-length
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(StompCommand::Send)
            .with_header(stomp_headers::DESTINATION, destination)
            .with_header(stomp_headers::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .with_header(stomp_headers::CONTENT_LENGTH, body.len().to_string())
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(StompCommand::Disconnect)
    }

    /// Encodes the frame, NUL terminator included.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');

        let escape_headers = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape_headers {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decodes the first frame of a WebSocket text message.
    ///
    /// Returns `Ok(None)` when the message only holds heart-beat EOLs.
    /// Further frames batched into the same message are not returned; use
    /// [`decode_all`](Self::decode_all) to keep them.
    pub fn decode(raw: &str) -> Result<Option<Self>> {
        let Some((frame, rest)) = Self::decode_next(raw)? else {
            return Ok(None);
        };
        if !rest.trim_matches(['\r', '\n']).is_empty() {
            tracing::warn!(
                "Ignoring {} bytes after the {} frame",
                rest.len(),
                frame.command
            );
        }
        Ok(Some(frame))
    }

    /// Decodes every frame of a WebSocket text message, in order.
    ///
    /// Heart-beat EOLs between frames are skipped; an empty result means the
    /// message was a heart-beat.
    pub fn decode_all(raw: &str) -> Result<Vec<Self>> {
        let mut frames = Vec::new();
        let mut rest = raw;
        while let Some((frame, next)) = Self::decode_next(rest)? {
            frames.push(frame);
            rest = next;
        }
        Ok(frames)
    }

    /// One frame plus whatever follows its NUL terminator
    fn decode_next(raw: &str) -> Result<Option<(Self, &str)>> {
        let trimmed = raw.trim_start_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (command_line, mut cursor) = next_line(trimmed)
            .ok_or_else(|| ChatError::Protocol("frame has no command line".to_string()))?;
        let command = StompCommand::parse(command_line)
            .ok_or_else(|| ChatError::Protocol(format!("unknown command '{}'", command_line)))?;

        let mut headers = Vec::new();
        loop {
            let (line, rest) = next_line(cursor)
                .ok_or_else(|| ChatError::Protocol("unterminated header block".to_string()))?;
            cursor = rest;
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ChatError::Protocol(format!("malformed header '{}'", line)))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == stomp_headers::CONTENT_LENGTH)
            .map(|(_, value)| {
                value.trim().parse::<usize>().map_err(|_| {
                    ChatError::Protocol(format!("invalid content-length '{}'", value))
                })
            })
            .transpose()?;

        let end = match content_length {
            Some(len) => {
                let bytes = cursor.as_bytes();
                if bytes.len() <= len || bytes[len] != 0 {
                    return Err(ChatError::Protocol(format!(
                        "body shorter than content-length {}",
                        len
                    )));
                }
                std::str::from_utf8(&bytes[..len])
                    .map_err(|e| ChatError::Protocol(format!("body is not UTF-8: {}", e)))?;
                len
            }
            None => cursor
                .find('\0')
                .ok_or_else(|| ChatError::Protocol("missing NUL terminator".to_string()))?,
        };

        let frame = Self {
            command,
            headers,
            body: cursor[..end].to_string(),
        };
        Ok(Some((frame, &cursor[end + 1..])))
    }
}

fn next_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    let line = &s[..idx];
    Some((line.strip_suffix('\r').unwrap_or(line), &s[idx + 1..]))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(ChatError::Protocol(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}
