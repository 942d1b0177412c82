//! STOMP 1.2 frame parsing and building.
//!
//! Wire form: `COMMAND\n (header-key:header-value\n)* \n body \0`.
//!
//! The parser takes ownership of the raw buffer in a single move; header
//! values and the body are exposed as borrows into that buffer via stored
//! byte ranges. Cloning a frame clones the buffer — the ranges are
//! buffer-relative, so the clone observes identical headers and body.

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// STOMP 1.2 commands, spelled exactly as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Stomp,
    Connect,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Disconnect,
    Message,
    Receipt,
    Error,
    Begin,
    Commit,
    Abort,
}

impl Command {
    /// The exact wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stomp => "STOMP",
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
        }
    }

    /// Parse a wire spelling. Case-sensitive.
    #[must_use]
    pub fn from_wire(text: &str) -> Option<Self> {
        Some(match text {
            "STOMP" => Self::Stomp,
            "CONNECT" => Self::Connect,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            _ => return None,
        })
    }

    /// Whether this command may carry a body.
    #[must_use]
    pub fn allows_body(self) -> bool {
        matches!(self, Self::Send | Self::Message | Self::Error)
    }

    /// Headers that must be present for a frame with this command to be
    /// well formed.
    #[must_use]
    pub fn required_headers(self) -> &'static [Header] {
        match self {
            Self::Stomp | Self::Connect => &[Header::AcceptVersion, Header::Host],
            Self::Connected => &[Header::Version],
            Self::Send => &[Header::Destination],
            Self::Subscribe => &[Header::Destination, Header::Id],
            Self::Unsubscribe | Self::Ack | Self::Nack => &[Header::Id],
            Self::Message => &[Header::Destination, Header::MessageId, Header::Subscription],
            Self::Receipt => &[Header::ReceiptId],
            Self::Begin | Self::Commit | Self::Abort => &[Header::Transaction],
            Self::Disconnect | Self::Error => &[],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The known STOMP 1.2 header keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Header {
    AcceptVersion,
    Host,
    Login,
    Passcode,
    HeartBeat,
    Version,
    Session,
    Server,
    Destination,
    Id,
    Ack,
    Subscription,
    MessageId,
    Receipt,
    ReceiptId,
    ContentLength,
    ContentType,
    Message,
    Transaction,
}

impl Header {
    /// The exact wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcceptVersion => "accept-version",
            Self::Host => "host",
            Self::Login => "login",
            Self::Passcode => "passcode",
            Self::HeartBeat => "heart-beat",
            Self::Version => "version",
            Self::Session => "session",
            Self::Server => "server",
            Self::Destination => "destination",
            Self::Id => "id",
            Self::Ack => "ack",
            Self::Subscription => "subscription",
            Self::MessageId => "message-id",
            Self::Receipt => "receipt",
            Self::ReceiptId => "receipt-id",
            Self::ContentLength => "content-length",
            Self::ContentType => "content-type",
            Self::Message => "message",
            Self::Transaction => "transaction",
        }
    }

    /// Parse a wire spelling. Case-sensitive.
    #[must_use]
    pub fn from_wire(text: &str) -> Option<Self> {
        Some(match text {
            "accept-version" => Self::AcceptVersion,
            "host" => Self::Host,
            "login" => Self::Login,
            "passcode" => Self::Passcode,
            "heart-beat" => Self::HeartBeat,
            "version" => Self::Version,
            "session" => Self::Session,
            "server" => Self::Server,
            "destination" => Self::Destination,
            "id" => Self::Id,
            "ack" => Self::Ack,
            "subscription" => Self::Subscription,
            "message-id" => Self::MessageId,
            "receipt" => Self::Receipt,
            "receipt-id" => Self::ReceiptId,
            "content-length" => Self::ContentLength,
            "content-type" => Self::ContentType,
            "message" => Self::Message,
            "transaction" => Self::Transaction,
            _ => return None,
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame parse and build failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame has no command line.
    #[error("frame has no command")]
    NoCommand,
    /// The command is not a STOMP 1.2 command.
    #[error("unknown command")]
    UnknownCommand,
    /// The blank line separating headers from the body is missing.
    #[error("missing blank line after headers")]
    MissingBlankLine,
    /// The frame ends before the body terminator.
    #[error("missing body terminator")]
    MissingBody,
    /// A header line has an empty key.
    #[error("empty header key")]
    EmptyHeaderKey,
    /// A header key is not in the STOMP 1.2 vocabulary.
    #[error("unrecognized header")]
    UnrecognizedHeader,
    /// A header required by the command is absent.
    #[error("missing required header: {0}")]
    MissingRequiredHeader(Header),
    /// A body is present on a command that must not carry one, or content
    /// follows the frame terminator.
    #[error("unexpected body")]
    UnexpectedBody,
    /// The `content-length` value is not a valid length for this frame.
    #[error("bad content-length")]
    BadContentLength,
}

/// A parsed STOMP 1.2 frame.
///
/// Owns the raw wire text; [`header`](Frame::header) and
/// [`body`](Frame::body) return slices into it. Duplicate headers on the
/// wire resolve to the first occurrence.
#[derive(Clone, Debug)]
pub struct Frame {
    data: String,
    command: Command,
    headers: Vec<(Header, Range<usize>)>,
    body: Range<usize>,
}

impl Frame {
    /// Parse a frame from its full wire text, including the terminating
    /// `NUL`. Ownership of the buffer moves into the frame.
    pub fn parse(data: String) -> Result<Self, FrameError> {
        let bytes = data.as_bytes();

        // Command line.
        let command_end = find_byte(bytes, 0, b'\n').ok_or(FrameError::NoCommand)?;
        let command_text = strip_cr(&data[..command_end]);
        if command_text.is_empty() {
            return Err(FrameError::NoCommand);
        }
        let command = Command::from_wire(command_text).ok_or(FrameError::UnknownCommand)?;

        // Header lines, up to the blank line.
        let mut headers: Vec<(Header, Range<usize>)> = Vec::new();
        let mut cursor = command_end + 1;
        loop {
            let line_end = find_byte(bytes, cursor, b'\n').ok_or(FrameError::MissingBlankLine)?;
            let line = strip_cr(&data[cursor..line_end]);
            if line.is_empty() {
                cursor = line_end + 1;
                break;
            }
            let colon = line.find(':').ok_or(FrameError::UnrecognizedHeader)?;
            let key = &line[..colon];
            if key.is_empty() {
                return Err(FrameError::EmptyHeaderKey);
            }
            let header = Header::from_wire(key).ok_or(FrameError::UnrecognizedHeader)?;
            // First occurrence wins.
            if !headers.iter().any(|(h, _)| *h == header) {
                let value_start = cursor + colon + 1;
                let value_end = cursor + line.len();
                headers.push((header, value_start..value_end));
            }
            cursor = line_end + 1;
        }

        // Body framing: exact content-length when declared, first NUL
        // otherwise.
        let body_start = cursor;
        let declared_len = headers
            .iter()
            .find(|(h, _)| *h == Header::ContentLength)
            .map(|(_, range)| {
                data[range.clone()]
                    .parse::<usize>()
                    .map_err(|_| FrameError::BadContentLength)
            })
            .transpose()?;
        let (body, frame_end) = match declared_len {
            Some(len) => {
                let body_end = body_start
                    .checked_add(len)
                    .ok_or(FrameError::BadContentLength)?;
                if body_end >= data.len() {
                    return Err(FrameError::MissingBody);
                }
                if bytes[body_end] != 0 {
                    return Err(FrameError::BadContentLength);
                }
                // The declared length must land on a char boundary.
                if data.get(body_start..body_end).is_none() {
                    return Err(FrameError::BadContentLength);
                }
                (body_start..body_end, body_end + 1)
            }
            None => {
                let nul = find_byte(bytes, body_start, 0).ok_or(FrameError::MissingBody)?;
                (body_start..nul, nul + 1)
            }
        };

        // Only EOL padding may follow the terminator.
        if bytes[frame_end..].iter().any(|&b| b != b'\n' && b != b'\r') {
            return Err(FrameError::UnexpectedBody);
        }

        if !body.is_empty() && !command.allows_body() {
            return Err(FrameError::UnexpectedBody);
        }

        for required in command.required_headers() {
            if !headers.iter().any(|(h, _)| h == required) {
                return Err(FrameError::MissingRequiredHeader(*required));
            }
        }

        Ok(Self {
            data,
            command,
            headers,
            body,
        })
    }

    /// The frame command.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command
    }

    /// The value of a header, borrowed from the backing buffer.
    #[must_use]
    pub fn header(&self, header: Header) -> Option<&str> {
        self.headers
            .iter()
            .find(|(h, _)| *h == header)
            .map(|(_, range)| &self.data[range.clone()])
    }

    /// All headers in wire order (duplicates already collapsed).
    pub fn headers(&self) -> impl Iterator<Item = (Header, &str)> {
        self.headers
            .iter()
            .map(|(h, range)| (*h, &self.data[range.clone()]))
    }

    /// The frame body, borrowed from the backing buffer. Empty when the
    /// frame carries no body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.data[self.body.clone()]
    }

    /// Whether the frame carries a non-empty body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// The full wire text backing this frame.
    #[must_use]
    pub fn as_wire(&self) -> &str {
        &self.data
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Builds a STOMP 1.2 frame in wire form.
///
/// Validates the same rules as the parser. `content-length` is computed
/// from the body; a caller-supplied `content-length` header is ignored.
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    command: Command,
    headers: Vec<(Header, String)>,
    body: String,
}

impl FrameBuilder {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header. The first occurrence of a key wins; later
    /// occurrences and `content-length` are dropped at build time.
    #[must_use]
    pub fn header(mut self, header: Header, value: impl Into<String>) -> Self {
        self.headers.push((header, value.into()));
        self
    }

    /// Set the frame body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Validate and emit the wire form.
    pub fn build(self) -> Result<String, FrameError> {
        if !self.body.is_empty() && !self.command.allows_body() {
            return Err(FrameError::UnexpectedBody);
        }

        let mut headers: Vec<(Header, String)> = Vec::with_capacity(self.headers.len());
        for (header, value) in self.headers {
            if header == Header::ContentLength {
                continue;
            }
            if !headers.iter().any(|(h, _)| *h == header) {
                headers.push((header, value));
            }
        }

        for required in self.command.required_headers() {
            if !headers.iter().any(|(h, _)| h == required) {
                return Err(FrameError::MissingRequiredHeader(*required));
            }
        }

        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (header, value) in &headers {
            out.push_str(header.as_str());
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        Ok(out)
    }

    /// Build and re-parse, yielding the frame object.
    pub fn into_frame(self) -> Result<Frame, FrameError> {
        Frame::parse(self.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_connect_frame() {
        // The canonical handshake frame.
        let wire = "CONNECT\naccept-version:1.2\nhost:example\n\n\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.command(), Command::Connect);
        assert_eq!(frame.header(Header::AcceptVersion), Some("1.2"));
        assert_eq!(frame.header(Header::Host), Some("example"));
        assert_eq!(frame.headers().count(), 2);
        assert!(!frame.has_body());
        assert_eq!(frame.as_wire(), wire);
    }

    #[test]
    fn connect_roundtrips_through_builder() {
        let wire = "CONNECT\naccept-version:1.2\nhost:example\n\n\0";
        let rebuilt = FrameBuilder::new(Command::Connect)
            .header(Header::AcceptVersion, "1.2")
            .header(Header::Host, "example")
            .build()
            .unwrap();
        assert_eq!(rebuilt, wire);
    }

    #[test]
    fn parse_send_with_body() {
        let wire = "SEND\ndestination:/queue/a\ncontent-length:5\n\nhello\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.command(), Command::Send);
        assert_eq!(frame.body(), "hello");
    }

    #[test]
    fn content_length_body_may_embed_nul() {
        let wire = "SEND\ndestination:/queue/a\ncontent-length:5\n\nab\0cd\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.body(), "ab\0cd");
    }

    #[test]
    fn body_without_content_length_ends_at_first_nul() {
        let wire = "SEND\ndestination:/queue/a\n\nhello\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.body(), "hello");
    }

    #[test]
    fn empty_input_is_no_command() {
        assert_eq!(
            Frame::parse(String::new()).unwrap_err(),
            FrameError::NoCommand
        );
        assert_eq!(
            Frame::parse("\n\n\0".to_string()).unwrap_err(),
            FrameError::NoCommand
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            Frame::parse("CONECT\nhost:example\n\n\0".to_string()).unwrap_err(),
            FrameError::UnknownCommand
        );
    }

    #[test]
    fn missing_blank_line_is_rejected() {
        assert_eq!(
            Frame::parse("CONNECT\naccept-version:1.2".to_string()).unwrap_err(),
            FrameError::MissingBlankLine
        );
    }

    #[test]
    fn missing_terminator_is_rejected() {
        assert_eq!(
            Frame::parse("SEND\ndestination:/queue/a\n\nhello".to_string()).unwrap_err(),
            FrameError::MissingBody
        );
    }

    #[test]
    fn empty_header_key_is_rejected() {
        assert_eq!(
            Frame::parse("CONNECT\n:value\n\n\0".to_string()).unwrap_err(),
            FrameError::EmptyHeaderKey
        );
    }

    #[test]
    fn unrecognized_header_is_rejected() {
        assert_eq!(
            Frame::parse("CONNECT\nx-custom:1\n\n\0".to_string()).unwrap_err(),
            FrameError::UnrecognizedHeader
        );
    }

    #[test]
    fn missing_required_header_is_rejected() {
        assert_eq!(
            Frame::parse("CONNECT\naccept-version:1.2\n\n\0".to_string()).unwrap_err(),
            FrameError::MissingRequiredHeader(Header::Host)
        );
        assert_eq!(
            Frame::parse("SUBSCRIBE\ndestination:/queue/a\n\n\0".to_string()).unwrap_err(),
            FrameError::MissingRequiredHeader(Header::Id)
        );
    }

    #[test]
    fn body_on_subscribe_is_rejected() {
        let wire = "SUBSCRIBE\ndestination:/queue/a\nid:0\n\nnope\0";
        assert_eq!(
            Frame::parse(wire.to_string()).unwrap_err(),
            FrameError::UnexpectedBody
        );
    }

    #[test]
    fn non_numeric_content_length_is_rejected() {
        let wire = "SEND\ndestination:/queue/a\ncontent-length:five\n\nhello\0";
        assert_eq!(
            Frame::parse(wire.to_string()).unwrap_err(),
            FrameError::BadContentLength
        );
    }

    #[test]
    fn content_length_not_matching_terminator_is_rejected() {
        // Length says 3 but the fourth byte is not NUL.
        let wire = "SEND\ndestination:/queue/a\ncontent-length:3\n\nhello\0";
        assert_eq!(
            Frame::parse(wire.to_string()).unwrap_err(),
            FrameError::BadContentLength
        );
    }

    #[test]
    fn content_length_past_end_is_missing_body() {
        let wire = "SEND\ndestination:/queue/a\ncontent-length:50\n\nhello\0";
        assert_eq!(
            Frame::parse(wire.to_string()).unwrap_err(),
            FrameError::MissingBody
        );
    }

    #[test]
    fn duplicate_header_first_occurrence_wins() {
        let wire = "SEND\ndestination:/queue/a\ndestination:/queue/b\n\n\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.header(Header::Destination), Some("/queue/a"));
        assert_eq!(frame.headers().count(), 1);
    }

    #[test]
    fn carriage_returns_are_tolerated() {
        let wire = "CONNECT\r\naccept-version:1.2\r\nhost:example\r\n\r\n\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.header(Header::AcceptVersion), Some("1.2"));
        assert_eq!(frame.header(Header::Host), Some("example"));
    }

    #[test]
    fn trailing_eol_padding_is_tolerated() {
        let wire = "DISCONNECT\n\n\0\n\n";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.command(), Command::Disconnect);
    }

    #[test]
    fn trailing_junk_is_rejected() {
        let wire = "DISCONNECT\n\n\0junk";
        assert_eq!(
            Frame::parse(wire.to_string()).unwrap_err(),
            FrameError::UnexpectedBody
        );
    }

    #[test]
    fn header_value_may_contain_colon() {
        let wire = "CONNECT\naccept-version:1.2\nhost:example:8080\n\n\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        assert_eq!(frame.header(Header::Host), Some("example:8080"));
    }

    #[test]
    fn clone_observes_same_headers_and_body() {
        let wire = "SEND\ndestination:/queue/a\ncontent-length:5\n\nhello\0";
        let frame = Frame::parse(wire.to_string()).unwrap();
        let copy = frame.clone();
        assert_eq!(copy.command(), frame.command());
        assert_eq!(copy.header(Header::Destination), Some("/queue/a"));
        assert_eq!(copy.body(), "hello");
    }

    #[test]
    fn builder_computes_content_length() {
        let wire = FrameBuilder::new(Command::Send)
            .header(Header::Destination, "/queue/a")
            .body("hello")
            .build()
            .unwrap();
        assert!(wire.contains("content-length:5\n"));
        let frame = Frame::parse(wire).unwrap();
        assert_eq!(frame.header(Header::ContentLength), Some("5"));
        assert_eq!(frame.body(), "hello");
    }

    #[test]
    fn builder_overrides_caller_content_length() {
        let wire = FrameBuilder::new(Command::Send)
            .header(Header::Destination, "/queue/a")
            .header(Header::ContentLength, "999")
            .body("hello")
            .build()
            .unwrap();
        let frame = Frame::parse(wire).unwrap();
        assert_eq!(frame.header(Header::ContentLength), Some("5"));
    }

    #[test]
    fn builder_rejects_body_on_body_forbidden_command() {
        let result = FrameBuilder::new(Command::Subscribe)
            .header(Header::Destination, "/queue/a")
            .header(Header::Id, "0")
            .body("nope")
            .build();
        assert_eq!(result, Err(FrameError::UnexpectedBody));
    }

    #[test]
    fn builder_rejects_missing_required_header() {
        let result = FrameBuilder::new(Command::Subscribe)
            .header(Header::Destination, "/queue/a")
            .build();
        assert_eq!(result, Err(FrameError::MissingRequiredHeader(Header::Id)));
    }

    #[test]
    fn builder_parse_roundtrip() {
        // Round-trip: parse(build(c, h, b)) yields (c, h, b) with
        // content-length normalised.
        let frame = FrameBuilder::new(Command::Message)
            .header(Header::Destination, "/topic/events")
            .header(Header::MessageId, "42")
            .header(Header::Subscription, "7")
            .body(r#"{"k":"v"}"#)
            .into_frame()
            .unwrap();
        assert_eq!(frame.command(), Command::Message);
        assert_eq!(frame.header(Header::Destination), Some("/topic/events"));
        assert_eq!(frame.header(Header::MessageId), Some("42"));
        assert_eq!(frame.header(Header::Subscription), Some("7"));
        assert_eq!(frame.body(), r#"{"k":"v"}"#);
    }

    #[test]
    fn all_commands_roundtrip_their_wire_spelling() {
        for command in [
            Command::Stomp,
            Command::Connect,
            Command::Connected,
            Command::Send,
            Command::Subscribe,
            Command::Unsubscribe,
            Command::Ack,
            Command::Nack,
            Command::Disconnect,
            Command::Message,
            Command::Receipt,
            Command::Error,
            Command::Begin,
            Command::Commit,
            Command::Abort,
        ] {
            assert_eq!(Command::from_wire(command.as_str()), Some(command));
        }
    }
}
