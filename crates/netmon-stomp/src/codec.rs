//! Streaming STOMP codec for `tokio_util::codec::Framed`.
//!
//! Locates frame boundaries in the inbound byte stream (honoring
//! `content-length`, which permits `NUL` bytes inside the body) and hands
//! each complete frame to [`Frame::parse`]. Outbound frames are written as
//! pre-built wire strings.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Frame, FrameError};

/// Upper bound on a single frame, command line through terminator.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Errors surfaced by the streaming codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("frame is not valid UTF-8")]
    Utf8,
    #[error("frame exceeds {MAX_FRAME_LEN} bytes")]
    FrameTooLarge,
}

/// STOMP 1.2 frame codec over a byte stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct StompCodec;

impl StompCodec {
    /// Find the end of the next complete frame (index one past the
    /// terminating `NUL`), or `None` if more bytes are needed.
    fn frame_end(src: &[u8]) -> Result<Option<usize>, CodecError> {
        // End of the header block: the first empty line.
        let Some(body_start) = end_of_headers(src) else {
            return Ok(None);
        };

        if let Some(len) = declared_content_length(&src[..body_start])? {
            let terminator = body_start + len;
            if src.len() <= terminator {
                return Ok(None);
            }
            // The terminator byte itself is validated by the frame parser.
            return Ok(Some(terminator + 1));
        }

        match src[body_start..].iter().position(|&b| b == 0) {
            Some(offset) => Ok(Some(body_start + offset + 1)),
            None => Ok(None),
        }
    }
}

impl Decoder for StompCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        // Skip inter-frame EOLs (heart-beats and frame padding).
        while src.first().is_some_and(|&b| b == b'\n' || b == b'\r') {
            src.advance(1);
        }
        if src.is_empty() {
            return Ok(None);
        }

        let Some(end) = Self::frame_end(src)? else {
            if src.len() > MAX_FRAME_LEN {
                return Err(CodecError::FrameTooLarge);
            }
            return Ok(None);
        };
        if end > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge);
        }

        let raw = src.split_to(end);
        let text = String::from_utf8(raw.to_vec()).map_err(|_| CodecError::Utf8)?;
        Frame::parse(text).map(Some).map_err(CodecError::from)
    }
}

impl Encoder<String> for StompCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

/// Index one past the blank line closing the header block.
fn end_of_headers(src: &[u8]) -> Option<usize> {
    let mut cursor = 0;
    loop {
        let line_end = src[cursor..].iter().position(|&b| b == b'\n')? + cursor;
        let line = &src[cursor..line_end];
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        if line.is_empty() && cursor > 0 {
            return Some(line_end + 1);
        }
        cursor = line_end + 1;
    }
}

/// Scan the header block for `content-length` without a full parse.
/// First occurrence wins, matching the frame parser.
fn declared_content_length(head: &[u8]) -> Result<Option<usize>, CodecError> {
    const KEY: &[u8] = b"content-length:";
    for line in head.split(|&b| b == b'\n') {
        if let Some(value) = line.strip_prefix(KEY) {
            let value = match value.last() {
                Some(b'\r') => &value[..value.len() - 1],
                _ => value,
            };
            let text = std::str::from_utf8(value).map_err(|_| CodecError::Utf8)?;
            let len = text.parse().map_err(|_| FrameError::BadContentLength)?;
            return Ok(Some(len));
        }
    }
    Ok(None)
}
