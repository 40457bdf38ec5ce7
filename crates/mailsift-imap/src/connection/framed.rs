//! Framed I/O for the IMAP protocol.
//!
//! One IMAP response is a CRLF-terminated line, except that a line may
//! announce a `{N}` literal: the next N bytes are payload, after which
//! the line resumes. This module treats a response as a single *frame*
//! (line, plus every announced literal and its continuation line) and
//! carves complete frames out of one growing receive buffer.
//!
//! Reads accumulate into the buffer and the scanner keeps its position
//! between calls, so a cancelled `read_response` (IDLE waits run under a
//! timeout) loses nothing: the partial frame stays buffered and the next
//! call picks the scan up where it stopped.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::Result;

/// Initial receive-buffer capacity; grows on demand.
const INITIAL_CAPACITY: usize = 4096;

/// Ceiling on one complete frame (line plus all spliced literals). A
/// server announcing more than this is misbehaving or hostile.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Framed connection for the IMAP protocol.
pub struct FramedStream<S> {
    stream: S,
    buffer: BytesMut,
    /// Bytes at the front of `buffer` already confirmed to belong to the
    /// frame under construction (complete lines and literal payloads).
    frame_end: usize,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            frame_end: 0,
        }
    }

    /// Reads one complete response frame, literals spliced in.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(frame);
            }

            let read = self.stream.read_buf(&mut self.buffer).await?;
            if read == 0 {
                return Err(crate::Error::ConnectionClosed(
                    "connection closed mid-response".to_string(),
                ));
            }
        }
    }

    /// Advances the frame scanner over the buffered bytes; returns the
    /// frame once its final line is complete.
    ///
    /// `frame_end` always rests on a line boundary (start of frame, or
    /// just past a literal payload), so resuming after partial data only
    /// ever re-examines the current line.
    fn take_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let Some(rel) = find_crlf(&self.buffer[self.frame_end..]) else {
                self.guard_frame_size()?;
                return Ok(None);
            };
            let line_end = self.frame_end + rel + 2;

            match literal_announcement(&self.buffer[self.frame_end..line_end]) {
                Some(len) => {
                    if len > MAX_FRAME_BYTES {
                        return Err(crate::Error::Protocol(format!(
                            "literal too large: {len} bytes (max {MAX_FRAME_BYTES})"
                        )));
                    }
                    let payload_end = line_end + len;
                    if self.buffer.len() < payload_end {
                        // Literal still arriving; the line rescan on the
                        // next call is bounded by one line.
                        self.guard_frame_size()?;
                        return Ok(None);
                    }
                    self.frame_end = payload_end;
                }
                None => {
                    let frame = self.buffer.split_to(line_end).to_vec();
                    self.frame_end = 0;
                    return Ok(Some(frame));
                }
            }
        }
    }

    fn guard_frame_size(&self) -> Result<()> {
        if self.buffer.len() > MAX_FRAME_BYTES {
            return Err(crate::Error::Protocol(format!(
                "response frame exceeds {MAX_FRAME_BYTES} bytes"
            )));
        }
        Ok(())
    }

    /// Writes a command line to the stream.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Writes raw bytes (literal payloads).
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.write_command(data).await
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Any buffered receive data is dropped; only call between complete
    /// responses (e.g. immediately after a tagged completion, as the
    /// STARTTLS upgrade does).
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal announcement terminating a complete line.
///
/// Accepts `{N}` and the non-synchronizing `{N+}` form. The digits are
/// matched from the tail inward, so a `{` appearing earlier in the line
/// (quoted text, header data) cannot confuse the scan.
fn literal_announcement(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?;
    let body = body.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);

    let digits = body.len()
        - body
            .iter()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
    if digits == body.len() {
        return None;
    }
    if digits == 0 || body[digits - 1] != b'{' {
        return None;
    }

    std::str::from_utf8(&body[digits..]).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
    }

    #[test]
    fn test_literal_announcement() {
        assert_eq!(literal_announcement(b"BODY {123}\r\n"), Some(123));
        assert_eq!(literal_announcement(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(literal_announcement(b"{0}\r\n"), Some(0));
        assert_eq!(literal_announcement(b"no literal\r\n"), None);
        assert_eq!(literal_announcement(b"incomplete {123"), None);
        assert_eq!(literal_announcement(b"wrong {abc}\r\n"), None);
        assert_eq!(literal_announcement(b"empty {}\r\n"), None);
        // An earlier brace must not satisfy the tail scan.
        assert_eq!(literal_announcement(b"text {5} more\r\n"), None);
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = tokio_test::io::Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_with_literal() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* 1 FETCH (BODY[TEXT] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[TEXT] {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_read_with_two_literals() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* 1 FETCH (BODY[HEADER] {4}\r\n")
            .read(b"X: 1 BODY[TEXT] {2}\r\n")
            .read(b"hi)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(
            response,
            b"* 1 FETCH (BODY[HEADER] {4}\r\nX: 1 BODY[TEXT] {2}\r\nhi)\r\n"
        );
    }

    #[tokio::test]
    async fn test_literal_split_mid_payload() {
        // Payload and closing line arrive in awkward pieces; the frame
        // assembles regardless of chunk boundaries.
        let mock = tokio_test::io::Builder::new()
            .read(b"* 1 FETCH (BODY[TEXT] {11}\r\nhel")
            .read(b"lo ")
            .read(b"world")
            .read(b")\r\n* 2 EXISTS\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[TEXT] {11}\r\nhello world)\r\n");

        // The trailing bytes of the last chunk are the next frame.
        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 2 EXISTS\r\n");
    }

    #[tokio::test]
    async fn test_cancelled_read_resumes_frame() {
        let mock = tokio_test::io::Builder::new()
            .read(b"* 1 FETCH (BODY[TEXT] {2}\r\n")
            .wait(std::time::Duration::from_millis(50))
            .read(b"hi)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        // First attempt times out mid-frame.
        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(5),
            framed.read_response(),
        )
        .await;
        assert!(attempt.is_err());

        // The buffered prefix is not lost; the retry completes the frame.
        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[TEXT] {2}\r\nhi)\r\n");
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = tokio_test::io::Builder::new()
            .write(b"A001 NOOP\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A001 NOOP\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let header = format!("* 1 FETCH (BODY {{{}}}\r\n", MAX_FRAME_BYTES + 1);
        let mock = tokio_test::io::Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let mock = tokio_test::io::Builder::new().build();
        let mut framed = FramedStream::new(mock);

        let result = framed.read_response().await;
        assert!(matches!(result, Err(crate::Error::ConnectionClosed(_))));
    }
}
