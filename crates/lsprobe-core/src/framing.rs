//! LSP framing over a byte stream.
//!
//! Messages follow the header-content format:
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! {"jsonrpc":"2.0",...}
//! ```
//!
//! The reader and writer are split so the session's background reader task
//! can own the read half while callers share the write half.

use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::error::{Error, Result};

/// Writes Content-Length framed payloads to a stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap the write half of a stream.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame: header, blank line, then exactly the payload bytes.
    ///
    /// Flushes before returning, so a completed call means the frame has
    /// left this process in issue order.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing the stream fails.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", payload.len());

        self.inner.write_all(header.as_bytes()).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await?;

        Ok(())
    }
}

/// Reads Content-Length framed payloads from a stream.
///
/// Single-consumer: only the session's background reader task should call
/// [`read_frame`](Self::read_frame).
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap the read half of a stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Block until a complete header-plus-payload unit is available and
    /// return the payload bytes.
    ///
    /// Header field names are matched case-insensitively; a Content-Type
    /// header is tolerated and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] on clean EOF at a frame boundary,
    /// and [`Error::Framing`] if a header line is malformed, Content-Length
    /// is missing or non-numeric, or the stream closes mid-frame.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let headers = self.read_headers().await?;

        let content_length = headers
            .get("content-length")
            .ok_or_else(|| Error::Framing("missing Content-Length header".to_string()))?
            .parse::<usize>()
            .map_err(|e| Error::Framing(format!("invalid Content-Length: {e}")))?;

        let mut payload = vec![0u8; content_length];
        self.inner.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Framing("stream closed mid-frame".to_string())
            } else {
                Error::Io(e)
            }
        })?;

        trace!(len = content_length, "received frame");
        Ok(payload)
    }

    /// Read header lines until the blank line separating them from content.
    async fn read_headers(&mut self) -> Result<HashMap<String, String>> {
        let mut headers = HashMap::new();
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = self.inner.read_line(&mut line).await?;

            // read_line returns 0 bytes on EOF
            if bytes_read == 0 {
                if headers.is_empty() {
                    return Err(Error::ConnectionClosed);
                }
                return Err(Error::Framing("stream closed inside headers".to_string()));
            }

            if line == "\r\n" || line == "\n" {
                break;
            }

            if let Some((key, value)) = line.trim_end().split_once(':') {
                headers.insert(key.trim().to_lowercase(), value.trim().to_string());
            } else {
                return Err(Error::Framing(format!(
                    "malformed header line: {:?}",
                    line.trim_end()
                )));
            }
        }

        Ok(headers)
    }
}
