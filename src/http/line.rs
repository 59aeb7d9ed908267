use std::io;

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

/// Longest line accepted, terminator excluded.
pub const MAX_LINE_LEN: usize = 8 * 1024;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum LineErrorKind {
    #[error("end of stream")]
    Eof,
    #[error("read deadline expired")]
    Timeout,
    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    TooLong,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A line could not be completed.
///
/// `partial` holds whatever bytes of the unfinished line had arrived; whether it
/// is empty tells an idle connection apart from one that stalled mid-line.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct LineError {
    pub kind: LineErrorKind,
    pub partial: Bytes,
}

impl LineError {
    pub fn bytes_received(&self) -> bool {
        !self.partial.is_empty()
    }
}

/// Reads CRLF-terminated lines from a byte stream.
///
/// Bytes read past the end of a line stay buffered for the next call, so
/// nothing is lost between consecutive requests on a kept-alive connection.
pub struct LineReader<R> {
    inner: R,
    buffer: BytesMut,
    deadline: Option<Instant>,
}

impl<R> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            deadline: None,
        }
    }

    /// Every read issued after this call fails with [`LineErrorKind::Timeout`]
    /// once `deadline` has passed.
    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// The underlying stream, for writing responses on the same connection.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn fail(&mut self, kind: LineErrorKind) -> LineError {
        LineError {
            kind,
            partial: self.buffer.split().freeze(),
        }
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Returns the next line with its CRLF stripped.
    pub async fn read_line(&mut self) -> Result<Bytes, LineError> {
        loop {
            let window = self.buffer.len().min(MAX_LINE_LEN + 2);
            if let Some(pos) = find_crlf(&self.buffer[..window]) {
                let mut line = self.buffer.split_to(pos + 2);
                line.truncate(pos);
                return Ok(line.freeze());
            }

            if self.buffer.len() >= MAX_LINE_LEN + 2 {
                return Err(self.fail(LineErrorKind::TooLong));
            }

            self.buffer.reserve(READ_CHUNK);
            let read = match self.deadline {
                Some(deadline) => {
                    match timeout_at(deadline, self.inner.read_buf(&mut self.buffer)).await {
                        Ok(read) => read,
                        Err(_) => return Err(self.fail(LineErrorKind::Timeout)),
                    }
                }
                None => self.inner.read_buf(&mut self.buffer).await,
            };

            match read {
                Ok(0) => return Err(self.fail(LineErrorKind::Eof)),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(self.fail(LineErrorKind::Timeout));
                }
                Err(e) => return Err(self.fail(LineErrorKind::Io(e))),
            }
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
