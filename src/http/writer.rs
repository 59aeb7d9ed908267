use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{FileBody, Response};

/// Status line, headers sorted by name, then the blank line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers; BTreeMap iterates in name order
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

pub struct ResponseWriter {
    head: Vec<u8>,
    written: usize,
    body: Option<FileBody>,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            head: serialize_head(response),
            written: 0,
            body: response.body.clone(),
        }
    }

    /// Writes the whole response and flushes. Any error leaves the stream in
    /// an unknown framing state; the caller must not reuse it.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.head.len() {
            let n = stream.write(&self.head[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        if let Some(FileBody { path, len }) = &self.body {
            let file = File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;

            // Never send more than the advertised length, even if the file grew.
            let sent = tokio::io::copy(&mut file.take(*len), stream).await?;
            if sent < *len {
                anyhow::bail!(
                    "{} shrank while sending: {} of {} bytes",
                    path.display(),
                    sent,
                    len
                );
            }
        }

        stream.flush().await?;
        Ok(())
    }
}
