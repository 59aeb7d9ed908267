use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::config::Config;
use crate::http::line::LineReader;
use crate::http::parser::{ParseOutcome, parse_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::static_files::FileResolver;

/// Read-only state shared by every connection.
#[derive(Debug)]
pub struct ServerContext {
    pub resolver: FileResolver,
    /// Deadline applied afresh before each request is read.
    pub read_timeout: Duration,
}

impl ServerContext {
    pub fn new(resolver: FileResolver, read_timeout: Duration) -> Self {
        Self {
            resolver,
            read_timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            FileResolver::new(&cfg.static_files.doc_root)?,
            cfg.read_timeout(),
        ))
    }

    /// Answers a valid request with the file it names, or 404.
    pub async fn respond(&self, request: Request) -> Response {
        match self.resolver.resolve(&request.target).await {
            Some(file) => Response::ok(request, &file),
            None => Response::not_found(Some(request)),
        }
    }
}

pub struct Connection<S> {
    reader: LineReader<S>,
    ctx: Arc<ServerContext>,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    AwaitRequest,
    Dispatch(Request),
    Respond(Response),
    Closed,
}

impl ConnectionState {
    /// Picks the next state from the result of reading a request.
    ///
    /// A clean close or an idle timeout ends the connection silently. Any
    /// other failure, a stalled partial request included, earns a 400 whose
    /// `Connection: close` ends the connection after it is written.
    pub fn after_parse(outcome: ParseOutcome) -> Self {
        match outcome {
            ParseOutcome::Success(request) => ConnectionState::Dispatch(request),
            ParseOutcome::EndOfStream => ConnectionState::Closed,
            ParseOutcome::Failure {
                error,
                bytes_received,
            } => {
                if error.is_io() {
                    tracing::debug!(error = %error, "read failed");
                    ConnectionState::Closed
                } else if error.is_timeout() && !bytes_received {
                    tracing::debug!("idle timeout");
                    ConnectionState::Closed
                } else {
                    tracing::warn!(error = %error, bytes_received, "bad request");
                    ConnectionState::Respond(Response::bad_request())
                }
            }
        }
    }

    /// State after `response` has been written.
    pub fn after_write(response: &Response) -> Self {
        if response.closes_connection() {
            ConnectionState::Closed
        } else {
            ConnectionState::AwaitRequest
        }
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: Arc<ServerContext>) -> Self {
        Self {
            reader: LineReader::new(stream),
            ctx,
            state: ConnectionState::AwaitRequest,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitRequest => {
                    self.reader
                        .set_deadline(Instant::now() + self.ctx.read_timeout);
                    let outcome = parse_request(&mut self.reader).await;
                    self.state = ConnectionState::after_parse(outcome);
                }

                ConnectionState::Dispatch(request) => {
                    let response = self.ctx.respond(request).await;
                    self.state = ConnectionState::Respond(response);
                }

                ConnectionState::Respond(response) => {
                    let mut writer = ResponseWriter::new(&response);
                    writer
                        .write_to_stream(self.reader.get_mut())
                        .await
                        .with_context(|| {
                            format!("failed to write {} response", response.status.as_u16())
                        })?;

                    tracing::info!(
                        status = response.status.as_u16(),
                        "target" = response.request.as_ref().map(|r| r.target.as_str()),
                        "response sent"
                    );

                    self.state = ConnectionState::after_write(&response);
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        // The peer may already be gone; nothing useful to do on failure.
        let _ = self.reader.get_mut().shutdown().await;
        Ok(())
    }
}
