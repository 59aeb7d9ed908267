use std::collections::HashMap;
use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::http::line::{LineError, LineErrorKind, LineReader, MAX_LINE_LEN};
use crate::http::request::{
    HTTP_VERSION, Method, Request, canonical_header_name, is_valid_header_name, normalize_target,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed start line {0:?}")]
    MalformedStartLine(String),
    #[error("invalid method {0:?}")]
    InvalidMethod(String),
    #[error("invalid target {0:?}")]
    InvalidTarget(String),
    #[error("invalid protocol version {0:?}")]
    InvalidVersion(String),
    #[error("malformed header line {0:?}")]
    MalformedHeader(String),
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    #[error("missing Host header")]
    MissingHost,
    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    LineTooLong,
    #[error("request line is not valid UTF-8")]
    InvalidUtf8,
    #[error("timed out waiting for request data")]
    Timeout,
    #[error("connection closed mid-request")]
    UnexpectedEof,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ParseError::Timeout)
    }

    /// Transport failures other than timeout and EOF; there is nobody left to answer.
    pub fn is_io(&self) -> bool {
        matches!(self, ParseError::Io(_))
    }
}

/// Result of one attempt to read a request off a connection.
#[derive(Debug)]
pub enum ParseOutcome {
    Success(Request),
    /// `bytes_received` is true if any byte of this request had arrived
    /// before the failure.
    Failure {
        error: ParseError,
        bytes_received: bool,
    },
    /// The peer closed the connection between requests.
    EndOfStream,
}

impl ParseOutcome {
    fn failure(error: ParseError) -> Self {
        ParseOutcome::Failure {
            error,
            bytes_received: true,
        }
    }

    fn from_line_error(err: LineError, bytes_received: bool) -> Self {
        let error = match err.kind {
            LineErrorKind::Eof if !bytes_received => return ParseOutcome::EndOfStream,
            LineErrorKind::Eof => ParseError::UnexpectedEof,
            LineErrorKind::Timeout => ParseError::Timeout,
            LineErrorKind::TooLong => ParseError::LineTooLong,
            LineErrorKind::Io(e) => ParseError::Io(e),
        };
        ParseOutcome::Failure {
            error,
            bytes_received,
        }
    }
}

/// Reads and validates one request: a start line, then header lines up to
/// the first empty line.
pub async fn parse_request<R>(reader: &mut LineReader<R>) -> ParseOutcome
where
    R: AsyncRead + Unpin,
{
    let line = match reader.read_line().await {
        Ok(line) => line,
        Err(err) => {
            let received = err.bytes_received();
            return ParseOutcome::from_line_error(err, received);
        }
    };

    let (method, target, version) = match as_str(&line).and_then(parse_start_line) {
        Ok(parts) => parts,
        Err(e) => return ParseOutcome::failure(e),
    };
    tracing::trace!(method = method.as_str(), "target" = %target, "start line");

    let mut headers = HashMap::new();
    let mut host = None;
    let mut close = false;

    loop {
        let line = match reader.read_line().await {
            Ok(line) => line,
            // The start line has been consumed, so bytes were received.
            Err(err) => return ParseOutcome::from_line_error(err, true),
        };
        if line.is_empty() {
            break;
        }

        let (name, value) = match as_str(&line).and_then(parse_header_line) {
            Ok(pair) => pair,
            Err(e) => return ParseOutcome::failure(e),
        };

        match name.as_str() {
            "Host" => host = Some(value),
            "Connection" => close = value == "close",
            _ => {
                headers.insert(name, value);
            }
        }
    }

    let host = match host.filter(|h| !h.is_empty()) {
        Some(host) => host,
        None => return ParseOutcome::failure(ParseError::MissingHost),
    };

    ParseOutcome::Success(Request {
        method,
        target,
        version,
        headers,
        host,
        close,
    })
}

fn as_str(line: &Bytes) -> Result<&str, ParseError> {
    std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)
}

/// Splits `METHOD TARGET VERSION` and validates each field.
///
/// The returned target already has the default document appended if it ended in `/`.
pub fn parse_start_line(line: &str) -> Result<(Method, String, String), ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedStartLine(line.to_string()));
    };

    let method =
        Method::from_str(method).ok_or_else(|| ParseError::InvalidMethod(method.to_string()))?;

    if !target.starts_with('/') {
        return Err(ParseError::InvalidTarget(target.to_string()));
    }

    if *version != HTTP_VERSION {
        return Err(ParseError::InvalidVersion(version.to_string()));
    }

    Ok((method, normalize_target(target), version.to_string()))
}

/// Splits `Name: value` on the first colon.
///
/// Returns the canonical name and the value with its leading spaces removed;
/// trailing whitespace is kept as sent.
pub fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;

    if !is_valid_header_name(name) {
        return Err(ParseError::InvalidHeaderName(name.to_string()));
    }

    Ok((
        canonical_header_name(name),
        value.trim_start_matches(' ').to_string(),
    ))
}
