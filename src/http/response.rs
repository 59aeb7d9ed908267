use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::http::date::format_http_date;
use crate::http::mime::mime_type_for_path;
use crate::http::request::{HTTP_VERSION, Request};
use crate::static_files::ResolvedFile;

/// HTTP status codes supported by the server.
///
/// - `Ok` (200): File found and served
/// - `BadRequest` (400): Malformed request
/// - `NotFound` (404): No servable file for the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A response ready to be written to a client.
///
/// Headers are kept in a `BTreeMap`, so iteration yields them sorted by name.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub version: &'static str,
    pub headers: BTreeMap<String, String>,
    /// The valid request this answers, if there was one.
    pub request: Option<Request>,
    /// `None` means no body.
    pub body: Option<FileBody>,
}

/// The first `len` bytes of a file, sent as the response body.
///
/// `len` is the value advertised in `Content-Length`; the writer never sends
/// more, and fails if the file has fewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBody {
    pub path: PathBuf,
    pub len: u64,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::NotFound)
///     .header("Connection", "close")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    request: Option<Request>,
    body: Option<FileBody>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            request: None,
            body: None,
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds `Connection: close` when `close` is set.
    pub fn close_if(self, close: bool) -> Self {
        if close {
            self.header("Connection", "close")
        } else {
            self
        }
    }

    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Sends `len` bytes of the file at `path` and sets `Content-Length` to match.
    pub fn body_file(mut self, path: impl Into<PathBuf>, len: u64) -> Self {
        self.body = Some(FileBody {
            path: path.into(),
            len,
        });
        self.header("Content-Length", len.to_string())
    }

    /// Builds the final Response.
    ///
    /// Adds a `Date` header for the current time if none was set.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Date".to_string())
            .or_insert_with(|| format_http_date(SystemTime::now()));

        Response {
            status: self.status,
            version: HTTP_VERSION,
            headers: self.headers,
            request: self.request,
            body: self.body,
        }
    }
}

impl Response {
    /// 200 OK serving `file` in answer to `request`.
    pub fn ok(request: Request, file: &ResolvedFile) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .close_if(request.close)
            .header("Content-Type", mime_type_for_path(&file.path))
            .header("Last-Modified", format_http_date(file.metadata.modified))
            .body_file(file.path.clone(), file.metadata.size)
            .request(request)
            .build()
    }

    /// 404 Not Found; carries `Connection: close` only if the request asked for it.
    pub fn not_found(request: Option<Request>) -> Self {
        let close = request.as_ref().is_some_and(|r| r.close);
        let builder = ResponseBuilder::new(StatusCode::NotFound).close_if(close);
        match request {
            Some(request) => builder.request(request).build(),
            None => builder.build(),
        }
    }

    /// 400 Bad Request. The stream cannot be resynchronised, so it always closes.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Connection", "close")
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    /// Whether the connection must be closed once this response is written.
    pub fn closes_connection(&self) -> bool {
        self.header("Connection") == Some("close")
    }
}
