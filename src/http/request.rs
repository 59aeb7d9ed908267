use std::collections::HashMap;

/// The only protocol version the server speaks.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Appended to any target ending in `/`.
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// HTTP request methods.
///
/// The server is read-only, so GET is the only method it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
}

/// A validated HTTP request.
///
/// `Host` and `Connection` are lifted out of the header map into [`Request::host`]
/// and [`Request::close`]; every other header is stored under its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request target, always starting with `/`. A trailing `/` has already
    /// been expanded to the default document.
    pub target: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub host: String,
    /// Set iff the client sent `Connection: close`.
    pub close: bool,
}

/// Builder for constructing Request objects.
///
/// Applies the same validation and normalisation as the wire parser, so a
/// built `Request` upholds the same invariants as a parsed one.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    host: Option<String>,
    close: bool,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("POST"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
        }
    }
}

/// Normalises a header name so that lookups are case-insensitive.
///
/// The first letter and every letter following a `-` are upper-cased, all
/// other letters lower-cased: `content-TYPE` becomes `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Header names are restricted to `[A-Za-z0-9-]+`.
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Returns the target with the default document appended when it names a directory.
pub fn normalize_target(target: &str) -> String {
    if target.ends_with('/') {
        format!("{}{}", target, DEFAULT_DOCUMENT)
    } else {
        target.to_string()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: None,
            headers: HashMap::new(),
            host: None,
            close: false,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds a header the way the parser would: the name is canonicalised,
    /// `Host` and `Connection` go to their dedicated fields, and a repeated
    /// name overwrites the earlier value.
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = canonical_header_name(key);
        let value = value.into();
        match key.as_str() {
            "Host" => self.host = Some(value),
            "Connection" => self.close = value == "close",
            _ => {
                self.headers.insert(key, value);
            }
        }
        self
    }

    pub fn host(self, host: impl Into<String>) -> Self {
        self.header("Host", host)
    }

    pub fn close(mut self, close: bool) -> Self {
        self.close = close;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let method = self.method.unwrap_or(Method::GET);

        let target = self.target.ok_or("target missing")?;
        if !target.starts_with('/') {
            return Err("target must start with '/'");
        }

        let version = self.version.unwrap_or_else(|| HTTP_VERSION.to_string());
        if version != HTTP_VERSION {
            return Err("unsupported protocol version");
        }

        let host = self
            .host
            .filter(|h| !h.is_empty())
            .ok_or("host missing")?;

        Ok(Request {
            method,
            target: normalize_target(&target),
            version,
            headers: self.headers,
            host,
            close: self.close,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    ///
    /// `Host` and `Connection` are not in the map; use the dedicated fields.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_name(key))
            .map(|v| v.as_str())
    }
}
