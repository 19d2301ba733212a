//! Request and response model.
//!
//! These are the values flowing through interception: the worker classifies a
//! [`Request`], strategies produce a [`Response`], and the cache stores
//! response snapshots keyed by request.

use serde::{Deserialize, Serialize};
use url::Url;

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value for `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.0.push((name, value.into()));
    }

    /// Append a value without removing existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// What the requesting context intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
}

/// Request mode, mirroring how the browser would issue the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    /// Cross-origin request whose response may come back opaque.
    NoCors,
}

fn normalize_method(method: impl Into<String>) -> String {
    let mut method = method.into();
    method.make_ascii_uppercase();
    method
}

/// An outgoing request intercepted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
    pub destination: Destination,
    pub mode: RequestMode,
}

impl Request {
    /// Build a request with an explicit method, stored uppercase.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: normalize_method(method),
            url,
            headers: Headers::new(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
        }
    }

    /// Build a plain GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Build a top-level navigation request for an HTML document.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .with_destination(Destination::Document)
            .with_mode(RequestMode::Navigate)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = normalize_method(method);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Only GET is treated as a safe read that may be intercepted and cached.
    pub fn is_safe_read(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn accept(&self) -> Option<&str> {
        self.headers.get("accept")
    }
}

/// How a response was obtained, which controls what the caller may inspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin network response.
    #[default]
    Basic,
    /// Cross-origin response with readable status and headers.
    Cors,
    /// Cross-origin no-cors response: status 0, headers hidden.
    Opaque,
    /// Generated locally without network or cache access.
    Synthetic,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Synthetic => "synthetic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "cors" => Some(ResponseKind::Cors),
            "opaque" => Some(ResponseKind::Opaque),
            "synthetic" => Some(ResponseKind::Synthetic),
            _ => None,
        }
    }
}

/// A captured or synthesized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
    /// Final URL after redirects, when known.
    pub url: Option<Url>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: default_status_text(status).to_string(),
            headers: Headers::new(),
            body: body.into(),
            kind: ResponseKind::Basic,
            url: None,
        }
    }

    /// A locally generated response with the given content type.
    pub fn synthetic(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self { kind: ResponseKind::Synthetic, ..Self::new(status, body) }.with_header("Content-Type", content_type)
    }

    /// A no-cors cross-origin response. Status and headers are not observable.
    pub fn opaque(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
            kind: ResponseKind::Opaque,
            url: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Status in 200..=299. This is the only gate for cache writes.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
