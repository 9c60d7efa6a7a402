//! Transport boundary between the session and the web service.
//!
//! A [`Transport`] performs exactly one request and hands back the status code
//! and decoded body. It does not interpret status codes; that is the
//! [`Session`](crate::Session)'s job. [`HttpTransport`] is the production
//! implementation on top of `reqwest`.

use std::fmt;
use std::future::Future;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// A single request against the web service.
#[derive(Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service endpoint, e.g. `dashboards/10`.
    pub path: String,
    /// Query string parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Bearer token attached by the session.
    pub token: Option<String>,
}

impl Request {
    /// Create a request with no query, body or token.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token: None,
        }
    }

    /// Adds a query string parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

// The token must never end up in logs.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The status and decoded body of a response.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body; `None` when the service sent an empty body.
    pub body: Option<Value>,
}

impl Response {
    /// Create a response.
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// A `200 OK` response with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body))
    }

    /// Best-effort human readable message from the body.
    pub fn message(&self) -> String {
        match &self.body {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// Issues requests against the web service.
///
/// Implementations must be usable from a shared reference; the session holds
/// one transport and every collection borrows it.
pub trait Transport: Send + Sync {
    /// Send one request and return the raw status and decoded body.
    ///
    /// Errors are reserved for failures below the HTTP status layer
    /// (connection refused, timeouts, undecodable bodies).
    fn send(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Self::with_http_client(http, &config.endpoint)
    }

    /// Create a transport with a custom reqwest client.
    ///
    /// This allows you to configure proxies, TLS client certificates, etc.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `endpoint` is not a valid URL.
    pub fn with_http_client(http: reqwest::Client, endpoint: &str) -> Result<Self> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid Argus endpoint '{}': {}", endpoint, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Argus endpoint '{}' cannot be used as a base URL",
                endpoint
            )));
        }

        Ok(Self { http, base_url })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for an API path, keeping the endpoint's own path prefix.
    ///
    /// Free-text segments must already be escaped with [`encode_segment`];
    /// a path that still carries a query or fragment is refused.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = Url::parse(&joined)
            .map_err(|e| Error::Config(format!("invalid request path '{}': {}", path, e)))?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::Config(format!(
                "request path '{}' must not contain '?' or '#'",
                path
            )));
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = self.endpoint(&request.path)?;

        let mut builder = self
            .http
            .request(request.method, url)
            .header("Accept", "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(Response::new(status, decode_body(&text)))
    }
}

/// RFC 3986 unreserved characters stay as they are.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escape free text (a username, say) for use as exactly one path segment.
///
/// # Errors
///
/// Returns [`Error::Validation`] for empty, `.` and `..` segments, which URL
/// normalization would drop or resolve against the parent.
pub(crate) fn encode_segment(raw: &str) -> Result<String> {
    if matches!(raw, "" | "." | "..") {
        return Err(Error::validation(format!(
            "'{}' can't be used as a path segment",
            raw
        )));
    }
    Ok(utf8_percent_encode(raw, SEGMENT).to_string())
}

/// Decode a response body; the service sends plain text for some errors.
fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let transport = HttpTransport::with_http_client(
            reqwest::Client::new(),
            "http://test.host:12345/argusws",
        )
        .unwrap();

        assert_eq!(
            transport.endpoint("dashboards/10").unwrap().as_str(),
            "http://test.host:12345/argusws/dashboards/10"
        );
        assert_eq!(
            transport.endpoint("/v2/auth/login").unwrap().as_str(),
            "http://test.host:12345/argusws/v2/auth/login"
        );
    }

    #[test]
    fn test_endpoint_refuses_query_and_fragment() {
        let transport =
            HttpTransport::with_http_client(reqwest::Client::new(), "http://h/argusws").unwrap();

        assert!(matches!(transport.endpoint("users/username/a#b"), Err(Error::Config(_))));
        assert!(matches!(transport.endpoint("users/username/a?b"), Err(Error::Config(_))));

        let path = format!("users/username/{}", encode_segment("a#b").unwrap());
        let url = transport.endpoint(&path).unwrap();
        assert_eq!(url.path(), "/argusws/users/username/a%23b");
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("test.user").unwrap(), "test.user");
        assert_eq!(encode_segment("a/b?c#d").unwrap(), "a%2Fb%3Fc%23d");
        assert_eq!(encode_segment("jo ann%").unwrap(), "jo%20ann%25");
        assert_eq!(encode_segment("héllo").unwrap(), "h%C3%A9llo");
        for raw in ["", ".", ".."] {
            assert!(matches!(encode_segment(raw), Err(Error::Validation { .. })));
        }
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpTransport::with_http_client(reqwest::Client::new(), "not a url").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), None);
        assert_eq!(decode_body("  \n"), None);
        assert_eq!(decode_body(r#"{"id": 10}"#), Some(json!({"id": 10})));
        assert_eq!(
            decode_body("Internal Server Error"),
            Some(Value::String("Internal Server Error".to_string()))
        );
    }

    #[test]
    fn test_response_message() {
        let resp = Response::new(401, Some(json!({"status": 401, "message": "Unauthorized"})));
        assert_eq!(resp.message(), "Unauthorized");

        let resp = Response::new(500, Some(Value::String("boom".to_string())));
        assert_eq!(resp.message(), "boom");

        assert_eq!(Response::new(404, None).message(), "");
    }

    #[test]
    fn test_request_debug_redacts_token() {
        let mut request = Request::new(Method::GET, "alerts");
        request.token = Some("secret-token".to_string());
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
