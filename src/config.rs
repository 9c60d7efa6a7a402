//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_LOGIN_PATH: &str = "v2/auth/login";
const DEFAULT_LOGOUT_PATH: &str = "v2/auth/logout";

/// Settings for connecting to an Argus web service.
///
/// Deserializable so it can be embedded in an application's own config file;
/// every field except `endpoint` has a default.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use argus_client::ClientConfig;
///
/// let config = ClientConfig::new("https://argus.example.com/argusws")
///     .with_request_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the web service, e.g. `http://localhost:8080/argusws`.
    pub endpoint: String,

    /// Milliseconds allowed for establishing a connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Milliseconds allowed for a whole request, including reading the body.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Path of the login endpoint, relative to `endpoint`.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path of the logout endpoint, relative to `endpoint`.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Optional `User-Agent` header value.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Whole milliseconds, rounding a non-zero sub-millisecond duration up to 1.
fn to_millis(timeout: Duration) -> u64 {
    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 && !timeout.is_zero() { 1 } else { ms }
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_string()
}

impl ClientConfig {
    /// Create a config for `endpoint` with default timeouts and auth paths.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            user_agent: None,
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = to_millis(timeout);
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = to_millis(timeout);
        self
    }

    /// Sets the login and logout paths.
    ///
    /// Some deployments authenticate against a separate token service path.
    #[must_use]
    pub fn with_auth_paths(mut self, login: impl Into<String>, logout: impl Into<String>) -> Self {
        self.login_path = login.into();
        self.logout_path = logout.into();
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://test.host:12345/argusws");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.login_path, "v2/auth/login");
        assert_eq!(config.logout_path, "v2/auth/logout");
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "endpoint": "http://test.host:12345/argusws",
            "request_timeout_ms": 5000
        }))
        .unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.login_path, "v2/auth/login");
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::new("http://localhost")
            .with_auth_paths("auth/1.0/token", "auth/1.0/logout")
            .with_user_agent("argus-client-test");

        assert_eq!(config.login_path, "auth/1.0/token");
        assert_eq!(config.logout_path, "auth/1.0/logout");
        assert_eq!(config.user_agent.as_deref(), Some("argus-client-test"));
    }

    #[test]
    fn test_sub_second_timeouts_are_kept() {
        let config = ClientConfig::new("http://localhost")
            .with_connect_timeout(Duration::from_millis(250))
            .with_request_timeout(Duration::from_millis(1500));

        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));

        let tiny = ClientConfig::new("http://localhost").with_request_timeout(Duration::from_micros(300));
        assert_eq!(tiny.request_timeout(), Duration::from_millis(1));
    }
}
